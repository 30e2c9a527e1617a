//! CDP connection over the browser WebSocket.
//!
//! Implements request/response correlation on top of the socket:
//! - Generating unique request IDs
//! - Correlating responses with pending requests
//! - Broadcasting events to subscribers
//!
//! # Message Flow
//!
//! 1. Caller invokes [`CdpConnection::send`] with method, params and optional session
//! 2. Connection allocates an ID and parks a oneshot sender under it
//! 3. The request is serialized and written to the socket
//! 4. The reader task receives the reply, removes the parked sender and completes it
//! 5. Messages without an ID are events and go to every [`CdpConnection::events`] receiver

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use chatgpt_protocol::cdp::{Event, Message, Request};
use futures_util::stream::{SplitSink, StreamExt};
use futures_util::SinkExt;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use crate::error::{Result, RuntimeError};

const EVENT_CAPACITY: usize = 1024;
const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, WsMessage>;
type Pending = Arc<Mutex<HashMap<u32, oneshot::Sender<Result<Value>>>>>;

/// Connection to a browser-level DevTools endpoint.
pub struct CdpConnection {
	last_id: AtomicU32,
	pending: Pending,
	sink: tokio::sync::Mutex<WsSink>,
	events: broadcast::Sender<Event>,
	reader: JoinHandle<()>,
}

impl CdpConnection {
	/// Opens the WebSocket at `ws_url` and starts the reader task.
	pub async fn connect(ws_url: &str) -> Result<Self> {
		let (stream, _) = tokio_tungstenite::connect_async(ws_url).await?;
		let (sink, mut source) = stream.split();
		let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
		let (events, _) = broadcast::channel(EVENT_CAPACITY);

		let reader = tokio::spawn({
			let pending = Arc::clone(&pending);
			let events = events.clone();
			async move {
				while let Some(frame) = source.next().await {
					let text = match frame {
						Ok(WsMessage::Text(text)) => text,
						Ok(WsMessage::Close(_)) => break,
						Ok(_) => continue,
						Err(e) => {
							debug!("CDP socket error: {}", e);
							break;
						}
					};
					match serde_json::from_str::<Message>(&text) {
						Ok(message) => dispatch(&pending, &events, message),
						Err(e) => debug!("unparseable CDP frame: {}", e),
					}
				}
				// Fail every in-flight request so callers are not left waiting.
				for (_, tx) in pending.lock().drain() {
					let _ = tx.send(Err(RuntimeError::ChannelClosed));
				}
				trace!("CDP reader finished");
			}
		});

		Ok(Self {
			last_id: AtomicU32::new(1),
			pending,
			sink: tokio::sync::Mutex::new(sink),
			events,
			reader,
		})
	}

	/// Sends `method` and awaits its result.
	///
	/// `session_id` routes the command to an attached target on a flattened connection.
	pub async fn send(&self, method: &str, params: Value, session_id: Option<&str>) -> Result<Value> {
		let id = self.last_id.fetch_add(1, Ordering::SeqCst);
		let (tx, rx) = oneshot::channel();
		self.pending.lock().insert(id, tx);

		let request = Request {
			id,
			method: method.to_string(),
			params,
			session_id: session_id.map(str::to_string),
		};
		let payload = serde_json::to_string(&request)?;
		trace!(id, method, "CDP send");

		if let Err(e) = self.sink.lock().await.send(WsMessage::Text(payload.into())).await {
			self.pending.lock().remove(&id);
			return Err(e.into());
		}

		let reply = match tokio::time::timeout(COMMAND_TIMEOUT, rx).await {
			Ok(reply) => reply.map_err(|_| RuntimeError::ChannelClosed)?,
			Err(_) => {
				self.pending.lock().remove(&id);
				return Err(RuntimeError::Timeout(COMMAND_TIMEOUT, "CDP response"));
			}
		};

		reply.map_err(|e| match e {
			RuntimeError::Protocol { code, message, .. } => RuntimeError::Protocol {
				method: method.to_string(),
				code,
				message,
			},
			other => other,
		})
	}

	/// Subscribes to every event received after this call.
	pub fn events(&self) -> broadcast::Receiver<Event> {
		self.events.subscribe()
	}

	/// Closes the socket. Does not close the browser.
	pub async fn close(&self) {
		let _ = self.sink.lock().await.close().await;
	}
}

impl Drop for CdpConnection {
	fn drop(&mut self) {
		self.reader.abort();
	}
}

fn dispatch(pending: &Pending, events: &broadcast::Sender<Event>, message: Message) {
	match message {
		Message::Response(response) => {
			let Some(tx) = pending.lock().remove(&response.id) else {
				debug!(id = response.id, "CDP response for unknown request");
				return;
			};
			let result = match response.error {
				Some(error) => Err(RuntimeError::Protocol {
					method: String::new(),
					code: error.code,
					message: match error.data {
						Some(detail) => format!("{} ({detail})", error.message),
						None => error.message,
					},
				}),
				None => Ok(response.result.unwrap_or(Value::Null)),
			};
			let _ = tx.send(result);
		}
		Message::Event(event) => {
			// No subscribers is fine; events are advisory.
			let _ = events.send(event);
		}
	}
}
