//! Chat turns against the conversation endpoint.
//!
//! [`ApiClient::send_message`] never fails: every error becomes a
//! [`ChatResponse`] with `error` set so an interactive loop can carry on.
//! Transient statuses (403, 429, 500) are retried on the [`RetryPolicy`]
//! schedule; everything else is reported on the first attempt.

mod error;
mod retry;
mod stream;
mod transport;

use std::time::Duration;

pub use chatgpt_protocol::chat::ConversationRequest;
use chatgpt_protocol::{ChatMessage, ChatResponse};
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

pub use error::{ApiError, is_cloudflare_challenge};
pub use retry::RetryPolicy;
pub use stream::{StreamReply, parse_event_stream};
pub use transport::{ChatTransport, HttpTransport, TransportResponse, build_headers};

use crate::config::CookiePolicy;
use crate::error::{Error, Result};
use crate::store::SessionStore;

pub const DEFAULT_BASE_URL: &str = "https://chatgpt.com/backend-api";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const FALLBACK_USER_AGENT: &str =
	"Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36";
const ERROR_PREFIX: &str = "Sorry, there was an error communicating with ChatGPT: ";

/// Endpoint, model and retry settings.
#[derive(Debug, Clone)]
pub struct ApiConfig {
	pub base_url: String,
	pub model: String,
	/// Sent when the session has no captured user agent.
	pub fallback_user_agent: String,
	pub request_timeout: Duration,
	pub retry: RetryPolicy,
}

impl Default for ApiConfig {
	fn default() -> Self {
		Self {
			base_url: DEFAULT_BASE_URL.into(),
			model: DEFAULT_MODEL.into(),
			fallback_user_agent: FALLBACK_USER_AGENT.into(),
			request_timeout: Duration::from_secs(120),
			retry: RetryPolicy::default(),
		}
	}
}

impl ApiConfig {
	pub fn conversation_url(&self) -> String {
		format!("{}/conversation", self.base_url.trim_end_matches('/'))
	}

	/// Scheme and host of the base URL, used for `Origin` and `Referer`.
	pub fn origin(&self) -> Result<String> {
		let url = Url::parse(&self.base_url).map_err(|e| Error::Config(format!("invalid base URL {}: {e}", self.base_url)))?;
		Ok(url.origin().ascii_serialization())
	}
}

/// A chat turn's response and, for error responses, what went wrong.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
	pub response: ChatResponse,
	pub failure: Option<ApiError>,
}

impl TurnOutcome {
	/// Remediation text for the failure, if it has any.
	pub fn guidance(&self) -> Option<&'static str> {
		self.failure.as_ref().and_then(ApiError::guidance)
	}
}

/// Sends chat turns through a [`ChatTransport`].
pub struct ApiClient<T = HttpTransport> {
	transport: T,
	config: ApiConfig,
}

impl ApiClient<HttpTransport> {
	/// Builds an HTTP client from the stored session and headers.
	///
	/// Fails with [`Error::NoSession`] when no session file can be loaded.
	pub fn from_store(store: &SessionStore, config: ApiConfig, policy: &CookiePolicy) -> Result<Self> {
		let (session, location) = store.load_session_located().ok_or(Error::NoSession)?;
		debug!(%location, cookies = session.cookies.len(), "session loaded");
		let headers = store.load_headers();
		let transport = HttpTransport::new(&session, &headers, &config, policy)?;
		Ok(Self::with_transport(transport, config))
	}
}

impl<T: ChatTransport> ApiClient<T> {
	pub fn with_transport(transport: T, config: ApiConfig) -> Self {
		Self { transport, config }
	}

	pub fn config(&self) -> &ApiConfig {
		&self.config
	}

	/// Sends `text` as a user turn, continuing `conversation_id` when given.
	pub async fn send_message(&self, text: &str, conversation_id: Option<&str>) -> ChatResponse {
		self.send_turn(text, conversation_id).await.response
	}

	/// Like [`send_message`](Self::send_message), but keeps the classified
	/// failure behind an error response so callers can pick guidance.
	pub async fn send_turn(&self, text: &str, conversation_id: Option<&str>) -> TurnOutcome {
		let request = ConversationRequest::user_turn(
			Uuid::new_v4().to_string(),
			Uuid::new_v4().to_string(),
			text,
			&self.config.model,
			conversation_id,
		);

		let policy = &self.config.retry;
		let mut retries = 0;
		loop {
			match self.attempt(&request).await {
				Ok(reply) => {
					info!(target = "chatgpt", conversation = %reply.conversation_id, retries, "reply received");
					return TurnOutcome {
						response: ChatResponse {
							message: ChatMessage::assistant(reply.text),
							conversation_id: reply.conversation_id,
							error: None,
						},
						failure: None,
					};
				}
				Err(err) if err.is_retryable() && retries < policy.max_retries => {
					let delay = policy.delay(retries);
					retries += 1;
					match &err {
						ApiError::Transient { challenge: true, .. } => {
							warn!(target = "chatgpt", ?delay, retry = retries, "Cloudflare challenge, retrying")
						}
						_ => warn!(target = "chatgpt", error = %err, ?delay, retry = retries, "transient failure, retrying"),
					}
					self.transport.wait(delay).await;
				}
				Err(err) => {
					warn!(target = "chatgpt", error = %err, retries, "chat turn failed");
					return TurnOutcome {
						response: error_response(&err, retries),
						failure: Some(err),
					};
				}
			}
		}
	}

	async fn attempt(&self, request: &ConversationRequest) -> std::result::Result<StreamReply, ApiError> {
		let response = self.transport.post_conversation(request).await?;
		if !(200..300).contains(&response.status) {
			return Err(ApiError::from_status(response.status, &response.body));
		}
		parse_event_stream(&response.body)
	}
}

fn error_response(err: &ApiError, retries: u32) -> ChatResponse {
	let mut content = format!("{ERROR_PREFIX}{err}");
	if retries > 0 {
		content.push_str(&format!(" (After {retries} retries)"));
	}
	ChatResponse {
		message: ChatMessage::assistant(content),
		conversation_id: String::new(),
		error: Some(err.to_string()),
	}
}

#[cfg(test)]
mod tests {
	use std::collections::VecDeque;
	use std::sync::Arc;

	use async_trait::async_trait;
	use chatgpt_protocol::{Cookie, HeaderMap, Role, SessionData};
	use parking_lot::Mutex;
	use tokio::io::{AsyncReadExt, AsyncWriteExt};
	use tokio::net::TcpListener;

	use super::*;

	const HELLO_STREAM: &str = concat!(
		"data: {\"message\":{\"content\":{\"parts\":[\"He\"]}},\"conversation_id\":\"abc123\"}\n\n",
		"data: {\"message\":{\"content\":{\"parts\":[\"Hello\"]}},\"conversation_id\":\"abc123\"}\n\n",
		"data: [DONE]\n\n",
	);

	/// Replays statuses and records every request and backoff wait.
	#[derive(Default)]
	struct ScriptedTransport {
		replies: Mutex<VecDeque<std::result::Result<TransportResponse, ApiError>>>,
		requests: Mutex<Vec<serde_json::Value>>,
		waits: Mutex<Vec<Duration>>,
	}

	impl ScriptedTransport {
		fn new(replies: Vec<std::result::Result<TransportResponse, ApiError>>) -> Self {
			Self {
				replies: Mutex::new(replies.into()),
				..Self::default()
			}
		}

		fn status(status: u16, body: &str) -> std::result::Result<TransportResponse, ApiError> {
			Ok(TransportResponse {
				status,
				body: body.to_string(),
			})
		}
	}

	#[async_trait]
	impl ChatTransport for ScriptedTransport {
		async fn post_conversation(&self, request: &ConversationRequest) -> std::result::Result<TransportResponse, ApiError> {
			self.requests.lock().push(serde_json::to_value(request).unwrap());
			let mut replies = self.replies.lock();
			if replies.len() > 1 {
				replies.pop_front().unwrap()
			} else {
				replies.front().cloned().unwrap()
			}
		}

		async fn wait(&self, delay: Duration) {
			self.waits.lock().push(delay);
		}
	}

	fn client(transport: ScriptedTransport) -> ApiClient<ScriptedTransport> {
		ApiClient::with_transport(transport, ApiConfig::default())
	}

	#[tokio::test]
	async fn parses_last_stream_record() {
		let api = client(ScriptedTransport::new(vec![ScriptedTransport::status(200, HELLO_STREAM)]));
		let response = api.send_message("hi", None).await;
		assert_eq!(response.message, ChatMessage::assistant("Hello"));
		assert_eq!(response.conversation_id, "abc123");
		assert!(!response.is_error());
	}

	#[tokio::test]
	async fn forbidden_retries_three_times_with_growing_delays() {
		let api = client(ScriptedTransport::new(vec![ScriptedTransport::status(403, "Forbidden")]));
		let response = api.send_message("hi", None).await;

		let waits = api.transport.waits.lock().clone();
		assert_eq!(waits.len(), 3);
		assert!(waits.windows(2).all(|w| w[1] > w[0]), "{waits:?}");
		assert_eq!(api.transport.requests.lock().len(), 4);
		assert_eq!(response.error.as_deref(), Some("Request failed with status code 403"));
		assert!(response.message.content.ends_with(" (After 3 retries)"));
		assert_eq!(response.message.role, Role::Assistant);
		assert_eq!(response.conversation_id, "");
	}

	#[tokio::test]
	async fn unauthorized_is_not_retried() {
		let api = client(ScriptedTransport::new(vec![ScriptedTransport::status(401, "")]));
		let response = api.send_message("hi", None).await;

		assert!(api.transport.waits.lock().is_empty());
		assert_eq!(api.transport.requests.lock().len(), 1);
		assert_eq!(
			response.message.content,
			"Sorry, there was an error communicating with ChatGPT: Request failed with status code 401"
		);
	}

	#[tokio::test]
	async fn turn_keeps_classified_failure_for_guidance() {
		let api = client(ScriptedTransport::new(vec![ScriptedTransport::status(
			403,
			"<script src=\"/cdn-cgi/challenge-platform/h/b\"></script>",
		)]));
		let turn = api.send_turn("hi", None).await;
		assert_eq!(turn.failure, Some(ApiError::Transient { status: 403, challenge: true }));
		assert!(turn.guidance().unwrap().starts_with("Cloudflare challenge detected"));

		let api = client(ScriptedTransport::new(vec![ScriptedTransport::status(200, HELLO_STREAM)]));
		let turn = api.send_turn("hi", None).await;
		assert!(turn.failure.is_none());
		assert!(turn.guidance().is_none());
	}

	#[tokio::test]
	async fn recovers_after_transient_failure() {
		let api = client(ScriptedTransport::new(vec![
			ScriptedTransport::status(429, ""),
			ScriptedTransport::status(500, ""),
			ScriptedTransport::status(200, HELLO_STREAM),
		]));
		let response = api.send_message("hi", Some("abc123")).await;

		assert_eq!(response.message.content, "Hello");
		assert_eq!(api.transport.waits.lock().len(), 2);
		let requests = api.transport.requests.lock();
		assert!(requests.iter().all(|r| r["conversation_id"] == "abc123"));
		assert_eq!(requests[0]["messages"][0]["id"], requests[1]["messages"][0]["id"]);
	}

	#[tokio::test]
	async fn malformed_stream_and_network_errors_are_not_retried() {
		let api = client(ScriptedTransport::new(vec![ScriptedTransport::status(200, "data: [DONE]\n\n")]));
		let response = api.send_message("hi", None).await;
		assert_eq!(response.error.as_deref(), Some("Invalid response from ChatGPT API"));
		assert!(api.transport.waits.lock().is_empty());

		let api = client(ScriptedTransport::new(vec![Err(ApiError::Transport("connection refused".into()))]));
		let response = api.send_message("hi", None).await;
		assert_eq!(response.error.as_deref(), Some("connection refused"));
		assert_eq!(api.transport.requests.lock().len(), 1);
	}

	#[tokio::test]
	async fn payload_shape() {
		let api = client(ScriptedTransport::new(vec![ScriptedTransport::status(200, HELLO_STREAM)]));
		api.send_message("hello there", None).await;
		let request = api.transport.requests.lock()[0].clone();

		assert_eq!(request["action"], "next");
		assert_eq!(request["model"], DEFAULT_MODEL);
		assert_eq!(request["messages"][0]["author"]["role"], "user");
		assert_eq!(request["messages"][0]["content"]["parts"][0], "hello there");
		assert!(request.get("conversation_id").is_none());
		let id = request["messages"][0]["id"].as_str().unwrap();
		assert!(Uuid::parse_str(id).is_ok());
		assert_ne!(request["messages"][0]["id"], request["parent_message_id"]);
	}

	#[test]
	fn no_session_fails_fast() {
		let tmp = tempfile::TempDir::new().unwrap();
		let store = SessionStore::new(crate::store::StorePaths::new(tmp.path().join("h"), tmp.path().join("l")));
		let result = ApiClient::from_store(&store, ApiConfig::default(), &CookiePolicy::default());
		assert!(matches!(result, Err(Error::NoSession)));
	}

	/// Reads one HTTP/1.1 request (headers plus Content-Length body).
	async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
		let mut buf = Vec::new();
		let mut chunk = [0u8; 4096];
		loop {
			let n = socket.read(&mut chunk).await.unwrap();
			if n == 0 {
				break;
			}
			buf.extend_from_slice(&chunk[..n]);
			let text = String::from_utf8_lossy(&buf);
			if let Some(end) = text.find("\r\n\r\n") {
				let length = text[..end]
					.lines()
					.find_map(|l| l.to_ascii_lowercase().strip_prefix("content-length:").map(|v| v.trim().parse::<usize>().unwrap()))
					.unwrap_or(0);
				if buf.len() >= end + 4 + length {
					break;
				}
			}
		}
		String::from_utf8_lossy(&buf).to_string()
	}

	#[tokio::test]
	async fn http_transport_sends_session_headers() {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		let captured = Arc::new(Mutex::new(String::new()));
		let server = tokio::spawn({
			let captured = Arc::clone(&captured);
			async move {
				let (mut socket, _) = listener.accept().await.unwrap();
				*captured.lock() = read_request(&mut socket).await;
				let response = format!(
					"HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
					HELLO_STREAM.len(),
					HELLO_STREAM
				);
				socket.write_all(response.as_bytes()).await.unwrap();
				socket.shutdown().await.ok();
			}
		});

		let session = SessionData {
			cookies: vec![
				Cookie::new("__Secure-next-auth.session-token", "tok", "chatgpt.com"),
				Cookie::new("ga", "1", ".google.com"),
			],
			user_agent: "Mozilla/5.0 Captured".into(),
			access_token: Some("eyJ".into()),
		};
		let custom = HeaderMap::from([
			("oai-device-id".to_string(), "dev-1".to_string()),
			("cookie".to_string(), "stale=1".to_string()),
		]);
		let config = ApiConfig {
			base_url: format!("http://{addr}/backend-api"),
			..ApiConfig::default()
		};
		let transport = HttpTransport::new(&session, &custom, &config, &CookiePolicy::default()).unwrap();
		assert_eq!(transport.endpoint(), format!("http://{addr}/backend-api/conversation"));

		let response = ApiClient::with_transport(transport, config).send_message("hi", None).await;
		server.await.unwrap();

		assert_eq!(response.message.content, "Hello");
		assert_eq!(response.conversation_id, "abc123");
		let request = captured.lock().to_ascii_lowercase();
		assert!(request.starts_with("post /backend-api/conversation http/1.1"));
		assert!(request.contains("cookie: __secure-next-auth.session-token=tok\r\n"));
		assert!(request.contains("user-agent: mozilla/5.0 captured\r\n"));
		assert!(request.contains("authorization: bearer eyj\r\n"));
		assert!(request.contains("oai-device-id: dev-1\r\n"));
		assert!(request.contains("accept: text/event-stream\r\n"));
		assert!(!request.contains("stale=1"));
		assert!(request.contains("\"parts\":[\"hi\"]"));
	}
}
