//! [`BrowserProbe`] over a flattened DevTools session.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chatgpt_protocol::cdp::{CookiesResult, Event, TargetInfo};
use chatgpt_protocol::{Cookie, HeaderMap};
use chatgpt_runtime::{CdpConnection, Result, RuntimeError};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::LoginConfig;
use super::probe::BrowserProbe;

const LOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// A page target attached in flattened mode.
pub struct CdpProbe {
	conn: Arc<CdpConnection>,
	session_id: String,
	headers: Arc<Mutex<HeaderMap>>,
	capture: JoinHandle<()>,
}

impl CdpProbe {
	/// Opens a dedicated tab, falling back to the first existing page when
	/// the browser refuses to create one.
	pub async fn attach(conn: CdpConnection, config: &LoginConfig) -> Result<Self> {
		let conn = Arc::new(conn);

		let target_id = match conn
			.send("Target.createTarget", json!({ "url": "about:blank", "newWindow": false }), None)
			.await
		{
			Ok(created) => string_field(&created, "targetId")?,
			Err(err) => {
				warn!(error = %err, "could not open a new tab, continuing with the current tab");
				first_page_target(&conn).await?
			}
		};
		debug!(%target_id, "login tab");

		let attached = conn
			.send("Target.attachToTarget", json!({ "targetId": target_id, "flatten": true }), None)
			.await?;
		let session_id = string_field(&attached, "sessionId")?;

		let headers = Arc::new(Mutex::new(HeaderMap::new()));
		let capture = tokio::spawn(capture_headers(
			conn.events(),
			session_id.clone(),
			Arc::clone(&headers),
			HeaderFilter::from_config(config),
		));

		conn.send("Network.enable", json!({}), Some(&session_id)).await?;
		conn.send("Page.enable", json!({}), Some(&session_id)).await?;

		Ok(Self {
			conn,
			session_id,
			headers,
			capture,
		})
	}

	/// Stops header capture and closes the socket. The browser stays up.
	pub async fn close(self) {
		self.capture.abort();
		self.conn.close().await;
	}

	async fn page(&self, method: &str, params: Value) -> Result<Value> {
		self.conn.send(method, params, Some(&self.session_id)).await
	}

	async fn evaluate(&self, expression: &str) -> Result<Value> {
		let reply = self
			.page(
				"Runtime.evaluate",
				json!({ "expression": expression, "returnByValue": true, "awaitPromise": true }),
			)
			.await?;
		if let Some(details) = reply.get("exceptionDetails") {
			let text = details
				.pointer("/exception/description")
				.or_else(|| details.get("text"))
				.and_then(Value::as_str)
				.unwrap_or("exception");
			return Err(RuntimeError::Evaluation(text.to_string()));
		}
		Ok(reply.pointer("/result/value").cloned().unwrap_or(Value::Null))
	}

	async fn read_cookies(&self, method: &str, params: Value) -> Result<Vec<Cookie>> {
		let reply = self.page(method, params).await?;
		let result: CookiesResult = serde_json::from_value(reply)?;
		Ok(result.cookies.into_iter().map(Cookie::from).collect())
	}
}

#[async_trait]
impl BrowserProbe for CdpProbe {
	async fn current_url(&self) -> Result<String> {
		Ok(self.evaluate("window.location.href").await?.as_str().unwrap_or_default().to_string())
	}

	async fn evaluate_bool(&self, expression: &str) -> Result<bool> {
		Ok(self.evaluate(expression).await?.as_bool().unwrap_or(false))
	}

	async fn evaluate_string(&self, expression: &str) -> Result<Option<String>> {
		Ok(self
			.evaluate(expression)
			.await?
			.as_str()
			.filter(|s| !s.is_empty())
			.map(str::to_string))
	}

	async fn all_cookies(&self) -> Result<Vec<Cookie>> {
		self.read_cookies("Network.getAllCookies", json!({})).await
	}

	async fn cookies_for(&self, urls: &[String]) -> Result<Vec<Cookie>> {
		self.read_cookies("Network.getCookies", json!({ "urls": urls })).await
	}

	async fn navigate(&self, url: &str) -> Result<()> {
		let mut events = self.conn.events();
		let reply = self.page("Page.navigate", json!({ "url": url })).await?;
		if let Some(error) = reply.get("errorText").and_then(Value::as_str) {
			return Err(RuntimeError::Protocol {
				method: "Page.navigate".into(),
				code: 0,
				message: format!("{url}: {error}"),
			});
		}

		let session_id = self.session_id.as_str();
		let loaded = async {
			loop {
				match events.recv().await {
					Ok(event) if event.method == "Page.loadEventFired" && event.session_id.as_deref() == Some(session_id) => {
						return Ok(());
					}
					Ok(_) | Err(RecvError::Lagged(_)) => continue,
					Err(RecvError::Closed) => return Err(RuntimeError::ChannelClosed),
				}
			}
		};
		tokio::time::timeout(LOAD_TIMEOUT, loaded)
			.await
			.map_err(|_| RuntimeError::Timeout(LOAD_TIMEOUT, "page load"))?
	}

	fn captured_headers(&self) -> HeaderMap {
		self.headers.lock().clone()
	}
}

impl Drop for CdpProbe {
	fn drop(&mut self) {
		self.capture.abort();
	}
}

/// Which outbound requests have their headers recorded.
#[derive(Debug, Clone)]
struct HeaderFilter {
	hosts: Vec<String>,
	path_marker: String,
}

impl HeaderFilter {
	fn from_config(config: &LoginConfig) -> Self {
		Self {
			hosts: config.rules.chat_hosts.clone(),
			path_marker: config.api_path_marker.clone(),
		}
	}

	fn matches(&self, url: &str) -> bool {
		url.contains(&self.path_marker) && self.hosts.iter().any(|h| url.contains(h.as_str()))
	}
}

async fn capture_headers(
	mut events: tokio::sync::broadcast::Receiver<Event>,
	session_id: String,
	sink: Arc<Mutex<HeaderMap>>,
	filter: HeaderFilter,
) {
	loop {
		let event = match events.recv().await {
			Ok(event) => event,
			Err(RecvError::Lagged(skipped)) => {
				debug!(skipped, "header capture lagged");
				continue;
			}
			Err(RecvError::Closed) => return,
		};
		if event.method != "Network.requestWillBeSent" || event.session_id.as_deref() != Some(session_id.as_str()) {
			continue;
		}
		let Some(request) = event.params.get("request") else { continue };
		let Some(url) = request.get("url").and_then(Value::as_str) else { continue };
		if !filter.matches(url) {
			continue;
		}
		let Some(headers) = request.get("headers").and_then(Value::as_object) else {
			continue;
		};
		trace!(%url, count = headers.len(), "captured request headers");
		merge_headers(&mut sink.lock(), headers);
	}
}

/// Copies string headers except the ones rebuilt from the session.
fn merge_headers(target: &mut HeaderMap, headers: &serde_json::Map<String, Value>) {
	for (name, value) in headers {
		let lower = name.to_ascii_lowercase();
		if lower == "cookie" || lower == "user-agent" {
			continue;
		}
		if let Some(value) = value.as_str() {
			target.insert(name.clone(), value.to_string());
		}
	}
}

async fn first_page_target(conn: &CdpConnection) -> Result<String> {
	let reply = conn.send("Target.getTargets", json!({}), None).await?;
	let infos: Vec<TargetInfo> = serde_json::from_value(reply.get("targetInfos").cloned().unwrap_or(Value::Array(Vec::new())))?;
	let page = infos
		.into_iter()
		.find(|t| t.kind == "page")
		.ok_or_else(|| RuntimeError::Launch("browser has no page to attach to".into()))?;
	debug!(url = %page.url, "reusing existing tab");
	Ok(page.target_id)
}

fn string_field(value: &Value, field: &'static str) -> Result<String> {
	value
		.get(field)
		.and_then(Value::as_str)
		.map(str::to_string)
		.ok_or_else(|| RuntimeError::Evaluation(format!("missing {field} in reply")))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn filter_matches_backend_calls_on_chat_hosts() {
		let filter = HeaderFilter::from_config(&LoginConfig::default());
		assert!(filter.matches("https://chatgpt.com/backend-api/me"));
		assert!(filter.matches("https://chat.openai.com/backend-api/models"));
		assert!(!filter.matches("https://chatgpt.com/c/abc"));
		assert!(!filter.matches("https://cdn.example.com/backend-api/x"));
	}

	#[test]
	fn cookie_and_user_agent_are_not_captured() {
		let headers = json!({
			"Cookie": "a=b",
			"user-agent": "UA",
			"OAI-Device-Id": "dev",
			"Accept": "*/*",
			"X-Number": 5
		});
		let mut target = HeaderMap::new();
		merge_headers(&mut target, headers.as_object().unwrap());
		assert_eq!(target.len(), 2);
		assert_eq!(target["OAI-Device-Id"], "dev");
		assert!(!target.contains_key("Cookie"));
	}
}
