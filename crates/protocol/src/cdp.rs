//! Chrome DevTools Protocol message shapes.
//!
//! Only the subset used by the login flow is modeled. Messages on a
//! flattened browser connection carry an optional `sessionId` that routes
//! them to an attached page target.
//!
//! ```json
//! {"id": 7, "method": "Runtime.evaluate", "params": {...}, "sessionId": "A1B2"}
//! {"id": 7, "result": {...}, "sessionId": "A1B2"}
//! {"method": "Network.requestWillBeSent", "params": {...}, "sessionId": "A1B2"}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cookie::Cookie;

/// Command sent to the browser.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
	pub id: u32,
	pub method: String,
	pub params: Value,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub session_id: Option<String>,
}

/// Protocol-level error payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
	pub code: i64,
	pub message: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<String>,
}

/// Reply to a [`Request`] with the same `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
	pub id: u32,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub result: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<ErrorPayload>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub session_id: Option<String>,
}

/// Unsolicited notification from the browser.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
	pub method: String,
	#[serde(default)]
	pub params: Value,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub session_id: Option<String>,
}

/// Responses carry `id`; events do not.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
	Response(Response),
	Event(Event),
}

/// `Network.Cookie` as reported by `Network.getAllCookies`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkCookie {
	pub name: String,
	pub value: String,
	pub domain: String,
	pub path: String,
	/// Epoch seconds, `-1` for session cookies.
	#[serde(default)]
	pub expires: f64,
	#[serde(default)]
	pub http_only: bool,
	#[serde(default)]
	pub secure: bool,
	#[serde(default)]
	pub session: bool,
	#[serde(default)]
	pub same_site: Option<String>,
}

impl From<NetworkCookie> for Cookie {
	fn from(c: NetworkCookie) -> Self {
		let expires = (!c.session && c.expires > 0.0).then_some(c.expires);
		Cookie {
			name: c.name,
			value: c.value,
			domain: c.domain,
			path: c.path,
			expires,
			http_only: c.http_only,
			secure: c.secure,
			same_site: c.same_site,
		}
	}
}

/// Result of `Network.getAllCookies` / `Network.getCookies`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CookiesResult {
	#[serde(default)]
	pub cookies: Vec<NetworkCookie>,
}

/// `Target.TargetInfo` subset.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
	pub target_id: String,
	#[serde(rename = "type")]
	pub kind: String,
	#[serde(default)]
	pub url: String,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn message_with_id_is_response() {
		let msg: Message = serde_json::from_str(r#"{"id":3,"result":{"ok":true},"sessionId":"S"}"#).unwrap();
		match msg {
			Message::Response(r) => {
				assert_eq!(r.id, 3);
				assert_eq!(r.session_id.as_deref(), Some("S"));
			}
			Message::Event(_) => panic!("expected response"),
		}
	}

	#[test]
	fn message_without_id_is_event() {
		let msg: Message = serde_json::from_str(r#"{"method":"Page.loadEventFired","params":{"timestamp":1.0}}"#).unwrap();
		assert!(matches!(msg, Message::Event(e) if e.method == "Page.loadEventFired"));
	}

	#[test]
	fn request_omits_missing_session() {
		let req = Request {
			id: 1,
			method: "Target.getTargets".into(),
			params: Value::Object(Default::default()),
			session_id: None,
		};
		let json = serde_json::to_string(&req).unwrap();
		assert!(!json.contains("sessionId"));
	}

	#[test]
	fn network_session_cookie_drops_expiry() {
		let raw: NetworkCookie = serde_json::from_str(
			r#"{"name":"__Secure-next-auth.session-token","value":"t","domain":"chatgpt.com","path":"/","expires":-1,"size":10,"httpOnly":true,"secure":true,"session":true,"sameSite":"Lax"}"#,
		)
		.unwrap();
		let cookie = Cookie::from(raw);
		assert_eq!(cookie.expires, None);
		assert_eq!(cookie.same_site.as_deref(), Some("Lax"));
	}

	#[test]
	fn network_persistent_cookie_keeps_expiry() {
		let raw: NetworkCookie = serde_json::from_str(
			r#"{"name":"_puid","value":"p","domain":".chatgpt.com","path":"/","expires":1900000000.5,"session":false}"#,
		)
		.unwrap();
		assert_eq!(Cookie::from(raw).expires, Some(1900000000.5));
	}
}
