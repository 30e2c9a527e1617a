//! Persisted session shapes (`session.json`, `headers.json`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cookie::Cookie;

/// Request headers captured from the browser, keyed by header name.
pub type HeaderMap = BTreeMap<String, String>;

/// Credentials harvested by a successful login.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
	pub cookies: Vec<Cookie>,
	#[serde(default)]
	pub user_agent: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub access_token: Option<String>,
}

impl SessionData {
	/// First cookie with exactly `name`.
	pub fn cookie(&self, name: &str) -> Option<&Cookie> {
		self.cookies.iter().find(|c| c.name == name)
	}

	/// First cookie whose name starts with `prefix`.
	pub fn cookie_with_prefix(&self, prefix: &str) -> Option<&Cookie> {
		self.cookies.iter().find(|c| c.name.starts_with(prefix))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn access_token_is_optional_on_disk() {
		let session: SessionData = serde_json::from_str(r#"{"cookies":[],"userAgent":"UA"}"#).unwrap();
		assert_eq!(session.access_token, None);
		let json = serde_json::to_string(&session).unwrap();
		assert!(!json.contains("accessToken"));
	}

	#[test]
	fn prefix_lookup_matches_chunked_token_names() {
		let session = SessionData {
			cookies: vec![
				Cookie::new("_puid", "p", ".chatgpt.com"),
				Cookie::new("__Secure-next-auth.session-token.0", "t", "chatgpt.com"),
			],
			..Default::default()
		};
		let found = session.cookie_with_prefix("__Secure-next-auth.session-token").unwrap();
		assert_eq!(found.name, "__Secure-next-auth.session-token.0");
		assert!(session.cookie("cf_clearance").is_none());
	}
}
