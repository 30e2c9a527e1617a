//! Browser cookie as persisted in `session.json`.

use serde::{Deserialize, Serialize};

/// A single browser cookie.
///
/// `expires` is epoch seconds; `None` marks a session cookie that never
/// expires from this tool's point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
	pub name: String,
	pub value: String,
	#[serde(default)]
	pub domain: String,
	#[serde(default = "default_path")]
	pub path: String,
	#[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "de_expires")]
	pub expires: Option<f64>,
	#[serde(default)]
	pub http_only: bool,
	#[serde(default)]
	pub secure: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub same_site: Option<String>,
}

fn default_path() -> String {
	"/".to_string()
}

/// Accepts absent, `null`, or a number; non-positive numbers mean "session cookie".
fn de_expires<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
	D: serde::Deserializer<'de>,
{
	let raw = Option::<f64>::deserialize(deserializer)?;
	Ok(raw.filter(|ts| *ts > 0.0))
}

impl Cookie {
	/// Creates a host cookie with `/` path and no expiry.
	pub fn new(name: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: value.into(),
			domain: domain.into(),
			path: default_path(),
			expires: None,
			http_only: false,
			secure: false,
			same_site: None,
		}
	}

	/// Sets the expiry timestamp in epoch seconds.
	pub fn with_expires(mut self, expires: f64) -> Self {
		self.expires = Some(expires);
		self
	}

	/// Returns `true` if the cookie has no expiry or expires strictly after `now`.
	pub fn is_live_at(&self, now: f64) -> bool {
		self.expires.is_none_or(|ts| ts > now)
	}

	/// Renders the `name=value` pair used in a `Cookie` request header.
	pub fn header_pair(&self) -> String {
		format!("{}={}", self.name, self.value)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn session_cookie_from_browser_has_no_expiry() {
		let cookie: Cookie = serde_json::from_str(
			r#"{"name":"_puid","value":"u","domain":".chatgpt.com","path":"/","expires":-1,"httpOnly":true,"secure":true}"#,
		)
		.unwrap();
		assert_eq!(cookie.expires, None);
		assert!(cookie.http_only);
		assert!(cookie.is_live_at(f64::MAX));
	}

	#[test]
	fn serializes_with_camel_case_keys() {
		let mut cookie = Cookie::new("cf_clearance", "v", ".chatgpt.com").with_expires(10.0);
		cookie.http_only = true;
		cookie.same_site = Some("None".into());
		let json = serde_json::to_value(&cookie).unwrap();
		assert_eq!(json["httpOnly"], true);
		assert_eq!(json["sameSite"], "None");
		assert_eq!(json["expires"], 10.0);
	}

	#[test]
	fn absent_expiry_is_not_serialized() {
		let json = serde_json::to_value(Cookie::new("a", "b", "c")).unwrap();
		assert!(json.get("expires").is_none());
	}

	#[test]
	fn expiry_is_strict() {
		let cookie = Cookie::new("a", "b", "c").with_expires(100.0);
		assert!(cookie.is_live_at(99.5));
		assert!(!cookie.is_live_at(100.0));
	}
}
