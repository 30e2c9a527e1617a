//! HTTP transport for conversation requests.

use std::time::Duration;

use async_trait::async_trait;
use chatgpt_protocol::chat::ConversationRequest;
use chatgpt_protocol::{HeaderMap, SessionData};
use reqwest::header::{self, HeaderName, HeaderValue};
use tracing::{debug, warn};

use super::ApiConfig;
use super::error::ApiError;
use crate::config::CookiePolicy;
use crate::cookie_filter::{cookie_header, filter_for_transport};
use crate::error::{Error, Result};

/// Status and buffered body of one reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
	pub status: u16,
	pub body: String,
}

/// Sends one conversation request and waits between retries.
#[async_trait]
pub trait ChatTransport: Send + Sync {
	/// Posts the request. `Err` only when no HTTP reply was received.
	async fn post_conversation(&self, request: &ConversationRequest) -> std::result::Result<TransportResponse, ApiError>;

	async fn wait(&self, delay: Duration) {
		tokio::time::sleep(delay).await;
	}
}

/// Captured headers that never override the ones built here or that the
/// client manages itself.
const RESERVED_HEADERS: [&str; 6] = ["cookie", "user-agent", "accept-encoding", "content-length", "host", "connection"];

/// reqwest client carrying the session as default headers.
#[derive(Debug, Clone)]
pub struct HttpTransport {
	client: reqwest::Client,
	endpoint: String,
}

impl HttpTransport {
	pub fn new(session: &SessionData, custom: &HeaderMap, config: &ApiConfig, policy: &CookiePolicy) -> Result<Self> {
		let headers = build_headers(session, custom, config, policy)?;
		let client = reqwest::Client::builder()
			.default_headers(headers)
			.timeout(config.request_timeout)
			.build()?;
		Ok(Self {
			client,
			endpoint: config.conversation_url(),
		})
	}

	pub fn endpoint(&self) -> &str {
		&self.endpoint
	}
}

#[async_trait]
impl ChatTransport for HttpTransport {
	async fn post_conversation(&self, request: &ConversationRequest) -> std::result::Result<TransportResponse, ApiError> {
		let response = self
			.client
			.post(&self.endpoint)
			.json(request)
			.send()
			.await
			.map_err(|e| ApiError::Transport(e.to_string()))?;
		let status = response.status().as_u16();
		let body = response.text().await.map_err(|e| ApiError::Transport(e.to_string()))?;
		debug!(status, bytes = body.len(), "conversation reply");
		Ok(TransportResponse { status, body })
	}
}

/// Browser-like defaults, then captured headers, then the session's cookie,
/// user agent and bearer token.
pub fn build_headers(
	session: &SessionData,
	custom: &HeaderMap,
	config: &ApiConfig,
	policy: &CookiePolicy,
) -> Result<header::HeaderMap> {
	let origin = config.origin()?;
	let mut headers = header::HeaderMap::new();
	let defaults = [
		(header::CONTENT_TYPE, "application/json".to_string()),
		(header::ACCEPT, "text/event-stream".to_string()),
		(header::ACCEPT_LANGUAGE, "en-US,en;q=0.9".to_string()),
		(header::CACHE_CONTROL, "no-cache".to_string()),
		(HeaderName::from_static("sec-fetch-dest"), "empty".to_string()),
		(HeaderName::from_static("sec-fetch-mode"), "cors".to_string()),
		(HeaderName::from_static("sec-fetch-site"), "same-origin".to_string()),
		(
			HeaderName::from_static("sec-ch-ua"),
			r#""Not/A)Brand";v="8", "Chromium";v="135", "Google Chrome";v="135""#.to_string(),
		),
		(HeaderName::from_static("sec-ch-ua-mobile"), "?0".to_string()),
		(HeaderName::from_static("sec-ch-ua-platform"), r#""macOS""#.to_string()),
		(header::REFERER, format!("{origin}/")),
		(header::ORIGIN, origin),
	];
	for (name, value) in defaults {
		let value = value_of(name.as_str(), &value)?;
		headers.insert(name, value);
	}

	for (name, value) in custom {
		let lower = name.to_ascii_lowercase();
		if lower.starts_with(':') || RESERVED_HEADERS.contains(&lower.as_str()) {
			continue;
		}
		match (HeaderName::from_bytes(lower.as_bytes()), HeaderValue::from_str(value)) {
			(Ok(name), Ok(value)) => {
				headers.insert(name, value);
			}
			_ => warn!(header = %name, "skipping captured header that is not valid HTTP"),
		}
	}

	let cookies = filter_for_transport(&session.cookies, policy);
	debug!(sent = cookies.len(), stored = session.cookies.len(), "cookies selected");
	headers.insert(header::COOKIE, value_of("cookie", &cookie_header(&cookies))?);

	let user_agent = if session.user_agent.is_empty() {
		config.fallback_user_agent.as_str()
	} else {
		session.user_agent.as_str()
	};
	headers.insert(header::USER_AGENT, value_of("user-agent", user_agent)?);

	if let Some(token) = &session.access_token {
		let mut value = value_of("authorization", &format!("Bearer {token}"))?;
		value.set_sensitive(true);
		headers.insert(header::AUTHORIZATION, value);
	}
	Ok(headers)
}

fn value_of(name: &str, value: &str) -> Result<HeaderValue> {
	HeaderValue::from_str(value).map_err(|e| Error::Config(format!("invalid {name} header: {e}")))
}
