//! Upstream failure classification and user guidance.

use thiserror::Error;

/// Body fragments that indicate a Cloudflare challenge page.
const CHALLENGE_MARKERS: [&str; 5] = ["cf-challenge", "cloudflare", "cf_chl_", "challenge-platform", "_cf_chl_opt"];
const HEADER_TOO_LARGE: &str = "Request Header Or Cookie Too Large";
const BODY_EXCERPT: usize = 500;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
	/// 403, 429 or 500. Worth another attempt.
	#[error("Request failed with status code {status}")]
	Transient { status: u16, challenge: bool },

	#[error("Request failed with status code {status}")]
	Permanent { status: u16, body: String },

	#[error("Invalid response from ChatGPT API")]
	MalformedResponse,

	/// No HTTP status: connection refused, DNS, TLS, timeout.
	#[error("{0}")]
	Transport(String),
}

impl ApiError {
	/// Classifies a non-success reply.
	pub fn from_status(status: u16, body: &str) -> Self {
		match status {
			403 | 429 | 500 => Self::Transient {
				status,
				challenge: is_cloudflare_challenge(body),
			},
			_ => Self::Permanent {
				status,
				body: excerpt(body),
			},
		}
	}

	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::Transient { .. })
	}

	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Transient { status, .. } | Self::Permanent { status, .. } => Some(*status),
			Self::MalformedResponse | Self::Transport(_) => None,
		}
	}

	/// Remediation text for the failures users can act on.
	pub fn guidance(&self) -> Option<&'static str> {
		match self {
			Self::Permanent { status: 400, body } if body.contains(HEADER_TOO_LARGE) => Some(
				"The cookie data is too large to send to the ChatGPT API. \
				 Try clearing your browser cookies or using a fresh Chrome profile, then run 'chatgpt login' again.",
			),
			Self::Transient { status: 403, challenge: true } => Some(
				"Cloudflare challenge detected: the request was blocked as automated access. \
				 Please run 'chatgpt login' again to refresh your session.",
			),
			Self::Transient { status: 403, .. } | Self::Permanent { status: 403, .. } => {
				Some("Authentication failed. Your session may have expired. Please run 'chatgpt login' again.")
			}
			Self::Permanent { status: 401, .. } => {
				Some("Authentication failed. Your session has expired. Please run 'chatgpt login' again.")
			}
			Self::Transient { status: 429, .. } => {
				Some("Rate limit exceeded. Please wait a few minutes before trying again.")
			}
			Self::Transport(_) => Some("No response received from the server. Check your network connection."),
			_ => None,
		}
	}
}

pub fn is_cloudflare_challenge(body: &str) -> bool {
	CHALLENGE_MARKERS.iter().any(|m| body.contains(m))
}

fn excerpt(body: &str) -> String {
	match body.char_indices().nth(BODY_EXCERPT) {
		Some((idx, _)) => format!("{}...", &body[..idx]),
		None => body.to_string(),
	}
}
