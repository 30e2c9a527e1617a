//! Error type for browser process and DevTools operations.

use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
	#[error("No Chrome/Chromium executable found. Install Chrome or start one with --remote-debugging-port")]
	BrowserNotFound,

	#[error("Failed to launch browser at {path}: {source}")]
	Spawn {
		path: String,
		#[source]
		source: std::io::Error,
	},

	#[error("{0}")]
	Launch(String),

	#[error("Debugging endpoint on port {port} unreachable: {reason}")]
	Endpoint { port: u16, reason: String },

	#[error("WebSocket error: {0}")]
	WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

	#[error("CDP error {code} in {method}: {message}")]
	Protocol { method: String, code: i64, message: String },

	#[error("Script threw in page: {0}")]
	Evaluation(String),

	#[error("CDP connection closed")]
	ChannelClosed,

	#[error("Timed out after {0:?} waiting for {1}")]
	Timeout(Duration, &'static str),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}
