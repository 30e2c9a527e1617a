//! Session capture, cookie selection and chat client for the unofficial
//! ChatGPT web backend.
//!
//! The pieces, leaves first:
//!
//! - [`config::CookiePolicy`] - cookie names and domains that matter
//! - [`validator`] - decides whether a stored session is usable
//! - [`cookie_filter`] - bounded, prioritized cookie subset for transport
//! - [`store::SessionStore`] - `session.json` / `headers.json` in two locations
//! - [`login`] - browser-driven login detection and capture
//! - [`api`] - chat turns against the conversation endpoint
//! - [`diagnose`] - troubleshooting report over the stored session

pub mod api;
pub mod config;
pub mod cookie_filter;
pub mod diagnose;
pub mod error;
pub mod login;
pub mod store;
pub mod validator;

pub use chatgpt_protocol::{ChatMessage, ChatResponse, Cookie, HeaderMap, Role, SessionData};
pub use config::CookiePolicy;
pub use error::{Error, Result};
pub use store::{SessionStore, StorePaths};

/// Current wall-clock time in epoch seconds.
pub fn now_epoch_secs() -> f64 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.map(|d| d.as_secs_f64())
		.unwrap_or(0.0)
}
