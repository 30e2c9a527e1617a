//! Error types for chatgpt-core.

use thiserror::Error;

use crate::api::ApiError;
use crate::login::LoginError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
	#[error("No session found. Run `chatgpt login` first.")]
	NoSession,

	#[error(transparent)]
	Login(#[from] LoginError),

	#[error(transparent)]
	Api(#[from] ApiError),

	#[error("Browser error: {0}")]
	Runtime(#[from] chatgpt_runtime::RuntimeError),

	#[error("HTTP client error: {0}")]
	Http(#[from] reqwest::Error),

	#[error("Configuration error: {0}")]
	Config(String),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}
