use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
	#[error(transparent)]
	Core(#[from] chatgpt::Error),

	#[error("Session is missing or expired. Run `chatgpt login` first.")]
	SessionInvalid,

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;
