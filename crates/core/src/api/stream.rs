//! Buffered event-stream parsing for the conversation endpoint.

use chatgpt_protocol::chat::StreamFrame;

use super::error::ApiError;

const DATA_PREFIX: &str = "data: ";
const DONE_MARKER: &str = "[DONE]";

/// Final assistant text and conversation id of one reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamReply {
	pub text: String,
	pub conversation_id: String,
}

/// Parses the last `data:` record of the stream.
///
/// The backend streams cumulative message states, so the last record other
/// than the `[DONE]` terminator holds the complete reply.
pub fn parse_event_stream(body: &str) -> Result<StreamReply, ApiError> {
	let last = body
		.lines()
		.map(|line| line.trim_end_matches('\r'))
		.filter(|line| line.starts_with(DATA_PREFIX) && !line.contains(DONE_MARKER))
		.last()
		.ok_or(ApiError::MalformedResponse)?;

	let frame: StreamFrame = serde_json::from_str(&last[DATA_PREFIX.len()..]).map_err(|_| ApiError::MalformedResponse)?;
	let text = frame.text().ok_or(ApiError::MalformedResponse)?;
	Ok(StreamReply {
		text,
		conversation_id: frame.conversation_id.unwrap_or_default(),
	})
}
