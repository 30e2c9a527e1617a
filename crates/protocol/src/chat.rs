//! Chat turn payloads and responses for the conversation backend.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
	User,
	Assistant,
	System,
}

/// A single message in the local chat history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
	pub role: Role,
	pub content: String,
}

impl ChatMessage {
	pub fn user(content: impl Into<String>) -> Self {
		Self {
			role: Role::User,
			content: content.into(),
		}
	}

	pub fn assistant(content: impl Into<String>) -> Self {
		Self {
			role: Role::Assistant,
			content: content.into(),
		}
	}
}

/// Result of one chat turn. A populated `error` means the turn failed and
/// `message` carries a human-readable apology instead of a model reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
	pub message: ChatMessage,
	pub conversation_id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

impl ChatResponse {
	pub fn is_error(&self) -> bool {
		self.error.is_some()
	}
}

/// Body of `POST /conversation`.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationRequest {
	pub action: &'static str,
	pub messages: Vec<OutboundMessage>,
	pub model: String,
	pub parent_message_id: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub conversation_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutboundMessage {
	pub id: String,
	pub author: Author,
	pub role: Role,
	pub content: MessageContent,
}

#[derive(Debug, Clone, Serialize)]
pub struct Author {
	pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageContent {
	#[serde(default = "text_content_type")]
	pub content_type: String,
	#[serde(default)]
	pub parts: Vec<Value>,
}

fn text_content_type() -> String {
	"text".to_string()
}

impl ConversationRequest {
	/// Builds a single user turn.
	pub fn user_turn(
		message_id: String,
		parent_message_id: String,
		text: &str,
		model: &str,
		conversation_id: Option<&str>,
	) -> Self {
		Self {
			action: "next",
			messages: vec![OutboundMessage {
				id: message_id,
				author: Author { role: Role::User },
				role: Role::User,
				content: MessageContent {
					content_type: text_content_type(),
					parts: vec![Value::String(text.to_string())],
				},
			}],
			model: model.to_string(),
			parent_message_id,
			conversation_id: conversation_id.map(str::to_string),
		}
	}
}

/// One `data:` record of the conversation event stream.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamFrame {
	pub message: Option<StreamMessage>,
	pub conversation_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamMessage {
	pub content: Option<MessageContent>,
}

impl StreamFrame {
	/// Joins the string parts of the message content with newlines.
	pub fn text(&self) -> Option<String> {
		let content = self.message.as_ref()?.content.as_ref()?;
		let parts: Vec<&str> = content.parts.iter().filter_map(Value::as_str).collect();
		Some(parts.join("\n"))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn user_turn_omits_conversation_id_for_new_threads() {
		let request = ConversationRequest::user_turn("m1".into(), "p1".into(), "hi", "gpt-4o", None);
		let json = serde_json::to_value(&request).unwrap();
		assert_eq!(json["action"], "next");
		assert_eq!(json["model"], "gpt-4o");
		assert_eq!(json["parent_message_id"], "p1");
		assert_eq!(json["messages"][0]["content"]["parts"][0], "hi");
		assert_eq!(json["messages"][0]["author"]["role"], "user");
		assert!(json.get("conversation_id").is_none());
	}

	#[test]
	fn user_turn_threads_existing_conversation() {
		let request = ConversationRequest::user_turn("m".into(), "p".into(), "x", "gpt-4o", Some("abc"));
		let json = serde_json::to_value(&request).unwrap();
		assert_eq!(json["conversation_id"], "abc");
	}

	#[test]
	fn stream_frame_joins_string_parts() {
		let frame: StreamFrame =
			serde_json::from_str(r#"{"message":{"content":{"parts":["a",{"asset":1},"b"]}},"conversation_id":"c"}"#).unwrap();
		assert_eq!(frame.text().as_deref(), Some("a\nb"));
		assert_eq!(frame.conversation_id.as_deref(), Some("c"));
	}

	#[test]
	fn chat_response_serializes_camel_case() {
		let response = ChatResponse {
			message: ChatMessage::assistant("Hello"),
			conversation_id: "abc".into(),
			error: None,
		};
		let json = serde_json::to_value(&response).unwrap();
		assert_eq!(json["conversationId"], "abc");
		assert_eq!(json["message"]["role"], "assistant");
	}
}
