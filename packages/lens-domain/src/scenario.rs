//! Resolution of the accepted request shapes into one validated scenario string.
//!
//! Three payload shapes are accepted: a bare JSON string, a chat transcript
//! (`{"messages": [{"role": "user", "content": "..."}]}`) whose last user message is used, and a
//! `{"prompt": "..."}` object. The shape is decided once, here, and everything downstream only
//! sees [`Scenario`].

use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScenarioError {
	#[error("Scenario string, messages array, or prompt string is required.")]
	UnsupportedShape,
	#[error("No user message found in messages array.")]
	NoUserMessage,
	#[error("Scenario must be at least {min_chars} characters long.")]
	TooShort { min_chars: usize, actual_chars: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
	pub role: String,
	pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioInput {
	ScenarioText(String),
	ChatMessages(Vec<ChatMessage>),
	PromptField(String),
}
impl ScenarioInput {
	pub fn from_json(value: &Value) -> Result<Self, ScenarioError> {
		match value {
			Value::String(text) => Ok(Self::ScenarioText(text.clone())),
			Value::Object(map) => {
				if let Some(Value::Array(items)) = map.get("messages") {
					return Ok(Self::ChatMessages(items.iter().map(parse_message).collect()));
				}
				if let Some(Value::String(prompt)) = map.get("prompt") {
					return Ok(Self::PromptField(prompt.clone()));
				}

				Err(ScenarioError::UnsupportedShape)
			},
			_ => Err(ScenarioError::UnsupportedShape),
		}
	}

	pub fn into_text(self) -> Result<String, ScenarioError> {
		match self {
			Self::ScenarioText(text) | Self::PromptField(text) => Ok(text),
			Self::ChatMessages(messages) => messages
				.into_iter()
				.rfind(|message| message.role == "user")
				.and_then(|message| message.content)
				.filter(|content| !content.is_empty())
				.ok_or(ScenarioError::NoUserMessage),
		}
	}

	pub fn resolve(self, min_chars: usize) -> Result<Scenario, ScenarioError> {
		Scenario::new(self.into_text()?, min_chars)
	}
}

/// A scenario that passed input validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario(String);
impl Scenario {
	pub fn new(text: impl Into<String>, min_chars: usize) -> Result<Self, ScenarioError> {
		let text = text.into();
		let trimmed = text.trim();
		let actual_chars = trimmed.chars().count();

		if actual_chars < min_chars {
			return Err(ScenarioError::TooShort { min_chars, actual_chars });
		}

		Ok(Self(trimmed.to_string()))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

fn parse_message(item: &Value) -> ChatMessage {
	ChatMessage {
		role: item.get("role").and_then(Value::as_str).unwrap_or_default().to_string(),
		content: item.get("content").and_then(Value::as_str).map(str::to_string),
	}
}
