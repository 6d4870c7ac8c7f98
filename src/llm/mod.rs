//! Completion-model clients
//!
//! The assistant hands a rendered chat to a `CompletionModel` and gets one
//! text completion back. `OpenAiClient` talks to any OpenAI-compatible
//! `/chat/completions` endpoint.

mod openai;

pub use openai::OpenAiClient;

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Errors from a completion request
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("Completion request failed: {0}")]
    Transport(String),

    #[error("Completion request timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("Completion API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed completion response: {0}")]
    Malformed(String),

    #[error("Completion response contained no answer")]
    Empty,

    #[error("No API key configured (set {0})")]
    MissingApiKey(String),
}

/// A chat-completion backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Model identifier, for logging
    fn name(&self) -> String;

    /// Complete the conversation and return the answer text
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        temperature: f32,
    ) -> Result<String, CompletionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serialization() {
        let message = ChatMessage::system("be brief");
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            serde_json::json!({"role": "system", "content": "be brief"})
        );
        assert_eq!(ChatMessage::user("hi").role, Role::User);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            CompletionError::Timeout(Duration::from_secs(60)).to_string(),
            "Completion request timed out after 60s"
        );
        assert_eq!(
            CompletionError::Status {
                status: 429,
                body: "quota exceeded".to_string()
            }
            .to_string(),
            "Completion API returned 429: quota exceeded"
        );
    }
}
