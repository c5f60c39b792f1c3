//! Provider-agnostic chat message types shared by all clients.

use std::pin::Pin;

use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error_handler::AiLlmError;

/// Lazily produced text fragments of a streamed completion.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, AiLlmError>> + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One message of a chat request. Serializes to the `{role, content}` shape
/// understood by both Ollama `/api/chat` and OpenAI `/v1/chat/completions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}
