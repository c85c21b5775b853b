//! Chat model boundary: role-tagged messages in, generated text out.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single role-tagged message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// One completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

/// A language model that completes a conversation.
///
/// Implementations must be safe to share between concurrent requests and
/// should return [`RagError::Generation`](crate::RagError::Generation) on
/// transport, quota, or empty-completion failures.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// The model name, used in logs and errors.
    fn name(&self) -> &str;

    /// Generate a completion for `request`.
    async fn generate(&self, request: GenerationRequest) -> Result<String>;
}
