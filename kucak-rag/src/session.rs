//! In-memory chat session model.
//!
//! Sessions are plain values; storing them is left to the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::llm::{ChatMessage, Role};
use crate::record::Answer;

/// The kind of consultation a session is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatType {
    #[default]
    Pregnancy,
    Postpartum,
    Newborn,
}

impl ChatType {
    /// Title used when the caller does not supply one.
    pub fn default_title(self) -> &'static str {
        match self {
            Self::Pregnancy => "New Pregnancy Chat",
            Self::Postpartum => "New Postpartum Chat",
            Self::Newborn => "New Newborn Care Chat",
        }
    }
}

/// A message stored in a session, with the time it was added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// A single user's conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub user_id: String,
    pub session_id: String,
    pub title: String,
    pub chat_type: ChatType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub messages: Vec<SessionMessage>,
    pub is_active: bool,
}

impl ChatSession {
    /// Start a new session with a fresh UUID.
    pub fn new(user_id: impl Into<String>, title: Option<String>, chat_type: ChatType) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            session_id: Uuid::new_v4().to_string(),
            title: title.unwrap_or_else(|| chat_type.default_title().to_string()),
            chat_type,
            created_at: now,
            updated_at: now,
            messages: Vec::new(),
            is_active: true,
        }
    }

    /// Append a message and bump `updated_at`.
    pub fn add_message(&mut self, message: ChatMessage) {
        let now = Utc::now();
        let ChatMessage { role, content } = message;
        self.messages.push(SessionMessage { role, content, timestamp: now });
        self.updated_at = now;
    }

    /// Append the user's question followed by the assistant's answer.
    pub fn record_exchange(&mut self, question: &str, answer: &Answer) {
        self.add_message(ChatMessage::user(question));
        self.add_message(answer.to_message());
    }

    /// The history as plain role-tagged messages.
    pub fn history(&self) -> Vec<ChatMessage> {
        self.messages
            .iter()
            .map(|m| ChatMessage { role: m.role, content: m.content.clone() })
            .collect()
    }
}
