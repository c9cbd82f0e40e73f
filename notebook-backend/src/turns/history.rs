//! Conversation log with compaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// Log size that triggers compaction
pub const MAX_HISTORY: usize = 100;
/// Messages kept after compaction
pub const COMPACTED_HISTORY: usize = 20;
/// Messages exported as conversational context
pub const CONTEXT_WINDOW: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Plan group proposed in this message, if any
    pub plan_group_id: Option<String>,
    pub pending_confirmation: bool,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            plan_group_id: None,
            pending_confirmation: false,
        }
    }
}

/// What the reasoning service sees of a message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextMessage {
    pub role: MessageRole,
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct ConversationLog {
    messages: Vec<ChatMessage>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Once the log exceeds `MAX_HISTORY`, keep only the newest
    /// `COMPACTED_HISTORY` messages. Returns how many were dropped.
    pub fn compact_history(&mut self) -> usize {
        if self.messages.len() <= MAX_HISTORY {
            return 0;
        }
        let dropped = self.messages.len() - COMPACTED_HISTORY;
        self.messages.drain(..dropped);
        log::debug!("[HISTORY] Compacted conversation, dropped {} messages", dropped);
        dropped
    }

    /// The newest `CONTEXT_WINDOW` messages, oldest first
    pub fn context_window(&self) -> Vec<ContextMessage> {
        let start = self.messages.len().saturating_sub(CONTEXT_WINDOW);
        self.messages[start..]
            .iter()
            .map(|m| ContextMessage {
                role: m.role,
                content: m.content.clone(),
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
