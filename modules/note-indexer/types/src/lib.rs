//! Shared types for the note indexer service and its RPC clients.

use serde::{Deserialize, Serialize};

// =====================================================
// RPC Request Types
// =====================================================

/// A side-effect request sent to the indexer service.
///
/// Serialized with an `action` discriminator, e.g.
/// `{"action": "embed_note", "noteId": 4, "content": "Ship v2"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum IndexerRequest {
    /// (Re)compute the embedding for a note's content
    EmbedNote {
        #[serde(rename = "noteId")]
        note_id: i64,
        content: String,
    },
    /// Append a conversation message to the remote chat log
    LogChat {
        id: String,
        role: String,
        content: String,
        /// RFC 3339 timestamp of the original message
        timestamp: String,
    },
    /// Opaque operation forwarded as-is
    Generic { payload: serde_json::Value },
}

impl IndexerRequest {
    pub fn embed_note(note_id: i64, content: impl Into<String>) -> Self {
        IndexerRequest::EmbedNote {
            note_id,
            content: content.into(),
        }
    }

    pub fn action_name(&self) -> &'static str {
        match self {
            IndexerRequest::EmbedNote { .. } => "embed_note",
            IndexerRequest::LogChat { .. } => "log_chat",
            IndexerRequest::Generic { .. } => "generic",
        }
    }
}

// =====================================================
// RPC Response Types
// =====================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct RpcResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> RpcResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

/// Acknowledgement returned for an accepted request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerAck {
    /// True when the service had already processed an identical request
    #[serde(default)]
    pub duplicate: bool,
}
