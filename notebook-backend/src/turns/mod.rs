//! Conversational turn queue: one turn at a time, FIFO behind it, plus the
//! conversation log.

pub mod history;
pub mod queue;

pub use history::{ChatMessage, ContextMessage, ConversationLog, MessageRole};
pub use queue::{Admission, QueuedTurn, TurnQueue};

use parking_lot::RwLock;

/// A conversation: the turn gate and its message log
#[derive(Default)]
pub struct Conversation {
    pub turns: TurnQueue,
    log: RwLock<ConversationLog>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message, compacting the log when it grows too long
    pub fn record(&self, message: ChatMessage) {
        let mut log = self.log.write();
        log.push(message);
        log.compact_history();
    }

    pub fn context_window(&self) -> Vec<ContextMessage> {
        self.log.read().context_window()
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.log.read().messages().to_vec()
    }

    /// Forget the conversation: empties the log and drops waiting turns
    pub fn clear(&self) {
        self.log.write().clear();
        let dropped = self.turns.clear_pending();
        if dropped > 0 {
            log::info!("[TURNS] Cleared conversation, dropped {} queued turns", dropped);
        }
    }
}
