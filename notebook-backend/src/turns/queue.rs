//! Single-writer turn gate.
//!
//! One busy slot plus a FIFO of waiting turns. A turn submitted while idle
//! starts immediately; otherwise it waits. `finish()` hands the slot straight
//! to the next waiting turn so a new submission can never jump the queue.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;

/// A turn waiting for (or holding) the busy slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedTurn {
    pub input: String,
    /// Answer to a pending confirmation prompt, if this turn carries one
    pub confirmation: Option<String>,
}

impl QueuedTurn {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            confirmation: None,
        }
    }

    pub fn with_confirmation(mut self, value: impl Into<String>) -> Self {
        self.confirmation = Some(value.into());
        self
    }
}

/// Result of submitting a turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// The slot was idle; the caller now owns it and must run this turn
    Start(QueuedTurn),
    /// The slot was busy; 1-based position in the queue
    Queued { position: usize },
}

#[derive(Debug, Default)]
struct QueueState {
    busy: bool,
    pending: VecDeque<QueuedTurn>,
}

#[derive(Debug, Default)]
pub struct TurnQueue {
    state: Mutex<QueueState>,
}

impl TurnQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit(&self, turn: QueuedTurn) -> Admission {
        let mut state = self.state.lock();
        if state.busy {
            state.pending.push_back(turn);
            let position = state.pending.len();
            log::debug!("[TURNS] Busy, queued turn at position {}", position);
            Admission::Queued { position }
        } else {
            state.busy = true;
            Admission::Start(turn)
        }
    }

    /// Pop the oldest waiting turn without touching the slot
    pub fn dequeue_next(&self) -> Option<QueuedTurn> {
        self.state.lock().pending.pop_front()
    }

    /// Mark the slot idle. Waiting turns stay queued.
    pub fn release(&self) {
        self.state.lock().busy = false;
    }

    /// End the current turn: hand the slot to the next waiting turn, or go idle
    pub fn finish(&self) -> Option<QueuedTurn> {
        let mut state = self.state.lock();
        match state.pending.pop_front() {
            Some(next) => Some(next),
            None => {
                state.busy = false;
                None
            }
        }
    }

    /// Run `first` and then every turn queued behind it, in order.
    ///
    /// The caller must own the slot (from `Admission::Start`). A failing
    /// handler does not stop the loop; the slot is always released at the end.
    pub async fn drain<F, Fut, E>(&self, first: QueuedTurn, mut handler: F) -> usize
    where
        F: FnMut(QueuedTurn) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: std::fmt::Display,
    {
        let mut processed = 0;
        let mut current = Some(first);
        while let Some(turn) = current {
            if let Err(e) = handler(turn).await {
                log::warn!("[TURNS] Turn failed: {}", e);
            }
            processed += 1;
            current = self.finish();
        }
        processed
    }

    pub fn is_busy(&self) -> bool {
        self.state.lock().busy
    }

    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Drop every waiting turn; returns how many were dropped
    pub fn clear_pending(&self) -> usize {
        let mut state = self.state.lock();
        let dropped = state.pending.len();
        state.pending.clear();
        dropped
    }
}
