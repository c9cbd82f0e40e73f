//! Indexing side channel: note embeddings and chat-log replication.
//!
//! Jobs are fire-and-forget from the executor's point of view. Failures are
//! logged, reported on an error channel and parked in the offline queue.

pub mod background;
pub mod client;

pub use background::{BackgroundIndexer, IndexFailure, IndexJobHandle};
pub use client::HttpIndexer;

use async_trait::async_trait;
use note_indexer_types::IndexerRequest;

use crate::error::PlanResult;

#[async_trait]
pub trait NoteIndexer: Send + Sync {
    /// Deliver one request. `dedupe_key` lets the service drop replays it already applied.
    async fn send(&self, request: &IndexerRequest, dedupe_key: Option<&str>) -> PlanResult<()>;
}
