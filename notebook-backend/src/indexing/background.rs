//! Background indexing jobs.
//!
//! `schedule_embed` and `schedule_chat` return immediately; the job runs on
//! the tokio runtime. A failed job is logged and parked in the offline queue
//! for the next sync. Embedding failures are also reported on the failure
//! channel.

use note_indexer_types::IndexerRequest;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::offline::{ChatLogEntry, OfflineQueue};
use super::NoteIndexer;

/// A job that did not reach the indexer
#[derive(Debug, Clone, PartialEq)]
pub struct IndexFailure {
    pub note_id: i64,
    pub error: String,
    /// True when the job was saved to the offline queue
    pub queued: bool,
}

/// Handle to a scheduled job. Dropping it does not cancel the job.
pub struct IndexJobHandle {
    pub note_id: i64,
    handle: JoinHandle<bool>,
}

impl IndexJobHandle {
    /// Wait for the job; true if the indexer accepted it
    pub async fn wait(self) -> bool {
        match self.handle.await {
            Ok(delivered) => delivered,
            Err(e) => {
                log::error!("[INDEXER] Job for note {} panicked: {}", self.note_id, e);
                false
            }
        }
    }
}

#[derive(Clone)]
pub struct BackgroundIndexer {
    indexer: Arc<dyn NoteIndexer>,
    offline: Option<Arc<OfflineQueue>>,
    failures: mpsc::UnboundedSender<IndexFailure>,
}

impl BackgroundIndexer {
    pub fn new(
        indexer: Arc<dyn NoteIndexer>,
        offline: Option<Arc<OfflineQueue>>,
    ) -> (Self, mpsc::UnboundedReceiver<IndexFailure>) {
        let (failures, rx) = mpsc::unbounded_channel();
        (
            Self {
                indexer,
                offline,
                failures,
            },
            rx,
        )
    }

    pub fn schedule_embed(&self, note_id: i64, content: &str) -> IndexJobHandle {
        let request = IndexerRequest::embed_note(note_id, content);
        let indexer = Arc::clone(&self.indexer);
        let offline = self.offline.clone();
        let failures = self.failures.clone();

        let handle = tokio::spawn(async move {
            match indexer.send(&request, None).await {
                Ok(()) => {
                    log::debug!("[INDEXER] Embedded note {}", note_id);
                    true
                }
                Err(e) => {
                    log::warn!("[INDEXER] Embedding note {} failed: {}", note_id, e);
                    let queued = match offline {
                        Some(queue) => match queue.enqueue_request(&request) {
                            Ok(_) => true,
                            Err(qe) => {
                                log::error!(
                                    "[INDEXER] Could not queue note {} for retry: {}",
                                    note_id,
                                    qe
                                );
                                false
                            }
                        },
                        None => false,
                    };
                    // Nobody listening is fine
                    let _ = failures.send(IndexFailure {
                        note_id,
                        error: e.to_string(),
                        queued,
                    });
                    false
                }
            }
        });

        IndexJobHandle { note_id, handle }
    }

    /// Replicate a conversation message; resolves to true if the indexer took it
    pub fn schedule_chat(&self, entry: ChatLogEntry) -> JoinHandle<bool> {
        let indexer = Arc::clone(&self.indexer);
        let offline = self.offline.clone();

        tokio::spawn(async move {
            match indexer.send(&entry.to_request(), Some(&entry.id)).await {
                Ok(()) => true,
                Err(e) => {
                    log::debug!("[INDEXER] Chat entry {} deferred: {}", entry.id, e);
                    if let Some(queue) = offline {
                        if let Err(qe) = queue.enqueue_chat(entry) {
                            log::error!("[INDEXER] Could not queue chat entry: {}", qe);
                        }
                    }
                    false
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::error::{PlanError, PlanResult};
    use async_trait::async_trait;

    struct DownIndexer;

    #[async_trait]
    impl NoteIndexer for DownIndexer {
        async fn send(&self, _request: &IndexerRequest, _key: Option<&str>) -> PlanResult<()> {
            Err(PlanError::Network("connection refused".into()))
        }
    }

    struct UpIndexer;

    #[async_trait]
    impl NoteIndexer for UpIndexer {
        async fn send(&self, _request: &IndexerRequest, _key: Option<&str>) -> PlanResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failure_is_reported_and_queued() {
        let offline = Arc::new(OfflineQueue::new(Arc::new(Database::open_in_memory().unwrap())));
        let (indexer, mut failures) =
            BackgroundIndexer::new(Arc::new(DownIndexer), Some(Arc::clone(&offline)));

        let delivered = indexer.schedule_embed(4, "Ship v2").wait().await;
        assert!(!delivered);

        let failure = failures.recv().await.unwrap();
        assert_eq!(failure.note_id, 4);
        assert!(failure.queued);
        assert_eq!(offline.pending_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_chat_entry_is_queued() {
        let offline = Arc::new(OfflineQueue::new(Arc::new(Database::open_in_memory().unwrap())));
        let (indexer, _failures) =
            BackgroundIndexer::new(Arc::new(DownIndexer), Some(Arc::clone(&offline)));

        let entry = ChatLogEntry::new("user", "remind me at 5");
        assert!(!indexer.schedule_chat(entry.clone()).await.unwrap());
        assert_eq!(offline.pending_chat().unwrap(), vec![entry]);
        assert_eq!(offline.pending_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_success_reports_nothing() {
        let (indexer, mut failures) = BackgroundIndexer::new(Arc::new(UpIndexer), None);
        assert!(indexer.schedule_embed(1, "ok").wait().await);
        assert!(indexer.schedule_chat(ChatLogEntry::new("assistant", "done")).await.unwrap());
        drop(indexer);
        assert!(failures.recv().await.is_none());
    }
}
