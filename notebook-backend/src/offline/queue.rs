//! Durable offline queue for side effects that could not reach the indexer.
//!
//! Two JSON arrays in the `kv_store` table: pending operations and pending
//! chat-log entries. `sync()` replays both and clears them only when the whole
//! pass succeeded; a mixed pass leaves everything queued, including entries
//! that did go through. Dedupe keys let the remote side ignore those replays.

use chrono::{DateTime, Utc};
use note_indexer_types::IndexerRequest;
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::db::Database;
use crate::error::PlanResult;
use crate::indexing::NoteIndexer;

pub const QUEUE_KEY: &str = "offline_queue";
pub const CHAT_LOG_KEY: &str = "offline_chat_log";
pub const GENERIC_KIND: &str = "generic";

/// A queued side-effect operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfflineQueueItem {
    pub id: String,
    /// Indexer action name, e.g. `embed_note` or `generic`
    pub kind: String,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
    /// sha-256 of kind + payload
    pub dedupe_key: String,
}

impl OfflineQueueItem {
    /// Rebuild the request to replay. A `generic` item whose payload is not
    /// already a request is forwarded as an opaque payload.
    fn to_request(&self) -> PlanResult<IndexerRequest> {
        match serde_json::from_value::<IndexerRequest>(self.payload.clone()) {
            Ok(request) => Ok(request),
            Err(_) if self.kind == GENERIC_KIND => Ok(IndexerRequest::Generic {
                payload: self.payload.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

/// A conversation message waiting to be logged remotely
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatLogEntry {
    pub id: String,
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatLogEntry {
    pub fn new(role: &str, content: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: role.to_string(),
            content: content.to_string(),
            timestamp: Utc::now(),
        }
    }

    pub(crate) fn to_request(&self) -> IndexerRequest {
        IndexerRequest::LogChat {
            id: self.id.clone(),
            role: self.role.clone(),
            content: self.content.clone(),
            timestamp: self.timestamp.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub synced: usize,
    pub failed: usize,
    pub success: bool,
}

pub struct OfflineQueue {
    db: Arc<Database>,
    /// Guards read-modify-write of the stored arrays
    write_lock: Mutex<()>,
    /// One sync pass at a time
    sync_lock: tokio::sync::Mutex<()>,
}

impl OfflineQueue {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            write_lock: Mutex::new(()),
            sync_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Append an operation. Returns `None` when an identical operation is already pending.
    pub fn enqueue(&self, kind: &str, payload: Value) -> PlanResult<Option<String>> {
        let dedupe_key = dedupe_key(kind, &payload);
        let _guard = self.write_lock.lock();

        let mut items: Vec<OfflineQueueItem> = self.load(QUEUE_KEY)?;
        if items.iter().any(|i| i.dedupe_key == dedupe_key) {
            log::debug!("[OFFLINE] Skipping duplicate {} operation", kind);
            return Ok(None);
        }

        let id = uuid::Uuid::new_v4().to_string();
        items.push(OfflineQueueItem {
            id: id.clone(),
            kind: kind.to_string(),
            payload,
            timestamp: Utc::now(),
            dedupe_key,
        });
        self.store(QUEUE_KEY, &items)?;

        log::info!("[OFFLINE] Queued {} ({} pending)", kind, items.len());
        Ok(Some(id))
    }

    pub fn enqueue_request(&self, request: &IndexerRequest) -> PlanResult<Option<String>> {
        self.enqueue(request.action_name(), serde_json::to_value(request)?)
    }

    pub fn enqueue_chat(&self, entry: ChatLogEntry) -> PlanResult<()> {
        let _guard = self.write_lock.lock();
        let mut entries: Vec<ChatLogEntry> = self.load(CHAT_LOG_KEY)?;
        entries.push(entry);
        self.store(CHAT_LOG_KEY, &entries)
    }

    pub fn pending(&self) -> PlanResult<Vec<OfflineQueueItem>> {
        self.load(QUEUE_KEY)
    }

    pub fn pending_chat(&self) -> PlanResult<Vec<ChatLogEntry>> {
        self.load(CHAT_LOG_KEY)
    }

    pub fn pending_count(&self) -> PlanResult<usize> {
        Ok(self.pending()?.len())
    }

    pub fn pending_chat_count(&self) -> PlanResult<usize> {
        Ok(self.pending_chat()?.len())
    }

    /// Replay every pending operation and chat entry once.
    pub async fn sync(&self, indexer: &dyn NoteIndexer) -> PlanResult<SyncReport> {
        let _pass = self.sync_lock.lock().await;

        let items = self.pending()?;
        let entries = self.pending_chat()?;
        let mut report = SyncReport::default();

        for item in &items {
            let result = match item.to_request() {
                Ok(request) => indexer.send(&request, Some(&item.dedupe_key)).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => report.synced += 1,
                Err(e) => {
                    log::warn!("[OFFLINE] Replay of {} {} failed: {}", item.kind, item.id, e);
                    report.failed += 1;
                }
            }
        }

        for entry in &entries {
            match indexer.send(&entry.to_request(), Some(&entry.id)).await {
                Ok(()) => report.synced += 1,
                Err(e) => {
                    log::warn!("[OFFLINE] Replay of chat entry {} failed: {}", entry.id, e);
                    report.failed += 1;
                }
            }
        }

        report.success = report.failed == 0;
        if report.success {
            // Only drop what this pass replayed; entries queued meanwhile stay
            let item_ids: HashSet<&str> = items.iter().map(|i| i.id.as_str()).collect();
            let entry_ids: HashSet<&str> = entries.iter().map(|e| e.id.as_str()).collect();

            let _guard = self.write_lock.lock();
            let remaining: Vec<OfflineQueueItem> = self
                .load::<OfflineQueueItem>(QUEUE_KEY)?
                .into_iter()
                .filter(|i| !item_ids.contains(i.id.as_str()))
                .collect();
            let remaining_chat: Vec<ChatLogEntry> = self
                .load::<ChatLogEntry>(CHAT_LOG_KEY)?
                .into_iter()
                .filter(|e| !entry_ids.contains(e.id.as_str()))
                .collect();
            self.store(QUEUE_KEY, &remaining)?;
            self.store(CHAT_LOG_KEY, &remaining_chat)?;
        }

        if report.synced + report.failed > 0 {
            log::info!(
                "[OFFLINE] Sync pass: {} synced, {} failed{}",
                report.synced,
                report.failed,
                if report.success { "" } else { " (queue kept)" }
            );
        }
        Ok(report)
    }

    /// Replay the queue every `every`, starting now, until the runtime shuts down
    pub fn spawn_periodic_sync(
        self: Arc<Self>,
        indexer: Arc<dyn NoteIndexer>,
        every: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.sync(indexer.as_ref()).await {
                    log::warn!("[OFFLINE] Sync pass skipped: {}", e);
                }
            }
        })
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> PlanResult<Vec<T>> {
        match self.db.kv_get(key)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    fn store<T: Serialize>(&self, key: &str, values: &[T]) -> PlanResult<()> {
        if values.is_empty() {
            self.db.kv_delete(key)?;
        } else {
            self.db.kv_set(key, &serde_json::to_string(values)?)?;
        }
        Ok(())
    }
}

fn dedupe_key(kind: &str, payload: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(kind.as_bytes());
    hasher.update(b":");
    hasher.update(payload.to_string().as_bytes());
    hex::encode(hasher.finalize())
}
