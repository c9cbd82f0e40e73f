//! Offline support: durable side-effect queue and the rule-based fallback parser.

pub mod fallback;
pub mod queue;

pub use fallback::{parse_offline, FallbackParse};
pub use queue::{ChatLogEntry, OfflineQueue, OfflineQueueItem, SyncReport, GENERIC_KIND};
