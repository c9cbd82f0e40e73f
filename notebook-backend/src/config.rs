use std::env;

/// Environment variable names - single source of truth
pub mod env_vars {
    pub const DATABASE_URL: &str = "NOTEBOOK_DATABASE_URL";
    /// Base URL of the note indexer service (embeddings + chat log)
    pub const INDEXER_URL: &str = "NOTE_INDEXER_URL";
    /// Name recorded in `created_by` / `completed_by` for agent mutations
    pub const ACTOR: &str = "NOTEBOOK_ACTOR";
    /// Page and section that receive notes parsed by the offline fallback parser
    pub const INBOX_PAGE: &str = "NOTEBOOK_INBOX_PAGE";
    pub const INBOX_SECTION: &str = "NOTEBOOK_INBOX_SECTION";
    /// Seconds between offline queue replays
    pub const SYNC_INTERVAL_SECS: &str = "NOTEBOOK_SYNC_INTERVAL_SECS";
}

/// Default values
pub mod defaults {
    pub const DATABASE_URL: &str = "./.db/notebook.db";
    pub const INDEXER_URL: &str = "http://127.0.0.1:9110";
    pub const ACTOR: &str = "agent";
    pub const INBOX_PAGE: &str = "Inbox";
    pub const INBOX_SECTION: &str = "Notes";
    pub const SYNC_INTERVAL_SECS: u64 = 60;
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub indexer_url: String,
    pub actor: String,
    pub inbox_page: String,
    pub inbox_section: String,
    pub sync_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var(env_vars::DATABASE_URL)
                .unwrap_or_else(|_| defaults::DATABASE_URL.to_string()),
            indexer_url: env::var(env_vars::INDEXER_URL)
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| defaults::INDEXER_URL.to_string()),
            actor: non_empty_var(env_vars::ACTOR).unwrap_or_else(|| defaults::ACTOR.to_string()),
            inbox_page: non_empty_var(env_vars::INBOX_PAGE)
                .unwrap_or_else(|| defaults::INBOX_PAGE.to_string()),
            inbox_section: non_empty_var(env_vars::INBOX_SECTION)
                .unwrap_or_else(|| defaults::INBOX_SECTION.to_string()),
            sync_interval_secs: non_empty_var(env_vars::SYNC_INTERVAL_SECS)
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults::SYNC_INTERVAL_SECS),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
