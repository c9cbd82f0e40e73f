//! Line-oriented driver for the notebook engine.
//!
//! Each stdin line is one conversational turn:
//! - a JSON array is a plan (`[{"type": "create_page", ...}, ...]`)
//! - `yes` / `no` answers the pending confirmation for a destructive plan
//! - anything else becomes a note in the inbox via the offline parser
//!
//! Results are printed to stdout as JSON, one object per turn.

use dotenv::dotenv;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use notebook_backend::config::Config;
use notebook_backend::db::{Database, SectionWhere, WorkspaceCache, WorkspaceStore};
use notebook_backend::error::{PlanError, PlanResult};
use notebook_backend::indexing::{BackgroundIndexer, HttpIndexer};
use notebook_backend::models::{NewPage, NewSection};
use notebook_backend::offline::{parse_offline, ChatLogEntry, OfflineQueue};
use notebook_backend::plan::{PlanAction, PlanExecutor, PlanGroup};
use notebook_backend::turns::{Admission, ChatMessage, Conversation, MessageRole, QueuedTurn};

struct App {
    config: Config,
    executor: PlanExecutor,
    background: BackgroundIndexer,
    conversation: Conversation,
    /// Destructive plan waiting for a yes/no
    awaiting_confirmation: parking_lot::Mutex<Option<PlanGroup>>,
}

impl App {
    /// Run one turn and collect its stdout replies. A failed turn still gets one.
    async fn respond(&self, turn: QueuedTurn) -> Vec<Value> {
        match self.handle_turn(turn).await {
            Ok(replies) => replies,
            Err(e) => {
                log::warn!("[TURNS] Turn failed: {}", e);
                self.record(MessageRole::Assistant, &format!("Error: {}", e));
                vec![json!({"error": e.to_string()})]
            }
        }
    }

    async fn handle_turn(&self, turn: QueuedTurn) -> PlanResult<Vec<Value>> {
        self.record(MessageRole::User, &turn.input);

        if let Some(answer) = turn.confirmation.as_deref() {
            return self.handle_confirmation(answer).await;
        }

        let actions = if turn.input.trim_start().starts_with('[') {
            serde_json::from_str::<Vec<PlanAction>>(&turn.input)
                .map_err(|e| PlanError::Validation(format!("unreadable plan: {}", e)))?
        } else {
            let today = chrono::Local::now().date_naive();
            vec![parse_offline(&turn.input, today)
                .into_action(&self.config.inbox_page, &self.config.inbox_section)]
        };

        let mut group = PlanGroup::new(actions);
        if !group.has_destructive_actions() {
            group.approve()?;
            return Ok(vec![self.run(&mut group).await?]);
        }

        let previews: Vec<Value> = group
            .actions
            .iter()
            .filter_map(|a| match self.executor.preview_action(a) {
                Ok(Some(p)) => Some(json!({
                    "action": a.display_name(),
                    "count": p.count,
                    "samples": p.samples,
                })),
                Ok(None) => None,
                Err(e) => Some(json!({"action": a.display_name(), "error": e.to_string()})),
            })
            .collect();
        let mut replies = vec![json!({
            "group_id": group.id,
            "status": group.status(),
            "confirm": "yes/no",
            "previews": previews,
        })];
        self.record(MessageRole::Assistant, "Plan needs confirmation");

        let superseded = self.awaiting_confirmation.lock().replace(group);
        if let Some(old) = superseded {
            log::warn!("[PLAN] Group {} superseded before confirmation", old.id);
            replies.push(json!({"group_id": old.id, "discarded": true, "reason": "superseded"}));
        }
        Ok(replies)
    }

    async fn handle_confirmation(&self, answer: &str) -> PlanResult<Vec<Value>> {
        let Some(mut group) = self.awaiting_confirmation.lock().take() else {
            return Err(PlanError::Validation("nothing is waiting for confirmation".to_string()));
        };

        if answer.eq_ignore_ascii_case("yes") {
            group.approve()?;
            Ok(vec![self.run(&mut group).await?])
        } else {
            log::info!("[PLAN] Group {} discarded", group.id);
            self.record(MessageRole::Assistant, "Plan discarded");
            Ok(vec![json!({"group_id": group.id, "discarded": true})])
        }
    }

    async fn run(&self, group: &mut PlanGroup) -> PlanResult<Value> {
        let (summary, _outcome) = self.executor.run_group(group).await?;
        self.record(
            MessageRole::Assistant,
            &format!("{} of {} actions succeeded", summary.succeeded, summary.total),
        );
        Ok(json!({
            "group_id": group.id,
            "status": group.status(),
            "summary": summary,
            "results": group.results(),
        }))
    }

    /// Append to the conversation and replicate in the background
    fn record(&self, role: MessageRole, content: &str) {
        self.conversation.record(ChatMessage::new(role, content));
        // Detached; a failed send lands in the offline queue
        let _ = self.background.schedule_chat(ChatLogEntry::new(role.as_ref(), content));
    }
}

/// Make sure the fallback parser's target page/section exist
async fn ensure_inbox(store: &dyn WorkspaceStore, config: &Config) -> PlanResult<()> {
    let pages = store.list_pages().await?;
    let page = match pages
        .into_iter()
        .find(|p| p.name.eq_ignore_ascii_case(&config.inbox_page))
    {
        Some(page) => page,
        None => {
            log::info!("Creating inbox page \"{}\"", config.inbox_page);
            store
                .create_page(&NewPage { name: config.inbox_page.clone(), starred: false })
                .await?
        }
    };

    let sections = store.list_sections(&SectionWhere::for_pages(vec![page.id])).await?;
    if !sections
        .iter()
        .any(|s| s.name.eq_ignore_ascii_case(&config.inbox_section))
    {
        log::info!("Creating inbox section \"{}\"", config.inbox_section);
        store
            .create_section(&NewSection { name: config.inbox_section.clone(), page_id: page.id })
            .await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env();
    log::info!("Notebook backend v{}", env!("CARGO_PKG_VERSION"));

    log::info!("Initializing database at {}", config.database_url);
    let db = match Database::new(&config.database_url) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            log::error!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = ensure_inbox(db.as_ref(), &config).await {
        log::error!("Failed to prepare inbox: {}", e);
        std::process::exit(1);
    }

    let cache = Arc::new(WorkspaceCache::new());
    if let Err(e) = cache.reload(db.as_ref()).await {
        log::error!("Failed to load workspace: {}", e);
        std::process::exit(1);
    }

    let indexer = Arc::new(HttpIndexer::new(&config.indexer_url));
    let offline = Arc::new(OfflineQueue::new(Arc::clone(&db)));
    let (background, mut failures) =
        BackgroundIndexer::new(indexer.clone(), Some(Arc::clone(&offline)));

    tokio::spawn(async move {
        while let Some(failure) = failures.recv().await {
            log::warn!(
                "[INDEXER] Note {} not indexed ({}){}",
                failure.note_id,
                failure.error,
                if failure.queued { ", queued for retry" } else { "" }
            );
        }
    });

    // First pass runs immediately and drains what the last run left behind
    offline.spawn_periodic_sync(indexer, Duration::from_secs(config.sync_interval_secs));

    let executor = PlanExecutor::new(db.clone(), cache, &config.actor)
        .with_indexer(background.clone());
    let app = Arc::new(App {
        config,
        executor,
        background,
        conversation: Conversation::new(),
        awaiting_confirmation: parking_lot::Mutex::new(None),
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut workers = Vec::new();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                log::error!("Failed to read input: {}", e);
                break;
            }
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let turn = if input.eq_ignore_ascii_case("yes") || input.eq_ignore_ascii_case("no") {
            QueuedTurn::new(input).with_confirmation(input.to_lowercase())
        } else {
            QueuedTurn::new(input)
        };

        match app.conversation.turns.submit(turn) {
            Admission::Start(first) => {
                let app = Arc::clone(&app);
                workers.push(tokio::spawn(async move {
                    let app = app.as_ref();
                    app.conversation
                        .turns
                        .drain(first, |turn| async move {
                            for reply in app.respond(turn).await {
                                println!("{}", reply);
                            }
                            Ok::<(), PlanError>(())
                        })
                        .await;
                }));
            }
            Admission::Queued { position } => {
                log::info!("Turn queued at position {}", position);
            }
        }
    }

    for worker in workers {
        if let Err(e) = worker.await {
            log::error!("Turn worker failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use notebook_backend::indexing::NoteIndexer;
    use note_indexer_types::IndexerRequest;

    struct DownIndexer;

    #[async_trait]
    impl NoteIndexer for DownIndexer {
        async fn send(&self, _request: &IndexerRequest, _key: Option<&str>) -> PlanResult<()> {
            Err(PlanError::Network("connection refused".into()))
        }
    }

    async fn test_app() -> App {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let config = Config {
            database_url: ":memory:".into(),
            indexer_url: "http://127.0.0.1:9".into(),
            actor: "agent".into(),
            inbox_page: "Inbox".into(),
            inbox_section: "Notes".into(),
            sync_interval_secs: 60,
        };
        ensure_inbox(db.as_ref(), &config).await.unwrap();

        let cache = Arc::new(WorkspaceCache::new());
        cache.reload(db.as_ref()).await.unwrap();
        let offline = Arc::new(OfflineQueue::new(Arc::clone(&db)));
        let (background, _failures) = BackgroundIndexer::new(Arc::new(DownIndexer), Some(offline));
        let executor = PlanExecutor::new(db, cache, "agent").with_indexer(background.clone());

        App {
            config,
            executor,
            background,
            conversation: Conversation::new(),
            awaiting_confirmation: parking_lot::Mutex::new(None),
        }
    }

    #[tokio::test]
    async fn test_failed_turns_still_reply() {
        let app = test_app().await;

        let replies = app.respond(QueuedTurn::new(r#"[{"type": "explode"}]"#)).await;
        assert_eq!(replies.len(), 1);
        assert!(replies[0]["error"].as_str().unwrap().contains("unreadable plan"));

        let replies = app.respond(QueuedTurn::new("yes").with_confirmation("yes")).await;
        assert!(replies[0]["error"].as_str().unwrap().contains("nothing is waiting"));
    }

    #[tokio::test]
    async fn test_plain_text_lands_in_inbox() {
        let app = test_app().await;
        let replies = app.respond(QueuedTurn::new("Buy milk #home")).await;

        assert_eq!(replies[0]["summary"]["succeeded"], 1);
        let notes = app.executor.cache().notes();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].content, "Buy milk");
        assert!(notes[0].tags.contains("home"));
    }

    #[tokio::test]
    async fn test_newer_destructive_plan_supersedes_pending_one() {
        let app = test_app().await;
        app.respond(QueuedTurn::new("Buy milk")).await;

        let first = app
            .respond(QueuedTurn::new(r#"[{"type": "delete_notes", "filter": {}}]"#))
            .await;
        assert_eq!(first.len(), 1);
        assert_eq!(first[0]["previews"][0]["count"], 1);

        let second = app
            .respond(QueuedTurn::new(
                r#"[{"type": "bulk_mark_complete", "filter": {}, "section_name": "Notes"}]"#,
            ))
            .await;
        assert_eq!(second.len(), 2);
        assert_eq!(second[1]["group_id"], first[0]["group_id"]);
        assert_eq!(second[1]["reason"], "superseded");

        let ran = app.respond(QueuedTurn::new("yes").with_confirmation("yes")).await;
        assert_eq!(ran[0]["group_id"], second[0]["group_id"]);
        assert_eq!(ran[0]["results"][0]["action"], "bulk_mark_complete");

        let notes = app.executor.cache().notes();
        assert_eq!(notes.len(), 1);
        assert!(notes[0].completed);
    }
}
