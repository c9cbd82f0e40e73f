//! Plan executor.
//!
//! Runs a plan's actions strictly in input order. Every action yields exactly
//! one `ActionResult`; a failing action is recorded and the next one runs.
//! Nothing is retried or rolled back.
//!
//! Per mutating action:
//! 1. resolve references against a fresh cache snapshot + the run context
//! 2. persist
//! 3. apply the same change to the cache
//! 4. (note creation) schedule a background indexing job

use std::collections::HashSet;
use std::sync::Arc;

use crate::bulk::{
    execute_bulk_operation, filter_notes, plan_change, preview, BulkOperation, BulkPreview,
    NoteChange, NoteFilter,
};
use crate::db::{NoteWhere, SectionWhere, WorkspaceCache, WorkspaceSnapshot, WorkspaceStore};
use crate::error::{PlanError, PlanResult};
use crate::indexing::{BackgroundIndexer, IndexJobHandle};
use crate::models::{
    normalize_tags, CachedPage, EntityKind, NewNote, NewPage, NewSection, Note,
};
use super::action::PlanAction;
use super::context::{CreatedEntity, ExecutionContext};
use super::group::{ActionResult, PlanGroup, PlanGroupStatus, PlanSummary};
use super::resolver::{EntityRef, Resolver};

/// Results of one plan execution
pub struct GroupOutcome {
    pub results: Vec<ActionResult>,
    pub context: ExecutionContext,
    /// Indexing jobs started by this plan; they may still be running
    pub index_jobs: Vec<IndexJobHandle>,
}

/// What a successful handler reports back
#[derive(Debug, Default)]
struct Applied {
    id: Option<i64>,
    count: Option<usize>,
    /// Partial bulk failure: the action is reported as failed with this message
    partial_error: Option<String>,
}

impl Applied {
    fn id(id: i64) -> Self {
        Self { id: Some(id), ..Default::default() }
    }
}

pub struct PlanExecutor {
    store: Arc<dyn WorkspaceStore>,
    cache: Arc<WorkspaceCache>,
    indexer: Option<BackgroundIndexer>,
    actor: String,
}

impl PlanExecutor {
    pub fn new(store: Arc<dyn WorkspaceStore>, cache: Arc<WorkspaceCache>, actor: &str) -> Self {
        Self {
            store,
            cache,
            indexer: None,
            actor: actor.to_string(),
        }
    }

    pub fn with_indexer(mut self, indexer: BackgroundIndexer) -> Self {
        self.indexer = Some(indexer);
        self
    }

    pub fn cache(&self) -> &Arc<WorkspaceCache> {
        &self.cache
    }

    /// Run an approved group to completion and aggregate its results.
    ///
    /// Groups still under review are refused: approval is how destructive
    /// actions get confirmed.
    pub async fn run_group(&self, group: &mut PlanGroup) -> PlanResult<(PlanSummary, GroupOutcome)> {
        if group.status() != PlanGroupStatus::Executing {
            return Err(PlanError::Validation(format!(
                "plan group {} must be approved before execution (status: {})",
                group.id,
                group.status()
            )));
        }

        let outcome = self.execute_group(&group.actions, ExecutionContext::new()).await;
        let summary = group.complete(outcome.results.clone())?;
        log::info!(
            "[PLAN] Group {} complete: {} succeeded, {} failed",
            group.id,
            summary.succeeded,
            summary.failed
        );
        Ok((summary, outcome))
    }

    /// What a bulk action would touch right now, scoped exactly as execution
    /// scopes it. `None` for actions that carry no note filter.
    pub fn preview_action(&self, action: &PlanAction) -> PlanResult<Option<BulkPreview>> {
        let Some((filter, page_name, section_name)) = action.bulk_scope() else {
            return Ok(None);
        };
        let snapshot = self.cache.snapshot();
        let resolver = Resolver::new(&snapshot);
        let (notes, filter) = self.scope_bulk(
            &resolver,
            &snapshot,
            filter,
            page_name,
            section_name,
            &ExecutionContext::new(),
        )?;
        Ok(Some(preview(&notes, &filter)))
    }

    /// Execute `actions` in order, continuing past failures
    pub async fn execute_group(
        &self,
        actions: &[PlanAction],
        initial_context: ExecutionContext,
    ) -> GroupOutcome {
        let mut context = initial_context;
        let mut index_jobs = Vec::new();
        let mut results = Vec::with_capacity(actions.len());

        for (idx, action) in actions.iter().enumerate() {
            let result = match self.execute_action(action, &mut context, &mut index_jobs).await {
                Ok(applied) => match applied.partial_error {
                    None => {
                        log::info!("[PLAN] #{} {} ok", idx + 1, action.display_name());
                        ActionResult::success(action, applied.id, applied.count)
                    }
                    Some(error) => {
                        log::warn!("[PLAN] #{} {} partially failed: {}", idx + 1, action.display_name(), error);
                        let mut result = ActionResult::failure(action, error);
                        result.count = applied.count;
                        result
                    }
                },
                Err(e) => {
                    log::warn!("[PLAN] #{} {} failed: {}", idx + 1, action.display_name(), e);
                    ActionResult::failure(action, e.to_string())
                }
            };
            results.push(result);
        }

        GroupOutcome {
            results,
            context,
            index_jobs,
        }
    }

    async fn execute_action(
        &self,
        action: &PlanAction,
        ctx: &mut ExecutionContext,
        jobs: &mut Vec<IndexJobHandle>,
    ) -> PlanResult<Applied> {
        let snapshot = self.cache.snapshot();
        let resolver = Resolver::new(&snapshot);

        match action {
            PlanAction::CreatePage { name, starred } => {
                self.create_page(name, *starred, ctx).await
            }
            PlanAction::CreateSection { name, page_id, page_name } => {
                let page_id = resolver.resolve(
                    EntityKind::Page,
                    &EntityRef::new(*page_id, page_name.as_deref()),
                    ctx,
                )?;
                self.create_section(name, page_id, ctx).await
            }
            PlanAction::CreateNote {
                content,
                section_id,
                section_name,
                page_name,
                tags,
                date,
            } => {
                let section_id = self.resolve_section(
                    &resolver,
                    *section_id,
                    section_name.as_deref(),
                    page_name.as_deref(),
                    ctx,
                )?;
                let new_note = NewNote {
                    section_id,
                    content: content.trim().to_string(),
                    date: *date,
                    tags: normalize_tags(tags),
                    created_by: Some(self.actor.clone()),
                };
                self.create_note(new_note, ctx, jobs).await
            }
            PlanAction::DeletePage { page_id, page_name } => {
                let page_id = resolver.resolve(
                    EntityKind::Page,
                    &EntityRef::new(*page_id, page_name.as_deref()),
                    ctx,
                )?;
                self.delete_page(page_id, &snapshot, ctx).await
            }
            PlanAction::DeleteSection { section_id, section_name, page_name } => {
                let section_id = self.resolve_section(
                    &resolver,
                    *section_id,
                    section_name.as_deref(),
                    page_name.as_deref(),
                    ctx,
                )?;
                self.delete_section(section_id, &snapshot, ctx).await
            }
            PlanAction::DeleteNotes { filter, page_name, section_name } => {
                let (notes, filter) = self.scope_bulk(
                    &resolver,
                    &snapshot,
                    filter,
                    page_name.as_deref(),
                    section_name.as_deref(),
                    ctx,
                )?;
                let matched: Vec<i64> = filter_notes(&notes, &filter).iter().map(|n| n.id).collect();
                let applied = self.run_bulk(&notes, &filter, &BulkOperation::Delete).await;

                // The cache only drops notes whose delete went through
                let remaining: HashSet<i64> = self.cache.notes().iter().map(|n| n.id).collect();
                let deleted: Vec<i64> =
                    matched.into_iter().filter(|id| !remaining.contains(id)).collect();
                ctx.forget(EntityKind::Note, &deleted);
                Ok(applied)
            }
            PlanAction::BulkAddTag { filter, tag, page_name, section_name } => {
                let op = BulkOperation::add_tag(tag.as_deref())?;
                let (notes, filter) = self.scope_bulk(
                    &resolver,
                    &snapshot,
                    filter,
                    page_name.as_deref(),
                    section_name.as_deref(),
                    ctx,
                )?;
                Ok(self.run_bulk(&notes, &filter, &op).await)
            }
            PlanAction::BulkRemoveTag { filter, tag, page_name, section_name } => {
                let op = BulkOperation::remove_tag(tag.as_deref())?;
                let (notes, filter) = self.scope_bulk(
                    &resolver,
                    &snapshot,
                    filter,
                    page_name.as_deref(),
                    section_name.as_deref(),
                    ctx,
                )?;
                Ok(self.run_bulk(&notes, &filter, &op).await)
            }
            PlanAction::BulkMoveToSection {
                filter,
                page_name,
                section_name,
                target_section_id,
                target_section_name,
                target_page_name,
            } => {
                let target = self.resolve_section(
                    &resolver,
                    *target_section_id,
                    target_section_name.as_deref(),
                    target_page_name.as_deref(),
                    ctx,
                )?;
                let (notes, filter) = self.scope_bulk(
                    &resolver,
                    &snapshot,
                    filter,
                    page_name.as_deref(),
                    section_name.as_deref(),
                    ctx,
                )?;
                Ok(self.run_bulk(&notes, &filter, &BulkOperation::MoveToSection(target)).await)
            }
            PlanAction::BulkMarkComplete { filter, page_name, section_name } => {
                let (notes, filter) = self.scope_bulk(
                    &resolver,
                    &snapshot,
                    filter,
                    page_name.as_deref(),
                    section_name.as_deref(),
                    ctx,
                )?;
                Ok(self.run_bulk(&notes, &filter, &BulkOperation::MarkComplete).await)
            }
            PlanAction::BulkMarkIncomplete { filter, page_name, section_name } => {
                let (notes, filter) = self.scope_bulk(
                    &resolver,
                    &snapshot,
                    filter,
                    page_name.as_deref(),
                    section_name.as_deref(),
                    ctx,
                )?;
                Ok(self.run_bulk(&notes, &filter, &BulkOperation::MarkIncomplete).await)
            }
            PlanAction::AddTagToNote { note_id, note_content, tag } => {
                let op = BulkOperation::add_tag(tag.as_deref())?;
                let note_id = resolver.resolve(
                    EntityKind::Note,
                    &EntityRef::new(*note_id, note_content.as_deref()),
                    ctx,
                )?;
                self.add_tag_to_note(note_id, &op, &snapshot).await
            }
        }
    }

    /// Resolve a section, scoping a name match to `page_name` when given
    fn resolve_section(
        &self,
        resolver: &Resolver<'_>,
        section_id: Option<i64>,
        section_name: Option<&str>,
        page_name: Option<&str>,
        ctx: &ExecutionContext,
    ) -> PlanResult<i64> {
        let section_ref = EntityRef::new(section_id, section_name);
        let page_name = page_name.map(str::trim).filter(|p| !p.is_empty());
        let scope = match (section_ref.name, page_name) {
            (Some(_), Some(page)) if section_ref.id.is_none() => Some(resolver.resolve(
                EntityKind::Page,
                &EntityRef::new(None, Some(page)),
                ctx,
            )?),
            _ => None,
        };
        resolver.resolve(EntityKind::Section, &section_ref.scoped(scope), ctx)
    }

    /// Narrow the candidate notes and filter to an optional page/section scope
    fn scope_bulk(
        &self,
        resolver: &Resolver<'_>,
        snapshot: &WorkspaceSnapshot,
        filter: &NoteFilter,
        page_name: Option<&str>,
        section_name: Option<&str>,
        ctx: &ExecutionContext,
    ) -> PlanResult<(Vec<Note>, NoteFilter)> {
        let mut filter = filter.clone();
        let page_name = page_name.map(str::trim).filter(|p| !p.is_empty());

        if section_name.is_some_and(|s| !s.trim().is_empty()) {
            let section_id = self.resolve_section(resolver, None, section_name, page_name, ctx)?;
            filter.section_id = Some(section_id);
            return Ok((snapshot.notes.clone(), filter));
        }

        if page_name.is_some() {
            let page_id =
                resolver.resolve(EntityKind::Page, &EntityRef::new(None, page_name), ctx)?;
            let sections: HashSet<i64> = snapshot
                .sections
                .iter()
                .filter(|s| s.page_id == page_id)
                .map(|s| s.id)
                .collect();
            let notes = snapshot
                .notes
                .iter()
                .filter(|n| sections.contains(&n.section_id))
                .cloned()
                .collect();
            return Ok((notes, filter));
        }

        Ok((snapshot.notes.clone(), filter))
    }

    async fn run_bulk(&self, notes: &[Note], filter: &NoteFilter, op: &BulkOperation) -> Applied {
        let outcome =
            execute_bulk_operation(self.store.as_ref(), &self.cache, notes, filter, op, &self.actor)
                .await;
        Applied {
            id: None,
            count: Some(outcome.succeeded),
            partial_error: (outcome.failed > 0).then(|| {
                format!(
                    "{} of {} notes failed: {}",
                    outcome.failed,
                    outcome.total,
                    outcome.errors.join("; ")
                )
            }),
        }
    }

    async fn create_page(
        &self,
        name: &str,
        starred: bool,
        ctx: &mut ExecutionContext,
    ) -> PlanResult<Applied> {
        let name = required_name(name, "page")?;
        let page = self.store.create_page(&NewPage { name: name.clone(), starred }).await?;

        let id = page.id;
        self.cache.update_pages(|pages| pages.push(CachedPage::new(page)));
        ctx.record_created(
            EntityKind::Page,
            CreatedEntity { id, name, parent_id: None },
        );
        Ok(Applied::id(id))
    }

    async fn create_section(
        &self,
        name: &str,
        page_id: i64,
        ctx: &mut ExecutionContext,
    ) -> PlanResult<Applied> {
        let name = required_name(name, "section")?;
        let section = self
            .store
            .create_section(&NewSection { name: name.clone(), page_id })
            .await?;

        let id = section.id;
        self.cache.update_pages(|pages| {
            if let Some(entry) = pages.iter_mut().find(|p| p.page.id == page_id) {
                entry.sections.push(section);
            }
        });
        ctx.record_created(
            EntityKind::Section,
            CreatedEntity { id, name, parent_id: Some(page_id) },
        );
        Ok(Applied::id(id))
    }

    async fn create_note(
        &self,
        new_note: NewNote,
        ctx: &mut ExecutionContext,
        jobs: &mut Vec<IndexJobHandle>,
    ) -> PlanResult<Applied> {
        if new_note.content.is_empty() {
            return Err(PlanError::Validation("note content is empty".to_string()));
        }
        let note = self.store.create_note(&new_note).await?;

        let id = note.id;
        let section_id = note.section_id;
        let content = note.content.clone();
        self.cache.update_notes(|notes| notes.push(note));
        ctx.record_created(
            EntityKind::Note,
            CreatedEntity { id, name: content.clone(), parent_id: Some(section_id) },
        );

        if let Some(ref indexer) = self.indexer {
            jobs.push(indexer.schedule_embed(id, &content));
        }
        Ok(Applied::id(id))
    }

    /// Cascade: notes, then sections, then the page. The cache follows each step.
    async fn delete_page(
        &self,
        page_id: i64,
        snapshot: &WorkspaceSnapshot,
        ctx: &mut ExecutionContext,
    ) -> PlanResult<Applied> {
        let section_ids: Vec<i64> = self
            .store
            .list_sections(&SectionWhere::for_pages(vec![page_id]))
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect();

        let deleted_notes = self.delete_notes_in_sections(&section_ids, snapshot, ctx).await?;

        if !section_ids.is_empty() {
            self.store
                .delete_sections(&SectionWhere::for_pages(vec![page_id]))
                .await?;
            self.cache.update_pages(|pages| {
                if let Some(entry) = pages.iter_mut().find(|p| p.page.id == page_id) {
                    entry.sections.clear();
                }
            });
            ctx.forget(EntityKind::Section, &section_ids);
        }

        self.store.delete_page(page_id).await?;
        self.cache.update_pages(|pages| pages.retain(|p| p.page.id != page_id));
        ctx.forget(EntityKind::Page, &[page_id]);

        Ok(Applied { id: Some(page_id), count: Some(deleted_notes), partial_error: None })
    }

    async fn delete_section(
        &self,
        section_id: i64,
        snapshot: &WorkspaceSnapshot,
        ctx: &mut ExecutionContext,
    ) -> PlanResult<Applied> {
        let deleted_notes = self.delete_notes_in_sections(&[section_id], snapshot, ctx).await?;

        let removed = self
            .store
            .delete_sections(&SectionWhere::for_ids(vec![section_id]))
            .await?;
        if removed == 0 {
            return Err(PlanError::Persistence(format!(
                "section {} does not exist",
                section_id
            )));
        }
        self.cache.update_pages(|pages| {
            for entry in pages.iter_mut() {
                entry.sections.retain(|s| s.id != section_id);
            }
        });
        ctx.forget(EntityKind::Section, &[section_id]);

        Ok(Applied { id: Some(section_id), count: Some(deleted_notes), partial_error: None })
    }

    async fn delete_notes_in_sections(
        &self,
        section_ids: &[i64],
        snapshot: &WorkspaceSnapshot,
        ctx: &mut ExecutionContext,
    ) -> PlanResult<usize> {
        if section_ids.is_empty() {
            return Ok(0);
        }

        let deleted = self
            .store
            .delete_notes(&NoteWhere::for_sections(section_ids.to_vec()))
            .await?;

        let note_ids: Vec<i64> = snapshot
            .notes
            .iter()
            .filter(|n| section_ids.contains(&n.section_id))
            .map(|n| n.id)
            .collect();
        self.cache
            .update_notes(|notes| notes.retain(|n| !section_ids.contains(&n.section_id)));
        ctx.forget(EntityKind::Note, &note_ids);
        Ok(deleted)
    }

    async fn add_tag_to_note(
        &self,
        note_id: i64,
        op: &BulkOperation,
        snapshot: &WorkspaceSnapshot,
    ) -> PlanResult<Applied> {
        let note = match snapshot.notes.iter().find(|n| n.id == note_id) {
            Some(note) => note.clone(),
            None => self
                .store
                .list_notes(&NoteWhere::for_ids(vec![note_id]))
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| PlanError::ReferenceNotFound {
                    kind: EntityKind::Note,
                    name: format!("#{}", note_id),
                })?,
        };

        if let NoteChange::Update(update) = plan_change(op, &note, &self.actor, chrono::Utc::now()) {
            if !update.is_empty() {
                self.store.update_note(note_id, &update).await?;
                self.cache.update_notes(|notes| {
                    if let Some(n) = notes.iter_mut().find(|n| n.id == note_id) {
                        update.apply(n);
                    }
                });
            }
        }
        Ok(Applied { id: Some(note_id), count: Some(1), partial_error: None })
    }
}

fn required_name(name: &str, what: &str) -> PlanResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        Err(PlanError::Validation(format!("{} name is empty", what)))
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::error::PlanResult;
    use crate::indexing::NoteIndexer;
    use crate::models::{NoteUpdate, Page, Section};
    use crate::offline::OfflineQueue;
    use async_trait::async_trait;
    use note_indexer_types::IndexerRequest;
    use serde_json::json;

    async fn executor() -> (Arc<Database>, PlanExecutor) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let cache = Arc::new(WorkspaceCache::new());
        cache.reload(db.as_ref()).await.unwrap();
        let exec = PlanExecutor::new(db.clone(), cache, "agent");
        (db, exec)
    }

    fn plan(value: serde_json::Value) -> Vec<PlanAction> {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_launch_scenario() {
        let (_db, exec) = executor().await;
        let actions = plan(json!([
            {"type": "create_page", "name": "Launch"},
            {"type": "create_section", "name": "Checklist", "page_name": "Launch"},
            {"type": "create_note", "content": "Ship v2", "section_name": "Checklist", "tags": ["urgent"]}
        ]));

        let outcome = exec.execute_group(&actions, ExecutionContext::new()).await;

        assert_eq!(outcome.results.len(), 3);
        assert!(outcome.results.iter().all(|r| r.success));
        assert_eq!(outcome.context.created_notes.len(), 1);

        let section_id = outcome.results[1].id.unwrap();
        let notes = exec.cache().notes();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].section_id, section_id);
        assert_eq!(notes[0].created_by.as_deref(), Some("agent"));
        assert!(notes[0].tags.contains("urgent"));
    }

    #[tokio::test]
    async fn test_failures_do_not_abort_and_order_is_kept() {
        let (_db, exec) = executor().await;
        let actions = plan(json!([
            {"type": "create_section", "name": "Orphan"},
            {"type": "create_page", "name": "Home"},
            {"type": "create_note", "content": "x", "section_name": "Nowhere"},
            {"type": "bulk_add_tag", "filter": {}},
            {"type": "create_section", "name": "Todo"}
        ]));

        let outcome = exec.execute_group(&actions, ExecutionContext::new()).await;
        let flags: Vec<bool> = outcome.results.iter().map(|r| r.success).collect();
        assert_eq!(flags, vec![false, true, false, false, true]);

        assert!(outcome.results[0].error.as_ref().unwrap().contains("No page"));
        assert!(outcome.results[2].error.as_ref().unwrap().contains("Nowhere"));
        assert!(outcome.results[3].error.as_ref().unwrap().contains("requires a tag"));
        for (action, result) in actions.iter().zip(&outcome.results) {
            assert_eq!(action.kind(), result.action);
        }
    }

    #[tokio::test]
    async fn test_implicit_continuation_uses_last_created() {
        let (_db, exec) = executor().await;
        let actions = plan(json!([
            {"type": "create_page", "name": "Trip"},
            {"type": "create_section", "name": "Packing"},
            {"type": "create_note", "content": "Passport"},
            {"type": "add_tag_to_note", "tag": "Important"}
        ]));

        let outcome = exec.execute_group(&actions, ExecutionContext::new()).await;
        assert!(outcome.results.iter().all(|r| r.success), "{:?}", outcome.results);

        let note = &exec.cache().notes()[0];
        assert_eq!(Some(note.id), outcome.results[2].id);
        assert!(note.tags.contains("important"));
    }

    #[tokio::test]
    async fn test_name_reference_resolves_to_earlier_creation() {
        let (_db, exec) = executor().await;
        let actions = plan(json!([
            {"type": "create_page", "name": "Work"},
            {"type": "create_page", "name": "Home"},
            {"type": "create_section", "name": "Todo", "page_name": "WORK"}
        ]));

        let outcome = exec.execute_group(&actions, ExecutionContext::new()).await;
        let work_id = outcome.results[0].id.unwrap();
        let pages = exec.cache().pages();
        let work = pages.iter().find(|p| p.page.id == work_id).unwrap();
        assert_eq!(work.sections.len(), 1);
        assert_eq!(work.sections[0].name, "Todo");
    }

    #[tokio::test]
    async fn test_delete_page_cascades() {
        let (db, exec) = executor().await;
        let setup = plan(json!([
            {"type": "create_page", "name": "Launch"},
            {"type": "create_section", "name": "A"},
            {"type": "create_note", "content": "one"},
            {"type": "create_section", "name": "B"},
            {"type": "create_note", "content": "two"},
            {"type": "create_page", "name": "Keep"},
            {"type": "create_section", "name": "C"},
            {"type": "create_note", "content": "three"}
        ]));
        exec.execute_group(&setup, ExecutionContext::new()).await;

        let outcome = exec
            .execute_group(
                &plan(json!([{"type": "delete_page", "page_name": "launch"}])),
                ExecutionContext::new(),
            )
            .await;
        assert!(outcome.results[0].success);
        assert_eq!(outcome.results[0].count, Some(2));

        let pages = db.list_pages().unwrap();
        let sections = db.list_sections(&SectionWhere::default()).unwrap();
        let notes = db.list_notes(&NoteWhere::default()).unwrap();
        assert_eq!(pages.len(), 1);
        assert!(sections.iter().all(|s| s.page_id == pages[0].id));
        assert_eq!(notes.len(), 1);
        assert!(notes.iter().all(|n| sections.iter().any(|s| s.id == n.section_id)));

        let cached = exec.cache().snapshot();
        assert_eq!(cached.pages, pages);
        assert_eq!(cached.sections, sections);
        assert_eq!(cached.notes.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_section_scoped_by_page() {
        let (db, exec) = executor().await;
        exec.execute_group(
            &plan(json!([
                {"type": "create_page", "name": "Work"},
                {"type": "create_section", "name": "Todo"},
                {"type": "create_note", "content": "work item"},
                {"type": "create_page", "name": "Home"},
                {"type": "create_section", "name": "Todo"},
                {"type": "create_note", "content": "home item"}
            ])),
            ExecutionContext::new(),
        )
        .await;

        let outcome = exec
            .execute_group(
                &plan(json!([{"type": "delete_section", "section_name": "todo", "page_name": "Home"}])),
                ExecutionContext::new(),
            )
            .await;
        assert!(outcome.results[0].success);

        let notes = db.list_notes(&NoteWhere::default()).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].content, "work item");
    }

    #[tokio::test]
    async fn test_bulk_actions_scoped_to_section() {
        let (db, exec) = executor().await;
        exec.execute_group(
            &plan(json!([
                {"type": "create_page", "name": "Home"},
                {"type": "create_section", "name": "Todo"},
                {"type": "create_note", "content": "milk", "tags": ["urgent"]},
                {"type": "create_note", "content": "bread", "tags": ["urgent"]},
                {"type": "create_section", "name": "Done"},
                {"type": "create_note", "content": "eggs", "tags": ["urgent"]}
            ])),
            ExecutionContext::new(),
        )
        .await;

        let outcome = exec
            .execute_group(
                &plan(json!([
                    {"type": "bulk_mark_complete", "filter": {"tags": ["urgent"]}, "section_name": "Todo"},
                    {"type": "bulk_move_to_section", "filter": {"completed": true}, "target_section_name": "Done"},
                    {"type": "bulk_remove_tag", "tag": "urgent", "filter": {}, "page_name": "Home"}
                ])),
                ExecutionContext::new(),
            )
            .await;

        let counts: Vec<Option<usize>> = outcome.results.iter().map(|r| r.count).collect();
        assert_eq!(counts, vec![Some(2), Some(2), Some(3)]);

        let notes = db.list_notes(&NoteWhere::default()).unwrap();
        assert!(notes.iter().all(|n| n.tags.is_empty()));
        let done_id = notes.iter().find(|n| n.content == "eggs").unwrap().section_id;
        assert!(notes.iter().all(|n| n.section_id == done_id));
        assert_eq!(exec.cache().notes(), notes);
    }

    #[tokio::test]
    async fn test_delete_notes_by_filter() {
        let (db, exec) = executor().await;
        exec.execute_group(
            &plan(json!([
                {"type": "create_page", "name": "Home"},
                {"type": "create_section", "name": "Todo"},
                {"type": "create_note", "content": "Buy milk"},
                {"type": "create_note", "content": "Call bank", "tags": ["money"]}
            ])),
            ExecutionContext::new(),
        )
        .await;

        let outcome = exec
            .execute_group(
                &plan(json!([{"type": "delete_notes", "filter": {"untagged": true}}])),
                ExecutionContext::new(),
            )
            .await;
        assert_eq!(outcome.results[0].count, Some(1));
        let remaining = db.list_notes(&NoteWhere::default()).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].content, "Call bank");
    }

    #[tokio::test]
    async fn test_preview_count_matches_scoped_delete() {
        let (db, exec) = executor().await;
        exec.execute_group(
            &plan(json!([
                {"type": "create_page", "name": "Home"},
                {"type": "create_section", "name": "Todo"},
                {"type": "create_note", "content": "milk", "tags": ["urgent"]},
                {"type": "create_section", "name": "Later"},
                {"type": "create_note", "content": "paint fence", "tags": ["urgent"]},
                {"type": "create_note", "content": "fix bike", "tags": ["urgent"]}
            ])),
            ExecutionContext::new(),
        )
        .await;

        let delete = plan(json!([
            {"type": "delete_notes", "filter": {"tags": ["urgent"]}, "section_name": "Todo"}
        ]));
        let shown = exec.preview_action(&delete[0]).unwrap().unwrap();
        assert_eq!(shown.count, 1);
        assert_eq!(shown.samples, vec!["milk".to_string()]);

        let outcome = exec.execute_group(&delete, ExecutionContext::new()).await;
        assert_eq!(outcome.results[0].count, Some(shown.count));
        assert_eq!(db.list_notes(&NoteWhere::default()).unwrap().len(), 2);

        let page_scoped = plan(json!([
            {"type": "bulk_mark_complete", "filter": {}, "page_name": "home"}
        ]));
        assert_eq!(exec.preview_action(&page_scoped[0]).unwrap().unwrap().count, 2);
        assert!(exec
            .preview_action(&plan(json!([{"type": "create_page", "name": "X"}]))[0])
            .unwrap()
            .is_none());
    }

    /// Fails every delete issued for one note id
    struct StubbornStore {
        inner: Arc<Database>,
        locked_note: i64,
    }

    #[async_trait]
    impl WorkspaceStore for StubbornStore {
        async fn create_page(&self, page: &NewPage) -> PlanResult<Page> {
            self.inner.as_ref().create_page(page).map_err(Into::into)
        }
        async fn create_section(&self, section: &NewSection) -> PlanResult<Section> {
            self.inner.as_ref().create_section(section).map_err(Into::into)
        }
        async fn create_note(&self, note: &NewNote) -> PlanResult<Note> {
            self.inner.as_ref().create_note(note).map_err(Into::into)
        }
        async fn update_note(&self, id: i64, update: &NoteUpdate) -> PlanResult<()> {
            WorkspaceStore::update_note(self.inner.as_ref(), id, update).await
        }
        async fn delete_notes(&self, filter: &NoteWhere) -> PlanResult<usize> {
            if filter.ids.as_ref().is_some_and(|ids| ids.contains(&self.locked_note)) {
                return Err(PlanError::Persistence("database is locked".into()));
            }
            WorkspaceStore::delete_notes(self.inner.as_ref(), filter).await
        }
        async fn delete_sections(&self, filter: &SectionWhere) -> PlanResult<usize> {
            WorkspaceStore::delete_sections(self.inner.as_ref(), filter).await
        }
        async fn delete_page(&self, id: i64) -> PlanResult<()> {
            WorkspaceStore::delete_page(self.inner.as_ref(), id).await
        }
        async fn list_pages(&self) -> PlanResult<Vec<Page>> {
            WorkspaceStore::list_pages(self.inner.as_ref()).await
        }
        async fn list_sections(&self, filter: &SectionWhere) -> PlanResult<Vec<Section>> {
            WorkspaceStore::list_sections(self.inner.as_ref(), filter).await
        }
        async fn list_notes(&self, filter: &NoteWhere) -> PlanResult<Vec<Note>> {
            WorkspaceStore::list_notes(self.inner.as_ref(), filter).await
        }
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_last_note_pointer() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let cache = Arc::new(WorkspaceCache::new());
        let setup = PlanExecutor::new(db.clone(), cache.clone(), "agent");
        let created = setup
            .execute_group(
                &plan(json!([
                    {"type": "create_page", "name": "Home"},
                    {"type": "create_section", "name": "Todo"},
                    {"type": "create_note", "content": "keep me"}
                ])),
                ExecutionContext::new(),
            )
            .await;
        let note_id = created.results[2].id.unwrap();

        let store = Arc::new(StubbornStore { inner: db.clone(), locked_note: note_id });
        let exec = PlanExecutor::new(store, cache, "agent");
        let outcome = exec
            .execute_group(
                &plan(json!([{"type": "delete_notes", "filter": {}}])),
                created.context,
            )
            .await;

        assert!(!outcome.results[0].success);
        assert_eq!(outcome.results[0].count, Some(0));
        assert_eq!(outcome.context.last_created(EntityKind::Note), Some(note_id));
        assert_eq!(exec.cache().notes().len(), 1);
    }

    #[tokio::test]
    async fn test_run_group_requires_approval() {
        let (_db, exec) = executor().await;
        let mut group = PlanGroup::new(plan(json!([
            {"type": "create_page", "name": "A"},
            {"type": "delete_page", "page_name": "missing"}
        ])));

        assert!(exec.run_group(&mut group).await.is_err());
        assert!(exec.cache().pages().is_empty());

        group.approve().unwrap();
        let (summary, outcome) = exec.run_group(&mut group).await.unwrap();
        assert_eq!(summary, PlanSummary { total: 2, succeeded: 1, failed: 1 });
        assert_eq!(group.status(), PlanGroupStatus::Complete);
        assert_eq!(group.results(), outcome.results.as_slice());
    }

    struct DownIndexer;

    #[async_trait]
    impl NoteIndexer for DownIndexer {
        async fn send(&self, _request: &IndexerRequest, _key: Option<&str>) -> PlanResult<()> {
            Err(PlanError::Network("indexer offline".into()))
        }
    }

    #[tokio::test]
    async fn test_indexing_failure_never_fails_note_creation() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let cache = Arc::new(WorkspaceCache::new());
        let offline = Arc::new(OfflineQueue::new(db.clone()));
        let (indexer, mut failures) =
            BackgroundIndexer::new(Arc::new(DownIndexer), Some(offline.clone()));
        let exec = PlanExecutor::new(db.clone(), cache, "agent").with_indexer(indexer);

        let outcome = exec
            .execute_group(
                &plan(json!([
                    {"type": "create_page", "name": "Inbox"},
                    {"type": "create_section", "name": "Notes"},
                    {"type": "create_note", "content": "Remember this"}
                ])),
                ExecutionContext::new(),
            )
            .await;

        assert!(outcome.results.iter().all(|r| r.success));
        assert_eq!(outcome.index_jobs.len(), 1);
        for job in outcome.index_jobs {
            assert!(!job.wait().await);
        }
        assert!(failures.recv().await.is_some());
        assert_eq!(offline.pending_count().unwrap(), 1);
    }
}
