//! Bulk operations: `filter_notes` composed with one uniform mutation.
//!
//! The preview and the mutation select targets with the same filter call, so
//! the count shown before confirming is the count that gets changed.

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;

use crate::db::{NoteWhere, WorkspaceCache, WorkspaceStore};
use crate::error::{PlanError, PlanResult};
use crate::models::{normalize_tag, Note, NoteUpdate};
use crate::plan::action::truncate;
use super::filter::{filter_notes, NoteFilter};

const PREVIEW_SAMPLES: usize = 3;
const PREVIEW_CHARS: usize = 60;

#[derive(Debug, Clone, PartialEq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum BulkOperation {
    MarkComplete,
    MarkIncomplete,
    Delete,
    AddTag(String),
    RemoveTag(String),
    MoveToSection(i64),
}

impl BulkOperation {
    pub fn add_tag(tag: Option<&str>) -> PlanResult<Self> {
        Ok(BulkOperation::AddTag(required_tag(tag, "add_tag")?))
    }

    pub fn remove_tag(tag: Option<&str>) -> PlanResult<Self> {
        Ok(BulkOperation::RemoveTag(required_tag(tag, "remove_tag")?))
    }
}

fn required_tag(tag: Option<&str>, op: &str) -> PlanResult<String> {
    tag.and_then(normalize_tag)
        .ok_or_else(|| PlanError::Validation(format!("{} requires a tag", op)))
}

/// What a bulk operation does to one note
#[derive(Debug, Clone, PartialEq)]
pub enum NoteChange {
    Update(NoteUpdate),
    Delete,
}

/// Outcome of a bulk call. `total` is the number of matched notes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BulkOutcome {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

/// What a user sees before confirming a bulk action
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkPreview {
    pub count: usize,
    pub samples: Vec<String>,
}

pub fn preview(notes: &[Note], filter: &NoteFilter) -> BulkPreview {
    let matched = filter_notes(notes, filter);
    BulkPreview {
        count: matched.len(),
        samples: matched
            .iter()
            .take(PREVIEW_SAMPLES)
            .map(|n| truncate(&n.content, PREVIEW_CHARS))
            .collect(),
    }
}

/// Pure: the change `op` makes to `note`. Set semantics for tags, so adding a
/// present tag or removing an absent one yields an empty update.
pub fn plan_change(
    op: &BulkOperation,
    note: &Note,
    actor: &str,
    now: DateTime<Utc>,
) -> NoteChange {
    let update = match op {
        BulkOperation::Delete => return NoteChange::Delete,
        BulkOperation::MarkComplete => NoteUpdate {
            completed: Some(true),
            completed_by: Some(Some(actor.to_string())),
            completed_at: Some(Some(now)),
            ..Default::default()
        },
        BulkOperation::MarkIncomplete => NoteUpdate {
            completed: Some(false),
            completed_by: Some(None),
            completed_at: Some(None),
            ..Default::default()
        },
        BulkOperation::AddTag(tag) => {
            if note.tags.contains(tag) {
                NoteUpdate::default()
            } else {
                let mut tags = note.tags.clone();
                tags.insert(tag.clone());
                NoteUpdate { tags: Some(tags), ..Default::default() }
            }
        }
        BulkOperation::RemoveTag(tag) => {
            if note.tags.contains(tag) {
                let mut tags = note.tags.clone();
                tags.remove(tag);
                NoteUpdate { tags: Some(tags), ..Default::default() }
            } else {
                NoteUpdate::default()
            }
        }
        BulkOperation::MoveToSection(section_id) => {
            if note.section_id == *section_id {
                NoteUpdate::default()
            } else {
                NoteUpdate { section_id: Some(*section_id), ..Default::default() }
            }
        }
    };
    NoteChange::Update(update)
}

/// Apply `op` to every note in `notes` matching `filter`.
///
/// Each note is persisted on its own; a failure is counted and the rest carry
/// on. The cache only sees changes that were persisted.
pub async fn execute_bulk_operation(
    store: &dyn WorkspaceStore,
    cache: &WorkspaceCache,
    notes: &[Note],
    filter: &NoteFilter,
    op: &BulkOperation,
    actor: &str,
) -> BulkOutcome {
    let targets = filter_notes(notes, filter);
    let now = Utc::now();
    let mut outcome = BulkOutcome {
        total: targets.len(),
        ..Default::default()
    };

    for note in targets {
        let change = plan_change(op, note, actor, now);
        let result = match &change {
            NoteChange::Update(update) if update.is_empty() => Ok(()),
            NoteChange::Update(update) => store.update_note(note.id, update).await,
            NoteChange::Delete => store
                .delete_notes(&NoteWhere::for_ids(vec![note.id]))
                .await
                .and_then(|count| {
                    if count == 0 {
                        Err(PlanError::Persistence(format!("note {} does not exist", note.id)))
                    } else {
                        Ok(())
                    }
                }),
        };

        match result {
            Ok(()) => {
                outcome.succeeded += 1;
                let id = note.id;
                match change {
                    NoteChange::Update(update) if !update.is_empty() => {
                        cache.update_notes(|cached| {
                            if let Some(n) = cached.iter_mut().find(|n| n.id == id) {
                                update.apply(n);
                            }
                        });
                    }
                    NoteChange::Update(_) => {}
                    NoteChange::Delete => cache.update_notes(|cached| cached.retain(|n| n.id != id)),
                }
            }
            Err(e) => {
                log::warn!("[BULK] {} failed for note {}: {}", op, note.id, e);
                outcome.failed += 1;
                outcome.errors.push(format!("note {}: {}", note.id, e));
            }
        }
    }

    log::info!(
        "[BULK] {}: {} matched, {} succeeded, {} failed",
        op,
        outcome.total,
        outcome.succeeded,
        outcome.failed
    );
    outcome
}
