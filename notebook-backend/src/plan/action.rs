//! Plan actions as emitted by the reasoning service.
//!
//! Wire form: `{"type": "create_note", "content": "Ship v2", "section_name": "Checklist"}`.
//! References are optional `*_id` / `*_name` pairs; when both are absent the
//! executor falls back to the entity created last in the same plan.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use crate::bulk::NoteFilter;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlanAction {
    CreatePage {
        name: String,
        #[serde(default)]
        starred: bool,
    },
    CreateSection {
        name: String,
        page_id: Option<i64>,
        page_name: Option<String>,
    },
    CreateNote {
        content: String,
        section_id: Option<i64>,
        section_name: Option<String>,
        page_name: Option<String>,
        #[serde(default)]
        tags: Vec<String>,
        date: Option<NaiveDate>,
    },
    DeletePage {
        page_id: Option<i64>,
        page_name: Option<String>,
    },
    DeleteSection {
        section_id: Option<i64>,
        section_name: Option<String>,
        page_name: Option<String>,
    },
    DeleteNotes {
        #[serde(default)]
        filter: NoteFilter,
        page_name: Option<String>,
        section_name: Option<String>,
    },
    BulkAddTag {
        #[serde(default)]
        filter: NoteFilter,
        tag: Option<String>,
        page_name: Option<String>,
        section_name: Option<String>,
    },
    BulkRemoveTag {
        #[serde(default)]
        filter: NoteFilter,
        tag: Option<String>,
        page_name: Option<String>,
        section_name: Option<String>,
    },
    BulkMoveToSection {
        #[serde(default)]
        filter: NoteFilter,
        page_name: Option<String>,
        section_name: Option<String>,
        target_section_id: Option<i64>,
        target_section_name: Option<String>,
        target_page_name: Option<String>,
    },
    BulkMarkComplete {
        #[serde(default)]
        filter: NoteFilter,
        page_name: Option<String>,
        section_name: Option<String>,
    },
    BulkMarkIncomplete {
        #[serde(default)]
        filter: NoteFilter,
        page_name: Option<String>,
        section_name: Option<String>,
    },
    AddTagToNote {
        note_id: Option<i64>,
        /// Content of the note to tag, matched case-insensitively
        note_content: Option<String>,
        tag: Option<String>,
    },
}

/// Discriminant of a `PlanAction`, reported in results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActionKind {
    CreatePage,
    CreateSection,
    CreateNote,
    DeletePage,
    DeleteSection,
    DeleteNotes,
    BulkAddTag,
    BulkRemoveTag,
    BulkMoveToSection,
    BulkMarkComplete,
    BulkMarkIncomplete,
    AddTagToNote,
}

impl ActionKind {
    /// Destructive kinds are expected to have been confirmed before execution
    pub fn is_destructive(&self) -> bool {
        !matches!(
            self,
            ActionKind::CreatePage
                | ActionKind::CreateSection
                | ActionKind::CreateNote
                | ActionKind::AddTagToNote
        )
    }
}

impl PlanAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            PlanAction::CreatePage { .. } => ActionKind::CreatePage,
            PlanAction::CreateSection { .. } => ActionKind::CreateSection,
            PlanAction::CreateNote { .. } => ActionKind::CreateNote,
            PlanAction::DeletePage { .. } => ActionKind::DeletePage,
            PlanAction::DeleteSection { .. } => ActionKind::DeleteSection,
            PlanAction::DeleteNotes { .. } => ActionKind::DeleteNotes,
            PlanAction::BulkAddTag { .. } => ActionKind::BulkAddTag,
            PlanAction::BulkRemoveTag { .. } => ActionKind::BulkRemoveTag,
            PlanAction::BulkMoveToSection { .. } => ActionKind::BulkMoveToSection,
            PlanAction::BulkMarkComplete { .. } => ActionKind::BulkMarkComplete,
            PlanAction::BulkMarkIncomplete { .. } => ActionKind::BulkMarkIncomplete,
            PlanAction::AddTagToNote { .. } => ActionKind::AddTagToNote,
        }
    }

    /// Human readable label used in results and logs
    pub fn display_name(&self) -> String {
        match self {
            PlanAction::CreatePage { name, .. } => format!("Create page \"{}\"", name),
            PlanAction::CreateSection { name, .. } => format!("Create section \"{}\"", name),
            PlanAction::CreateNote { content, .. } => {
                format!("Create note \"{}\"", truncate(content, 40))
            }
            PlanAction::DeletePage { page_id, page_name } => {
                format!("Delete page {}", describe_ref(*page_id, page_name.as_deref()))
            }
            PlanAction::DeleteSection {
                section_id,
                section_name,
                ..
            } => format!(
                "Delete section {}",
                describe_ref(*section_id, section_name.as_deref())
            ),
            PlanAction::DeleteNotes { .. } => "Delete matching notes".to_string(),
            PlanAction::BulkAddTag { tag, .. } => {
                format!("Add tag #{} to matching notes", tag.as_deref().unwrap_or("?"))
            }
            PlanAction::BulkRemoveTag { tag, .. } => format!(
                "Remove tag #{} from matching notes",
                tag.as_deref().unwrap_or("?")
            ),
            PlanAction::BulkMoveToSection {
                target_section_id,
                target_section_name,
                ..
            } => format!(
                "Move matching notes to {}",
                describe_ref(*target_section_id, target_section_name.as_deref())
            ),
            PlanAction::BulkMarkComplete { .. } => "Mark matching notes complete".to_string(),
            PlanAction::BulkMarkIncomplete { .. } => "Mark matching notes incomplete".to_string(),
            PlanAction::AddTagToNote { tag, .. } => {
                format!("Add tag #{} to note", tag.as_deref().unwrap_or("?"))
            }
        }
    }

    /// Note filter and page/section scope carried by bulk variants
    pub fn bulk_scope(&self) -> Option<(&NoteFilter, Option<&str>, Option<&str>)> {
        match self {
            PlanAction::DeleteNotes { filter, page_name, section_name }
            | PlanAction::BulkAddTag { filter, page_name, section_name, .. }
            | PlanAction::BulkRemoveTag { filter, page_name, section_name, .. }
            | PlanAction::BulkMoveToSection { filter, page_name, section_name, .. }
            | PlanAction::BulkMarkComplete { filter, page_name, section_name }
            | PlanAction::BulkMarkIncomplete { filter, page_name, section_name } => {
                Some((filter, page_name.as_deref(), section_name.as_deref()))
            }
            _ => None,
        }
    }
}

fn describe_ref(id: Option<i64>, name: Option<&str>) -> String {
    match (name, id) {
        (Some(name), _) => format!("\"{}\"", name),
        (None, Some(id)) => format!("#{}", id),
        (None, None) => "(last created)".to_string(),
    }
}

pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}
