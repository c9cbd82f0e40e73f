use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Note - a single entry inside a section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub section_id: i64,
    pub content: String,
    pub completed: bool,
    pub completed_by: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub date: Option<NaiveDate>,
    /// Lower-cased, deduplicated tags
    pub tags: BTreeSet<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating a note
#[derive(Debug, Clone)]
pub struct NewNote {
    pub section_id: i64,
    pub content: String,
    pub date: Option<NaiveDate>,
    pub tags: BTreeSet<String>,
    pub created_by: Option<String>,
}

/// Partial update of a note. `None` leaves a field untouched.
///
/// The same value is written to the database and applied to the cached
/// copy, so both sides stay in step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteUpdate {
    pub section_id: Option<i64>,
    pub completed: Option<bool>,
    pub completed_by: Option<Option<String>>,
    pub completed_at: Option<Option<DateTime<Utc>>>,
    pub tags: Option<BTreeSet<String>>,
}

impl NoteUpdate {
    pub fn is_empty(&self) -> bool {
        *self == NoteUpdate::default()
    }

    pub fn apply(&self, note: &mut Note) {
        if let Some(section_id) = self.section_id {
            note.section_id = section_id;
        }
        if let Some(completed) = self.completed {
            note.completed = completed;
        }
        if let Some(ref completed_by) = self.completed_by {
            note.completed_by = completed_by.clone();
        }
        if let Some(completed_at) = self.completed_at {
            note.completed_at = completed_at;
        }
        if let Some(ref tags) = self.tags {
            note.tags = tags.clone();
        }
    }
}

/// Normalize a tag: trim, strip a leading `#`, lower-case. Blank tags are dropped.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim().trim_start_matches('#').trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

pub fn normalize_tags<I, S>(tags: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .filter_map(|t| normalize_tag(t.as_ref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_tags_dedupes_case_insensitively() {
        let tags = normalize_tags(["Urgent", "#urgent", " URGENT ", "", "#"]);
        assert_eq!(tags.len(), 1);
        assert!(tags.contains("urgent"));
    }

    #[test]
    fn test_update_apply_leaves_unset_fields() {
        let mut note = Note {
            id: 1,
            section_id: 2,
            content: "Ship v2".to_string(),
            completed: false,
            completed_by: None,
            completed_at: None,
            date: None,
            tags: normalize_tags(["launch"]),
            created_by: None,
            created_at: Utc::now(),
        };

        NoteUpdate {
            completed: Some(true),
            completed_by: Some(Some("sam".to_string())),
            ..Default::default()
        }
        .apply(&mut note);

        assert!(note.completed);
        assert_eq!(note.completed_by.as_deref(), Some("sam"));
        assert_eq!(note.section_id, 2);
        assert!(note.tags.contains("launch"));
    }
}
