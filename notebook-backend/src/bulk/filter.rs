//! Declarative note filter. Pure: no I/O, no mutation.
//!
//! Keys combine with AND; inside `tags` any listed tag matches.

use serde::{Deserialize, Serialize};

use crate::models::{normalize_tag, Note};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NoteFilter {
    /// Match notes carrying any of these tags
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// `true`: only completed notes, `false`: only open notes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    /// `true`: only open notes, `false`: only completed notes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incomplete: Option<bool>,
    /// `true`: only notes without tags
    #[serde(skip_serializing_if = "Option::is_none")]
    pub untagged: Option<bool>,
    /// Match notes whose content contains any of these substrings (case-insensitive)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_contains: Option<Vec<String>>,
    /// Restrict to one section
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_id: Option<i64>,
}

impl NoteFilter {
    pub fn matches(&self, note: &Note) -> bool {
        if let Some(section_id) = self.section_id {
            if note.section_id != section_id {
                return false;
            }
        }

        if let Some(ref tags) = self.tags {
            let wanted: Vec<String> = tags.iter().filter_map(|t| normalize_tag(t)).collect();
            if !wanted.is_empty() && !wanted.iter().any(|t| note.tags.contains(t)) {
                return false;
            }
        }

        if let Some(completed) = self.completed {
            if note.completed != completed {
                return false;
            }
        }
        if let Some(incomplete) = self.incomplete {
            if note.completed == incomplete {
                return false;
            }
        }

        if self.untagged == Some(true) && !note.tags.is_empty() {
            return false;
        }

        if let Some(ref needles) = self.content_contains {
            let needles: Vec<String> = needles
                .iter()
                .map(|n| n.to_lowercase())
                .filter(|n| !n.is_empty())
                .collect();
            if !needles.is_empty() {
                let haystack = note.content.to_lowercase();
                if !needles.iter().any(|n| haystack.contains(n.as_str())) {
                    return false;
                }
            }
        }

        true
    }
}

/// Select the notes matching `filter`, preserving input order
pub fn filter_notes<'a>(notes: &'a [Note], filter: &NoteFilter) -> Vec<&'a Note> {
    notes.iter().filter(|n| filter.matches(n)).collect()
}
