pub mod note;
pub mod page;
pub mod section;

pub use note::{normalize_tag, normalize_tags, NewNote, Note, NoteUpdate};
pub use page::{CachedPage, NewPage, Page};
pub use section::{NewSection, Section};

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// Kind of workspace entity a plan action can reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
    Page,
    Section,
    Note,
}
