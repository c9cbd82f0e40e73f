use serde::{Deserialize, Serialize};

use super::Section;

/// Page - top level container of sections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: i64,
    pub name: String,
    pub starred: bool,
    pub position: i64,
}

/// Fields for creating a page
#[derive(Debug, Clone, Default)]
pub struct NewPage {
    pub name: String,
    pub starred: bool,
}

/// A page together with its ordered sections, as held by the workspace cache
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CachedPage {
    pub page: Page,
    pub sections: Vec<Section>,
}

impl CachedPage {
    pub fn new(page: Page) -> Self {
        Self {
            page,
            sections: Vec::new(),
        }
    }
}
