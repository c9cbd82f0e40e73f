use serde::{Deserialize, Serialize};

/// Section - ordered group of notes inside a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: i64,
    pub name: String,
    pub page_id: i64,
    pub position: i64,
}

/// Fields for creating a section
#[derive(Debug, Clone)]
pub struct NewSection {
    pub name: String,
    pub page_id: i64,
}
