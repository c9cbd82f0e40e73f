//! In-memory mirror of the workspace.
//!
//! The executor applies a functional update here after every successful
//! persistence call, so readers see the change without a full reload. Pages
//! are held with their sections; notes are a flat collection.

use parking_lot::RwLock;
use serde::Serialize;

use crate::error::PlanResult;
use crate::models::{CachedPage, Note, Page, Section};
use super::store::{NoteWhere, SectionWhere, WorkspaceStore};

/// Immutable copy of the cache taken before resolving references
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkspaceSnapshot {
    pub pages: Vec<Page>,
    pub sections: Vec<Section>,
    pub notes: Vec<Note>,
}

#[derive(Default)]
pub struct WorkspaceCache {
    pages: RwLock<Vec<CachedPage>>,
    notes: RwLock<Vec<Note>>,
}

impl WorkspaceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole cache with what the store currently holds
    pub async fn reload(&self, store: &dyn WorkspaceStore) -> PlanResult<()> {
        let pages = store.list_pages().await?;
        let sections = store.list_sections(&SectionWhere::default()).await?;
        let notes = store.list_notes(&NoteWhere::default()).await?;

        let mut tree: Vec<CachedPage> = pages.into_iter().map(CachedPage::new).collect();
        for section in sections {
            if let Some(entry) = tree.iter_mut().find(|p| p.page.id == section.page_id) {
                entry.sections.push(section);
            }
        }

        log::debug!(
            "[CACHE] Loaded {} pages, {} notes",
            tree.len(),
            notes.len()
        );

        *self.pages.write() = tree;
        *self.notes.write() = notes;
        Ok(())
    }

    /// Mutate the page collection in place
    pub fn update_pages<F: FnOnce(&mut Vec<CachedPage>)>(&self, f: F) {
        f(&mut self.pages.write());
    }

    /// Mutate the note collection in place
    pub fn update_notes<F: FnOnce(&mut Vec<Note>)>(&self, f: F) {
        f(&mut self.notes.write());
    }

    pub fn pages(&self) -> Vec<CachedPage> {
        self.pages.read().clone()
    }

    pub fn notes(&self) -> Vec<Note> {
        self.notes.read().clone()
    }

    pub fn snapshot(&self) -> WorkspaceSnapshot {
        let pages = self.pages.read();
        WorkspaceSnapshot {
            pages: pages.iter().map(|p| p.page.clone()).collect(),
            sections: pages.iter().flat_map(|p| p.sections.iter().cloned()).collect(),
            notes: self.notes.read().clone(),
        }
    }
}
