//! Persistence interface consumed by the plan executor.
//!
//! Mirrors the relational shape pages(1)-(N)sections(1)-(N)notes. The SQLite
//! `Database` is the production implementation.

use async_trait::async_trait;

use crate::error::{PlanError, PlanResult};
use crate::models::{NewNote, NewPage, NewSection, Note, NoteUpdate, Page, Section};
use super::Database;

/// Row filter for notes. Unset fields don't constrain; an empty list matches nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteWhere {
    pub ids: Option<Vec<i64>>,
    pub section_ids: Option<Vec<i64>>,
}

impl NoteWhere {
    pub fn for_ids(ids: Vec<i64>) -> Self {
        Self {
            ids: Some(ids),
            ..Default::default()
        }
    }

    pub fn for_sections(section_ids: Vec<i64>) -> Self {
        Self {
            section_ids: Some(section_ids),
            ..Default::default()
        }
    }
}

/// Row filter for sections
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionWhere {
    pub ids: Option<Vec<i64>>,
    pub page_ids: Option<Vec<i64>>,
}

impl SectionWhere {
    pub fn for_ids(ids: Vec<i64>) -> Self {
        Self {
            ids: Some(ids),
            ..Default::default()
        }
    }

    pub fn for_pages(page_ids: Vec<i64>) -> Self {
        Self {
            page_ids: Some(page_ids),
            ..Default::default()
        }
    }
}

#[async_trait]
pub trait WorkspaceStore: Send + Sync {
    async fn create_page(&self, page: &NewPage) -> PlanResult<Page>;
    async fn create_section(&self, section: &NewSection) -> PlanResult<Section>;
    async fn create_note(&self, note: &NewNote) -> PlanResult<Note>;

    /// Fails with `Persistence` when the note does not exist
    async fn update_note(&self, id: i64, update: &NoteUpdate) -> PlanResult<()>;

    async fn delete_notes(&self, filter: &NoteWhere) -> PlanResult<usize>;
    async fn delete_sections(&self, filter: &SectionWhere) -> PlanResult<usize>;
    async fn delete_page(&self, id: i64) -> PlanResult<()>;

    async fn list_pages(&self) -> PlanResult<Vec<Page>>;
    async fn list_sections(&self, filter: &SectionWhere) -> PlanResult<Vec<Section>>;
    async fn list_notes(&self, filter: &NoteWhere) -> PlanResult<Vec<Note>>;
}

#[async_trait]
impl WorkspaceStore for Database {
    async fn create_page(&self, page: &NewPage) -> PlanResult<Page> {
        Ok(Database::create_page(self, page)?)
    }

    async fn create_section(&self, section: &NewSection) -> PlanResult<Section> {
        Ok(Database::create_section(self, section)?)
    }

    async fn create_note(&self, note: &NewNote) -> PlanResult<Note> {
        Ok(Database::create_note(self, note)?)
    }

    async fn update_note(&self, id: i64, update: &NoteUpdate) -> PlanResult<()> {
        if Database::update_note(self, id, update)? {
            Ok(())
        } else {
            Err(PlanError::Persistence(format!("note {} does not exist", id)))
        }
    }

    async fn delete_notes(&self, filter: &NoteWhere) -> PlanResult<usize> {
        Ok(Database::delete_notes(self, filter)?)
    }

    async fn delete_sections(&self, filter: &SectionWhere) -> PlanResult<usize> {
        Ok(Database::delete_sections(self, filter)?)
    }

    async fn delete_page(&self, id: i64) -> PlanResult<()> {
        if Database::delete_page(self, id)? {
            Ok(())
        } else {
            Err(PlanError::Persistence(format!("page {} does not exist", id)))
        }
    }

    async fn list_pages(&self) -> PlanResult<Vec<Page>> {
        Ok(Database::list_pages(self)?)
    }

    async fn list_sections(&self, filter: &SectionWhere) -> PlanResult<Vec<Section>> {
        Ok(Database::list_sections(self, filter)?)
    }

    async fn list_notes(&self, filter: &NoteWhere) -> PlanResult<Vec<Note>> {
        Ok(Database::list_notes(self, filter)?)
    }
}
