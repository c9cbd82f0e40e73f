//! Run-scoped record of what a plan has created so far.
//!
//! Lives for exactly one plan execution; never persisted.

use serde::Serialize;

use crate::models::EntityKind;

/// An entity created earlier in the current run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedEntity {
    pub id: i64,
    /// Page/section name, or note content
    pub name: String,
    /// Owning page for sections, owning section for notes
    pub parent_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionContext {
    pub last_page_id: Option<i64>,
    pub last_section_id: Option<i64>,
    pub last_note_id: Option<i64>,
    pub created_pages: Vec<CreatedEntity>,
    pub created_sections: Vec<CreatedEntity>,
    pub created_notes: Vec<CreatedEntity>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful creation and move the "last created" pointer
    pub fn record_created(&mut self, kind: EntityKind, entity: CreatedEntity) {
        let id = entity.id;
        match kind {
            EntityKind::Page => {
                self.created_pages.push(entity);
                self.last_page_id = Some(id);
            }
            EntityKind::Section => {
                self.created_sections.push(entity);
                self.last_section_id = Some(id);
            }
            EntityKind::Note => {
                self.created_notes.push(entity);
                self.last_note_id = Some(id);
            }
        }
    }

    pub fn created(&self, kind: EntityKind) -> &[CreatedEntity] {
        match kind {
            EntityKind::Page => &self.created_pages,
            EntityKind::Section => &self.created_sections,
            EntityKind::Note => &self.created_notes,
        }
    }

    pub fn last_created(&self, kind: EntityKind) -> Option<i64> {
        match kind {
            EntityKind::Page => self.last_page_id,
            EntityKind::Section => self.last_section_id,
            EntityKind::Note => self.last_note_id,
        }
    }

    /// Drop pointers to entities that no longer exist (after a delete)
    pub fn forget(&mut self, kind: EntityKind, ids: &[i64]) {
        let pointer = match kind {
            EntityKind::Page => &mut self.last_page_id,
            EntityKind::Section => &mut self.last_section_id,
            EntityKind::Note => &mut self.last_note_id,
        };
        if pointer.is_some_and(|id| ids.contains(&id)) {
            *pointer = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_forget() {
        let mut ctx = ExecutionContext::new();
        ctx.record_created(
            EntityKind::Section,
            CreatedEntity { id: 3, name: "Checklist".into(), parent_id: Some(1) },
        );
        assert_eq!(ctx.last_created(EntityKind::Section), Some(3));
        assert_eq!(ctx.created(EntityKind::Section).len(), 1);
        assert_eq!(ctx.last_created(EntityKind::Page), None);

        ctx.forget(EntityKind::Section, &[3]);
        assert_eq!(ctx.last_created(EntityKind::Section), None);
        // The created list is append-only
        assert_eq!(ctx.created_sections.len(), 1);
    }
}
