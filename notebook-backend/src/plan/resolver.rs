//! Reference resolution: id > persisted name > created-this-run name > last created.

use crate::db::WorkspaceSnapshot;
use crate::error::{PlanError, PlanResult};
use crate::models::EntityKind;
use super::context::ExecutionContext;

/// A human-readable reference to an entity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityRef<'a> {
    pub id: Option<i64>,
    pub name: Option<&'a str>,
    /// Parent to scope a name match to (page for sections, section for notes)
    pub scope: Option<i64>,
}

impl<'a> EntityRef<'a> {
    pub fn new(id: Option<i64>, name: Option<&'a str>) -> Self {
        Self {
            id,
            // Blank names count as absent
            name: name.map(str::trim).filter(|n| !n.is_empty()),
            scope: None,
        }
    }

    pub fn scoped(mut self, scope: Option<i64>) -> Self {
        self.scope = scope;
        self
    }
}

/// Resolves references against an immutable snapshot plus the run context
pub struct Resolver<'s> {
    snapshot: &'s WorkspaceSnapshot,
}

impl<'s> Resolver<'s> {
    pub fn new(snapshot: &'s WorkspaceSnapshot) -> Self {
        Self { snapshot }
    }

    pub fn resolve(
        &self,
        kind: EntityKind,
        reference: &EntityRef<'_>,
        context: &ExecutionContext,
    ) -> PlanResult<i64> {
        // Ids are trusted as given; a stale id surfaces as a storage error
        if let Some(id) = reference.id {
            return Ok(id);
        }

        let Some(name) = reference.name else {
            return context
                .last_created(kind)
                .ok_or(PlanError::MissingReference { kind });
        };

        if let Some(id) = self.find_persisted(kind, name, reference.scope) {
            return Ok(id);
        }

        let needle = name.to_lowercase();
        context
            .created(kind)
            .iter()
            .filter(|e| reference.scope.is_none() || e.parent_id == reference.scope)
            .find(|e| e.name.trim().to_lowercase() == needle)
            .map(|e| e.id)
            .ok_or_else(|| PlanError::ReferenceNotFound {
                kind,
                name: name.to_string(),
            })
    }

    fn find_persisted(&self, kind: EntityKind, name: &str, scope: Option<i64>) -> Option<i64> {
        let needle = name.to_lowercase();
        match kind {
            EntityKind::Page => self
                .snapshot
                .pages
                .iter()
                .find(|p| p.name.to_lowercase() == needle)
                .map(|p| p.id),
            EntityKind::Section => self
                .snapshot
                .sections
                .iter()
                .filter(|s| scope.is_none_or(|page_id| s.page_id == page_id))
                .find(|s| s.name.to_lowercase() == needle)
                .map(|s| s.id),
            EntityKind::Note => self
                .snapshot
                .notes
                .iter()
                .filter(|n| scope.is_none_or(|section_id| n.section_id == section_id))
                .find(|n| n.content.trim().to_lowercase() == needle)
                .map(|n| n.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Page, Section};
    use crate::plan::context::CreatedEntity;

    fn snapshot() -> WorkspaceSnapshot {
        WorkspaceSnapshot {
            pages: vec![
                Page { id: 1, name: "Launch".into(), starred: false, position: 0 },
                Page { id: 2, name: "Backlog".into(), starred: false, position: 1 },
            ],
            sections: vec![
                Section { id: 10, name: "Todo".into(), page_id: 1, position: 0 },
                Section { id: 20, name: "Todo".into(), page_id: 2, position: 0 },
            ],
            notes: vec![],
        }
    }

    #[test]
    fn test_id_wins_over_name() {
        let snap = snapshot();
        let resolver = Resolver::new(&snap);
        let ctx = ExecutionContext::new();
        let id = resolver
            .resolve(EntityKind::Page, &EntityRef::new(Some(99), Some("Launch")), &ctx)
            .unwrap();
        assert_eq!(id, 99);
    }

    #[test]
    fn test_name_match_is_case_insensitive_and_scoped() {
        let snap = snapshot();
        let resolver = Resolver::new(&snap);
        let ctx = ExecutionContext::new();

        let page = resolver
            .resolve(EntityKind::Page, &EntityRef::new(None, Some("lAUNCH")), &ctx)
            .unwrap();
        assert_eq!(page, 1);

        let section = resolver
            .resolve(
                EntityKind::Section,
                &EntityRef::new(None, Some("todo")).scoped(Some(2)),
                &ctx,
            )
            .unwrap();
        assert_eq!(section, 20);
    }

    #[test]
    fn test_falls_back_to_created_this_run() {
        let snap = snapshot();
        let resolver = Resolver::new(&snap);
        let mut ctx = ExecutionContext::new();
        ctx.record_created(
            EntityKind::Page,
            CreatedEntity { id: 7, name: "Roadmap".into(), parent_id: None },
        );

        let id = resolver
            .resolve(EntityKind::Page, &EntityRef::new(None, Some("roadmap")), &ctx)
            .unwrap();
        assert_eq!(id, 7);
    }

    #[test]
    fn test_implicit_continuation_and_failures() {
        let snap = snapshot();
        let resolver = Resolver::new(&snap);
        let mut ctx = ExecutionContext::new();

        let err = resolver
            .resolve(EntityKind::Section, &EntityRef::new(None, None), &ctx)
            .unwrap_err();
        assert!(matches!(err, PlanError::MissingReference { kind: EntityKind::Section }));

        ctx.record_created(
            EntityKind::Section,
            CreatedEntity { id: 30, name: "Ideas".into(), parent_id: Some(1) },
        );
        let id = resolver
            .resolve(EntityKind::Section, &EntityRef::new(None, Some("  ")), &ctx)
            .unwrap();
        assert_eq!(id, 30);

        // A name that matches nothing never falls back to the last created entity
        let err = resolver
            .resolve(EntityKind::Section, &EntityRef::new(None, Some("Nope")), &ctx)
            .unwrap_err();
        assert!(matches!(err, PlanError::ReferenceNotFound { .. }));
    }
}
