//! Plan groups: a reviewed batch of actions and its one-way lifecycle.
//!
//! reviewing -> executing -> complete. Approval is the confirmation step for
//! destructive actions; nothing moves a group backwards.

use serde::Serialize;
use strum::Display;

use crate::error::{PlanError, PlanResult};
use super::action::{ActionKind, PlanAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PlanGroupStatus {
    Reviewing,
    Executing,
    Complete,
}

/// Outcome of one plan action
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResult {
    pub action: ActionKind,
    pub display_name: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl ActionResult {
    pub fn success(action: &PlanAction, id: Option<i64>, count: Option<usize>) -> Self {
        Self {
            action: action.kind(),
            display_name: action.display_name(),
            success: true,
            id,
            error: None,
            count,
        }
    }

    pub fn failure(action: &PlanAction, error: impl Into<String>) -> Self {
        Self {
            action: action.kind(),
            display_name: action.display_name(),
            success: false,
            id: None,
            error: Some(error.into()),
            count: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl PlanSummary {
    pub fn from_results(results: &[ActionResult]) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanGroup {
    pub id: String,
    pub actions: Vec<PlanAction>,
    status: PlanGroupStatus,
    results: Vec<ActionResult>,
    summary: Option<PlanSummary>,
}

impl PlanGroup {
    pub fn new(actions: Vec<PlanAction>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            actions,
            status: PlanGroupStatus::Reviewing,
            results: Vec::new(),
            summary: None,
        }
    }

    pub fn status(&self) -> PlanGroupStatus {
        self.status
    }

    pub fn results(&self) -> &[ActionResult] {
        &self.results
    }

    pub fn summary(&self) -> Option<PlanSummary> {
        self.summary
    }

    pub fn has_destructive_actions(&self) -> bool {
        self.actions.iter().any(|a| a.kind().is_destructive())
    }

    /// Human approval: reviewing -> executing
    pub fn approve(&mut self) -> PlanResult<()> {
        self.transition(PlanGroupStatus::Reviewing, PlanGroupStatus::Executing)
    }

    /// executing -> complete, aggregating the per-action results
    pub fn complete(&mut self, results: Vec<ActionResult>) -> PlanResult<PlanSummary> {
        self.transition(PlanGroupStatus::Executing, PlanGroupStatus::Complete)?;
        let summary = PlanSummary::from_results(&results);
        self.results = results;
        self.summary = Some(summary);
        Ok(summary)
    }

    fn transition(&mut self, from: PlanGroupStatus, to: PlanGroupStatus) -> PlanResult<()> {
        if self.status != from {
            return Err(PlanError::Validation(format!(
                "plan group {} is {}, expected {}",
                self.id, self.status, from
            )));
        }
        self.status = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(name: &str) -> PlanAction {
        PlanAction::CreatePage { name: name.into(), starred: false }
    }

    #[test]
    fn test_lifecycle_is_one_way() {
        let mut group = PlanGroup::new(vec![page("A"), page("B")]);
        assert_eq!(group.status(), PlanGroupStatus::Reviewing);

        // Cannot complete before approval
        assert!(group.complete(vec![]).is_err());

        group.approve().unwrap();
        assert!(group.approve().is_err());

        let results = vec![
            ActionResult::success(&group.actions[0], Some(1), None),
            ActionResult::failure(&group.actions[1], "boom"),
        ];
        let summary = group.complete(results).unwrap();
        assert_eq!(summary, PlanSummary { total: 2, succeeded: 1, failed: 1 });
        assert_eq!(group.status(), PlanGroupStatus::Complete);
        assert!(group.approve().is_err());
        assert!(group.complete(vec![]).is_err());
    }

    #[test]
    fn test_destructive_detection() {
        let group = PlanGroup::new(vec![
            page("A"),
            PlanAction::DeletePage { page_id: Some(1), page_name: None },
        ]);
        assert!(group.has_destructive_actions());
        assert!(!PlanGroup::new(vec![page("A")]).has_destructive_actions());
    }
}
