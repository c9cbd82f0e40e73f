//! Error taxonomy shared by the plan executor, bulk engine and offline queue.

use thiserror::Error;

use crate::models::EntityKind;

/// Errors raised while executing plan actions and their side effects
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("{kind} not found: \"{name}\"")]
    ReferenceNotFound { kind: EntityKind, name: String },

    #[error("No {kind} specified and none was created earlier in this plan")]
    MissingReference { kind: EntityKind },

    #[error("Invalid action: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Persistence(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl From<rusqlite::Error> for PlanError {
    fn from(e: rusqlite::Error) -> Self {
        PlanError::Persistence(e.to_string())
    }
}

impl From<serde_json::Error> for PlanError {
    fn from(e: serde_json::Error) -> Self {
        PlanError::Persistence(format!("serialization: {}", e))
    }
}

impl From<reqwest::Error> for PlanError {
    fn from(e: reqwest::Error) -> Self {
        PlanError::Network(e.to_string())
    }
}

pub type PlanResult<T> = Result<T, PlanError>;
