use thiserror::Error;
use uuid::Uuid;

use super::states::ExecutionState;
use crate::models::EntityKind;

/// Errors raised while evaluating a requested transition
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateMachineError {
    #[error("Guard condition failed: {0}")]
    GuardFailed(#[from] GuardError),

    #[error("Invalid state transition from {from} on {event}")]
    InvalidTransition { from: String, event: String },
}

/// Specific error type for guard condition failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GuardError {
    #[error("{field} must not be empty")]
    EmptyReason { field: &'static str },

    #[error("{pending_count} step records are not terminal")]
    RecordsNotTerminal {
        pending_count: usize,
        pending_record_uuids: Vec<Uuid>,
    },

    #[error("Execution is closed ({status})")]
    ExecutionClosed { status: ExecutionState },
}

/// Specific error type for post-commit action failures
#[derive(Error, Debug)]
pub enum ActionError {
    #[error("Failed to serialize event context: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Specific error type for persistence operations
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Concurrent modification detected for {entity} {entity_uuid}")]
    ConcurrentModification { entity: EntityKind, entity_uuid: Uuid },

    #[error("{entity} {entity_uuid} already exists")]
    Duplicate { entity: EntityKind, entity_uuid: Uuid },

    #[error("{entity} {entity_uuid} does not exist in the store")]
    Missing { entity: EntityKind, entity_uuid: Uuid },

    #[error("Invalid persisted data in {field}: {reason}")]
    InvalidData { field: &'static str, reason: String },

    #[error("Storage unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Database error: {0}")]
    Database(String),
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for PersistenceError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Result type alias for state machine operations
pub type StateMachineResult<T> = Result<T, StateMachineError>;
pub type GuardResult<T> = Result<T, GuardError>;
pub type ActionResult<T> = Result<T, ActionError>;
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Helper function to create invalid transition errors
pub fn invalid_transition(from: impl ToString, event: &str) -> StateMachineError {
    StateMachineError::InvalidTransition {
        from: from.to_string(),
        event: event.to_string(),
    }
}

/// Helper function to create empty reason guard errors
pub fn empty_reason(field: &'static str) -> GuardError {
    GuardError::EmptyReason { field }
}
