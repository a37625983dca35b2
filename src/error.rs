use thiserror::Error;
use uuid::Uuid;

use crate::config::ConfigurationError;
use crate::models::EntityKind;
use crate::state_machine::errors::{GuardError, PersistenceError, StateMachineError};
use crate::state_machine::ExecutionState;

/// Errors returned by every tracker operation
///
/// All variants except `Persistence` are recoverable from the caller's point of
/// view: the targeted entity is left exactly as it was before the call.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("{entity} {uuid} not found")]
    NotFound { entity: EntityKind, uuid: Uuid },

    #[error("Invalid transition for {entity} {uuid}: cannot {event} from {from}")]
    InvalidTransition {
        entity: EntityKind,
        uuid: Uuid,
        from: String,
        event: String,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Execution {execution_uuid} cannot complete: {pending_count} step records are not terminal")]
    Precompletion {
        execution_uuid: Uuid,
        pending_count: usize,
        pending_record_uuids: Vec<Uuid>,
    },

    #[error("Execution {execution_uuid} is closed ({status})")]
    ExecutionClosed {
        execution_uuid: Uuid,
        status: ExecutionState,
    },

    #[error("Timed out waiting for {resource} lock on {uuid}")]
    LockTimeout { resource: &'static str, uuid: Uuid },

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

impl TrackerError {
    pub fn not_found(entity: EntityKind, uuid: Uuid) -> Self {
        Self::NotFound { entity, uuid }
    }

    /// Attach entity context to a rejected state machine evaluation
    pub fn from_state_machine(entity: EntityKind, uuid: Uuid, err: StateMachineError) -> Self {
        match err {
            StateMachineError::InvalidTransition { from, event } => Self::InvalidTransition {
                entity,
                uuid,
                from,
                event,
            },
            StateMachineError::GuardFailed(guard) => match guard {
                GuardError::EmptyReason { .. } => Self::Validation(guard.to_string()),
                GuardError::RecordsNotTerminal {
                    pending_count,
                    pending_record_uuids,
                } => Self::Precompletion {
                    execution_uuid: uuid,
                    pending_count,
                    pending_record_uuids,
                },
                GuardError::ExecutionClosed { status } => Self::ExecutionClosed {
                    execution_uuid: uuid,
                    status,
                },
            },
        }
    }

    /// Whether the caller can act on the error without external retry
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Persistence(_))
    }

    /// Stable machine-readable kind, for transports mapping errors to responses
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::Validation(_) => "validation_error",
            Self::Precompletion { .. } => "precompletion_error",
            Self::ExecutionClosed { .. } => "execution_closed",
            Self::LockTimeout { .. } => "lock_timeout",
            Self::Persistence(_) => "persistence_error",
            Self::Configuration(_) => "configuration_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;
