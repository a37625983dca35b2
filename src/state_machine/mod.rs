// State machine module for execution tracking
//
// Pure transition rules for executions and their step records: the status enums,
// the transition tables, guards, post-commit actions and progress aggregation.
// Nothing here touches storage; the orchestration managers own locking and commits.

pub mod actions;
pub mod errors;
pub mod events;
pub mod execution_state_machine;
pub mod guards;
pub mod progress;
pub mod states;
pub mod step_record_state_machine;

// Re-export main types for convenient access
pub use errors::{ActionError, GuardError, PersistenceError, StateMachineError};
pub use events::{ExecutionEvent, StepRecordEvent};
pub use execution_state_machine::ExecutionStateMachine;
pub use progress::{ProgressCalculator, ProgressSnapshot};
pub use states::{ExecutionState, StepRecordState};
pub use step_record_state_machine::StepRecordStateMachine;

// Common traits and utilities
pub use actions::StateAction;
pub use guards::StateGuard;
