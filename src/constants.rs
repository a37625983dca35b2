//! # System Constants
//!
//! Lifecycle event names, status groupings and system limits shared by the
//! state machines, managers and stores.

// Re-export state types for convenience
pub use crate::state_machine::{
    ExecutionState as ExecutionStatus, StepRecordState as StepRecordStatus,
};

/// Lifecycle events published after committed transitions
pub mod events {
    // Execution lifecycle events
    pub const EXECUTION_CREATED: &str = "execution.created";
    pub const EXECUTION_STARTED: &str = "execution.started";
    pub const EXECUTION_PAUSED: &str = "execution.paused";
    pub const EXECUTION_RESUMED: &str = "execution.resumed";
    pub const EXECUTION_COMPLETED: &str = "execution.completed";
    pub const EXECUTION_CANCELLED: &str = "execution.cancelled";
    pub const EXECUTION_PROGRESS_UPDATED: &str = "execution.progress_updated";

    // Step record lifecycle events
    pub const STEP_RECORD_STARTED: &str = "step_record.started";
    pub const STEP_RECORD_COMPLETED: &str = "step_record.completed";
    pub const STEP_RECORD_SKIPPED: &str = "step_record.skipped";
    pub const STEP_RECORD_FAILED: &str = "step_record.failed";
}

/// System-wide constants
pub mod system {
    /// Version compatibility marker
    pub const TRACKER_CORE_VERSION: &str = "0.1.0";

    /// Event name recorded on the initial transition of a new entity
    pub const INITIALIZE_EVENT: &str = "initialize";

    /// Maximum number of steps materialized for a single execution
    pub const MAX_EXECUTION_STEPS: usize = 1000;
}

/// Status groupings for validation and logic
pub mod status_groups {
    use super::{ExecutionStatus, StepRecordStatus};

    /// Step record statuses that count toward progress
    pub const RESOLVED_STEP_RECORD_STATES: &[StepRecordStatus] =
        &[StepRecordStatus::Completed, StepRecordStatus::Skipped];

    /// Step record statuses from which no transition is possible
    pub const TERMINAL_STEP_RECORD_STATES: &[StepRecordStatus] = &[
        StepRecordStatus::Completed,
        StepRecordStatus::Skipped,
        StepRecordStatus::Failed,
    ];

    /// Execution statuses that close the execution and its records
    pub const EXECUTION_FINAL_STATES: &[ExecutionStatus] =
        &[ExecutionStatus::Completed, ExecutionStatus::Cancelled];

    /// Execution statuses that still accept work
    pub const EXECUTION_OPEN_STATES: &[ExecutionStatus] = &[
        ExecutionStatus::Pending,
        ExecutionStatus::InProgress,
        ExecutionStatus::Paused,
    ];
}

/// Lifecycle event for an execution moving `from -> to`
pub fn execution_transition_event(
    from: Option<ExecutionStatus>,
    to: ExecutionStatus,
) -> Option<&'static str> {
    match (from, to) {
        (None, ExecutionStatus::Pending) => Some(events::EXECUTION_CREATED),
        (Some(ExecutionStatus::Paused), ExecutionStatus::InProgress) => {
            Some(events::EXECUTION_RESUMED)
        }
        (Some(_), ExecutionStatus::InProgress) => Some(events::EXECUTION_STARTED),
        (Some(_), ExecutionStatus::Paused) => Some(events::EXECUTION_PAUSED),
        (Some(_), ExecutionStatus::Completed) => Some(events::EXECUTION_COMPLETED),
        (Some(_), ExecutionStatus::Cancelled) => Some(events::EXECUTION_CANCELLED),
        _ => None,
    }
}

/// Lifecycle event for a step record entering `to`
pub fn step_record_transition_event(to: StepRecordStatus) -> Option<&'static str> {
    match to {
        StepRecordStatus::InProgress => Some(events::STEP_RECORD_STARTED),
        StepRecordStatus::Completed => Some(events::STEP_RECORD_COMPLETED),
        StepRecordStatus::Skipped => Some(events::STEP_RECORD_SKIPPED),
        StepRecordStatus::Failed => Some(events::STEP_RECORD_FAILED),
        StepRecordStatus::Pending => None,
    }
}
