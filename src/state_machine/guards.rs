use super::errors::{empty_reason, GuardError, GuardResult};
use super::events::StepRecordEvent;
use crate::models::{Execution, StepRecord};

/// Trait for implementing state transition guards
pub trait StateGuard<T> {
    /// Check if a transition is allowed
    fn check(&self, entity: &T) -> GuardResult<()>;

    /// Get a description of this guard for logging
    fn description(&self) -> &'static str;
}

/// Guard requiring skip and failure reasons to carry text
pub struct NonEmptyReasonGuard;

impl StateGuard<StepRecordEvent> for NonEmptyReasonGuard {
    fn check(&self, event: &StepRecordEvent) -> GuardResult<()> {
        match event {
            StepRecordEvent::Skip(reason) if reason.is_empty() => {
                Err(empty_reason("skip_reason"))
            }
            StepRecordEvent::Fail(reason) if reason.is_empty() => {
                Err(empty_reason("failure_reason"))
            }
            _ => Ok(()),
        }
    }

    fn description(&self) -> &'static str {
        "Skip and failure reasons must not be empty"
    }
}

/// Guard to reject step record changes once the owning execution is closed
pub struct ExecutionOpenGuard;

impl StateGuard<Execution> for ExecutionOpenGuard {
    fn check(&self, execution: &Execution) -> GuardResult<()> {
        if execution.status.accepts_record_changes() {
            Ok(())
        } else {
            Err(GuardError::ExecutionClosed {
                status: execution.status,
            })
        }
    }

    fn description(&self) -> &'static str {
        "Owning execution must not be completed or cancelled"
    }
}

/// Guard to check every owned step record is terminal before completing an execution
pub struct AllRecordsTerminalGuard<'a> {
    records: &'a [StepRecord],
}

impl<'a> AllRecordsTerminalGuard<'a> {
    pub fn new(records: &'a [StepRecord]) -> Self {
        Self { records }
    }
}

impl StateGuard<Execution> for AllRecordsTerminalGuard<'_> {
    fn check(&self, execution: &Execution) -> GuardResult<()> {
        let pending_record_uuids: Vec<_> = self
            .records
            .iter()
            .filter(|record| record.execution_uuid == execution.execution_uuid)
            .filter(|record| !record.is_terminal())
            .map(|record| record.step_record_uuid)
            .collect();

        if pending_record_uuids.is_empty() {
            return Ok(());
        }

        Err(GuardError::RecordsNotTerminal {
            pending_count: pending_record_uuids.len(),
            pending_record_uuids,
        })
    }

    fn description(&self) -> &'static str {
        "All step records must be terminal"
    }
}
