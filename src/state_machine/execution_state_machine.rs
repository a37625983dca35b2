//! Transition table and pure application rules for executions.
//!
//! ```text
//! pending ──start──▶ in_progress ◀──resume── paused
//!    │                  │  └────pause────────▲
//!    └──────pause───────┼────────────────────┘
//!                       ├──complete (all records terminal)──▶ completed
//! pending | in_progress | paused ──cancel──▶ cancelled
//! ```

use chrono::{DateTime, Utc};

use super::{
    errors::{invalid_transition, StateMachineResult},
    events::ExecutionEvent,
    guards::{AllRecordsTerminalGuard, StateGuard},
    progress::{ProgressCalculator, ProgressSnapshot},
    states::ExecutionState,
};
use crate::models::{Execution, StepRecord};

/// Stateless rules for execution transitions
pub struct ExecutionStateMachine;

impl ExecutionStateMachine {
    /// Determine the target state based on current state and event
    pub fn determine_target_state(
        current_state: ExecutionState,
        event: ExecutionEvent,
    ) -> StateMachineResult<ExecutionState> {
        let target = match (current_state, event) {
            (ExecutionState::Pending, ExecutionEvent::Start) => ExecutionState::InProgress,

            // Pausing a pending execution is allowed
            (ExecutionState::Pending | ExecutionState::InProgress, ExecutionEvent::Pause) => {
                ExecutionState::Paused
            }
            (ExecutionState::Paused, ExecutionEvent::Resume) => ExecutionState::InProgress,

            (ExecutionState::InProgress, ExecutionEvent::Complete) => ExecutionState::Completed,

            (
                ExecutionState::Pending | ExecutionState::InProgress | ExecutionState::Paused,
                ExecutionEvent::Cancel,
            ) => ExecutionState::Cancelled,

            (from_state, _) => return Err(invalid_transition(from_state, event.event_type())),
        };

        Ok(target)
    }

    /// Whether the event needs the owned record set to evaluate its guards
    pub fn requires_records(event: ExecutionEvent) -> bool {
        matches!(event, ExecutionEvent::Complete)
    }

    /// Check guard conditions for the transition
    pub fn check_guards(
        execution: &Execution,
        target_state: ExecutionState,
        records: &[StepRecord],
    ) -> StateMachineResult<()> {
        if target_state == ExecutionState::Completed {
            AllRecordsTerminalGuard::new(records).check(execution)?;
        }
        Ok(())
    }

    /// Produce the next version of `execution` for `event`
    ///
    /// `records` must be the complete owned record set when `requires_records(event)`.
    pub fn apply(
        execution: &Execution,
        event: ExecutionEvent,
        records: &[StepRecord],
        now: DateTime<Utc>,
    ) -> StateMachineResult<Execution> {
        let target_state = Self::determine_target_state(execution.status, event)?;
        Self::check_guards(execution, target_state, records)?;

        let mut next = execution.clone();
        next.status = target_state;
        next.version += 1;
        next.updated_at = now;

        match target_state {
            ExecutionState::InProgress if next.started_at.is_none() => {
                next.started_at = Some(now);
            }
            ExecutionState::Completed => {
                next.completed_at = Some(now);
                next.progress = ProgressCalculator::compute(records).progress;
            }
            ExecutionState::Cancelled => next.cancelled_at = Some(now),
            _ => {}
        }

        Ok(next)
    }

    /// Next version of `execution` carrying the snapshot's progress, if it changed
    pub fn with_progress(
        execution: &Execution,
        snapshot: &ProgressSnapshot,
        now: DateTime<Utc>,
    ) -> Option<Execution> {
        if execution.progress == snapshot.progress {
            return None;
        }

        let mut next = execution.clone();
        next.progress = snapshot.progress;
        next.version += 1;
        next.updated_at = now;
        Some(next)
    }
}
