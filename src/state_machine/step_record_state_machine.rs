//! Transition table and pure application rules for step records.
//!
//! ```text
//! pending ──start──▶ in_progress ──complete──▶ completed
//!                         │ ──skip──────▶ skipped
//!                         └ ──fail──────▶ failed
//! ```
//!
//! The three outcomes are absorbing. `apply` never mutates its input: it returns the
//! fully formed next record, so a persisted write either carries every field of the
//! transition or none of them.

use chrono::{DateTime, Utc};

use super::{
    errors::{invalid_transition, StateMachineResult},
    events::StepRecordEvent,
    guards::{NonEmptyReasonGuard, StateGuard},
    states::StepRecordState,
};
use crate::models::StepRecord;

/// Stateless rules for step record transitions
pub struct StepRecordStateMachine;

impl StepRecordStateMachine {
    /// Determine the target state based on current state and event
    pub fn determine_target_state(
        current_state: StepRecordState,
        event: &StepRecordEvent,
    ) -> StateMachineResult<StepRecordState> {
        let target = match (current_state, event) {
            (StepRecordState::Pending, StepRecordEvent::Start) => StepRecordState::InProgress,
            (StepRecordState::InProgress, StepRecordEvent::Complete { .. }) => {
                StepRecordState::Completed
            }
            (StepRecordState::InProgress, StepRecordEvent::Skip(_)) => StepRecordState::Skipped,
            (StepRecordState::InProgress, StepRecordEvent::Fail(_)) => StepRecordState::Failed,

            (from_state, _) => return Err(invalid_transition(from_state, event.event_type())),
        };

        Ok(target)
    }

    /// Input checks that do not depend on the record's current state
    pub fn check_event(event: &StepRecordEvent) -> StateMachineResult<()> {
        NonEmptyReasonGuard.check(event)?;
        Ok(())
    }

    /// Produce the next version of `record` for `event`
    pub fn apply(
        record: &StepRecord,
        event: &StepRecordEvent,
        now: DateTime<Utc>,
    ) -> StateMachineResult<StepRecord> {
        Self::check_event(event)?;
        let target_state = Self::determine_target_state(record.status, event)?;

        let mut next = record.clone();
        next.status = target_state;
        next.version += 1;
        next.updated_at = now;

        match event {
            StepRecordEvent::Start => next.started_at = Some(now),
            StepRecordEvent::Complete { notes, result } => {
                next.completed_at = Some(now);
                next.notes = notes.clone();
                next.result = result.clone();
            }
            StepRecordEvent::Skip(reason) => {
                next.skipped_at = Some(now);
                next.skip_reason = Some(reason.clone());
            }
            StepRecordEvent::Fail(reason) => {
                next.failed_at = Some(now);
                next.failure_reason = Some(reason.clone());
            }
        }

        Ok(next)
    }
}
