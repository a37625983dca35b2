//! # Execution Context
//!
//! Computed, never-stored summary of an execution: status counts over its step
//! records, progress, and timing. Built on demand from the current record set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::execution::Execution;
use super::step_record::StepRecord;
use crate::state_machine::progress::{ProgressCalculator, ProgressSnapshot};
use crate::state_machine::states::ExecutionState;

/// Dashboard-style snapshot of one execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub execution_uuid: Uuid,
    pub workflow_uuid: Uuid,
    pub status: ExecutionState,
    pub progress: u8,
    pub total_records: usize,
    pub pending_records: usize,
    pub in_progress_records: usize,
    pub completed_records: usize,
    pub skipped_records: usize,
    pub failed_records: usize,
    pub all_terminal: bool,
    /// The execution is in progress and nothing blocks `complete`
    pub ready_for_completion: bool,
    pub elapsed_seconds: Option<i64>,
    pub computed_at: DateTime<Utc>,
}

impl ExecutionContext {
    pub fn build(execution: &Execution, records: &[StepRecord], now: DateTime<Utc>) -> Self {
        let ProgressSnapshot {
            total,
            pending,
            in_progress,
            completed,
            skipped,
            failed,
            progress,
            all_terminal,
        } = ProgressCalculator::compute(records);

        Self {
            execution_uuid: execution.execution_uuid,
            workflow_uuid: execution.workflow_uuid,
            status: execution.status,
            progress,
            total_records: total,
            pending_records: pending,
            in_progress_records: in_progress,
            completed_records: completed,
            skipped_records: skipped,
            failed_records: failed,
            all_terminal,
            ready_for_completion: execution.status == ExecutionState::InProgress && all_terminal,
            elapsed_seconds: execution.elapsed(now).map(|d| d.num_seconds()),
            computed_at: now,
        }
    }
}
