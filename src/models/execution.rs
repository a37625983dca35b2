//! # Execution Model
//!
//! One instantiated run of a workflow, owning an ordered set of step records.
//!
//! `progress` is derived from the owned records by the progress calculator and is
//! never set by callers. `completed_at` is present exactly when the status is
//! `completed`; `cancelled_at` exactly when it is `cancelled`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::step_record::StepRecord;
use super::workflow_definition::WorkflowDefinition;
use crate::state_machine::states::ExecutionState;

/// One workflow run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub execution_uuid: Uuid,
    pub workflow_uuid: Uuid,
    pub status: ExecutionState,
    /// Completion percentage, 0..=100
    pub progress: u8,
    /// Owned step records in step order; fixed at creation
    pub record_uuids: Vec<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Execution {
    /// Build a pending execution and its pending step records from a definition
    pub fn materialize(
        definition: &WorkflowDefinition,
        now: DateTime<Utc>,
    ) -> (Execution, Vec<StepRecord>) {
        let execution_uuid = Uuid::new_v4();
        let records: Vec<StepRecord> = definition
            .ordered_steps()
            .into_iter()
            .map(|step| StepRecord::materialize(execution_uuid, step, now))
            .collect();

        let execution = Execution {
            execution_uuid,
            workflow_uuid: definition.workflow_uuid,
            status: ExecutionState::Pending,
            progress: 0,
            record_uuids: records.iter().map(|r| r.step_record_uuid).collect(),
            started_at: None,
            completed_at: None,
            cancelled_at: None,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        (execution, records)
    }

    pub fn record_count(&self) -> usize {
        self.record_uuids.len()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Wall-clock time since start, frozen once the execution is closed
    pub fn elapsed(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        let started = self.started_at?;
        let end = self.completed_at.or(self.cancelled_at).unwrap_or(now);
        Some(end - started)
    }
}
