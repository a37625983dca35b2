//! # Step Record Model
//!
//! The unit of state for one step of one execution.
//!
//! ## Overview
//!
//! A `StepRecord` is materialized for every step definition when an execution is
//! instantiated, and is exclusively owned by that execution for its whole life.
//! Only `StepRecordManager` changes its status; everything on this type is plain
//! data plus read-only helpers.
//!
//! ## Timestamps
//!
//! `started_at`, `completed_at`, `skipped_at` and `failed_at` are each written once,
//! by the transition that produces the matching status. A terminal record carries
//! exactly one of the three outcome timestamps.
//!
//! ## Reasons
//!
//! `skip_reason` and `failure_reason` are present (and non-empty) exactly when the
//! status is `skipped` / `failed` respectively.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::result_payload::ResultPayload;
use super::workflow_definition::StepDefinition;
use crate::state_machine::states::StepRecordState;

/// State of one step within one execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step_record_uuid: Uuid,
    pub execution_uuid: Uuid,
    pub step_uuid: Uuid,
    pub position: i32,
    pub status: StepRecordState,
    pub notes: Option<String>,
    pub skip_reason: Option<String>,
    pub failure_reason: Option<String>,
    pub result: Option<ResultPayload>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub skipped_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    /// Incremented on every committed write; the store compares and swaps on it
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StepRecord {
    /// Materialize a pending record for a step definition
    pub fn materialize(execution_uuid: Uuid, step: &StepDefinition, now: DateTime<Utc>) -> Self {
        Self {
            step_record_uuid: Uuid::new_v4(),
            execution_uuid,
            step_uuid: step.step_uuid,
            position: step.position,
            status: StepRecordState::Pending,
            notes: None,
            skip_reason: None,
            failure_reason: None,
            result: None,
            started_at: None,
            completed_at: None,
            skipped_at: None,
            failed_at: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_resolved(&self) -> bool {
        self.status.is_resolved()
    }

    /// When the record reached its terminal state, if it has
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at.or(self.skipped_at).or(self.failed_at)
    }

    /// Time spent between start and the terminal transition
    pub fn duration(&self) -> Option<chrono::Duration> {
        match (self.started_at, self.finished_at()) {
            (Some(started), Some(finished)) => Some(finished - started),
            _ => None,
        }
    }
}
