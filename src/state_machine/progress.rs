//! # Progress Calculator
//!
//! Pure mapping from the step records of one execution to a completion percentage
//! and an "all terminal" hint.
//!
//! - Denominator: number of records owned by the execution.
//! - Numerator: records that are `completed` or `skipped`. Failed records are
//!   terminal but do not advance progress.
//! - `progress = floor(100 * numerator / denominator)`, or `0` with no records.
//! - `all_terminal` holds when no record is `pending` or `in_progress`
//!   (vacuously true with no records).
//!
//! The calculation reads only the statuses it is handed, so calling it repeatedly on
//! an unchanged set always yields the same snapshot.

use serde::{Deserialize, Serialize};

use super::states::StepRecordState;
use crate::models::StepRecord;

/// Aggregated view over a set of step record statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub progress: u8,
    pub all_terminal: bool,
}

impl ProgressSnapshot {
    /// Records counted in the progress numerator
    pub fn resolved(&self) -> usize {
        self.completed + self.skipped
    }

    /// Records that still block completion of the execution
    pub fn non_terminal(&self) -> usize {
        self.pending + self.in_progress
    }
}

/// Stateless progress aggregation
pub struct ProgressCalculator;

impl ProgressCalculator {
    /// Compute the snapshot for a set of step records
    pub fn compute(records: &[StepRecord]) -> ProgressSnapshot {
        Self::compute_states(records.iter().map(|record| record.status))
    }

    /// Compute the snapshot from bare statuses
    pub fn compute_states<I>(states: I) -> ProgressSnapshot
    where
        I: IntoIterator<Item = StepRecordState>,
    {
        let mut snapshot = ProgressSnapshot::default();

        for state in states {
            snapshot.total += 1;
            match state {
                StepRecordState::Pending => snapshot.pending += 1,
                StepRecordState::InProgress => snapshot.in_progress += 1,
                StepRecordState::Completed => snapshot.completed += 1,
                StepRecordState::Skipped => snapshot.skipped += 1,
                StepRecordState::Failed => snapshot.failed += 1,
            }
        }

        snapshot.progress = percentage(snapshot.resolved(), snapshot.total);
        snapshot.all_terminal = snapshot.non_terminal() == 0;
        snapshot
    }
}

fn percentage(numerator: usize, denominator: usize) -> u8 {
    if denominator == 0 {
        return 0;
    }
    // numerator <= denominator, so the quotient never exceeds 100
    ((numerator as u128 * 100) / denominator as u128) as u8
}
