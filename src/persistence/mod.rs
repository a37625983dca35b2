//! # Persistence
//!
//! The tracker assumes a durable store offering atomic read-modify-write per
//! execution and per step record. `ExecutionStore` is that boundary:
//!
//! - reads return owned snapshots, never live references;
//! - `commit` applies a [`ChangeSet`] all-or-nothing, compare-and-swapping each
//!   entity on its previous `version` and appending the audit transitions in the
//!   same write.
//!
//! Two backends ship with the crate: [`MemoryExecutionStore`] and, with the
//! `postgres` feature, [`PgExecutionStore`].

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Execution, NewTransition, StepRecord, TransitionRecord};
use crate::state_machine::errors::PersistenceResult;
use crate::state_machine::ExecutionState;

pub use memory::MemoryExecutionStore;
#[cfg(feature = "postgres")]
pub use postgres::PgExecutionStore;

/// Writes applied together by `ExecutionStore::commit`
///
/// Entities carry their *new* version; the store only accepts them if the stored
/// version is exactly one less.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub execution: Option<Execution>,
    pub record: Option<StepRecord>,
    pub transitions: Vec<NewTransition>,
}

impl ChangeSet {
    pub fn execution(execution: Execution) -> Self {
        Self {
            execution: Some(execution),
            ..Self::default()
        }
    }

    pub fn record(record: StepRecord) -> Self {
        Self {
            record: Some(record),
            ..Self::default()
        }
    }

    pub fn with_execution(mut self, execution: Option<Execution>) -> Self {
        self.execution = execution;
        self
    }

    pub fn with_transition(mut self, transition: NewTransition) -> Self {
        self.transitions.push(transition);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.execution.is_none() && self.record.is_none() && self.transitions.is_empty()
    }
}

/// Filter for listing executions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionFilter {
    pub workflow_uuid: Option<Uuid>,
    pub status: Option<ExecutionState>,
}

impl ExecutionFilter {
    pub fn matches(&self, execution: &Execution) -> bool {
        self.workflow_uuid
            .map_or(true, |uuid| execution.workflow_uuid == uuid)
            && self.status.map_or(true, |status| execution.status == status)
    }
}

/// Durable storage for executions, step records and their transition history
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Persist a new execution and its records in one atomic write
    async fn insert_execution(
        &self,
        execution: &Execution,
        records: &[StepRecord],
        transitions: Vec<NewTransition>,
    ) -> PersistenceResult<()>;

    async fn find_execution(&self, execution_uuid: Uuid) -> PersistenceResult<Option<Execution>>;

    async fn find_record(&self, step_record_uuid: Uuid) -> PersistenceResult<Option<StepRecord>>;

    /// Records owned by an execution, in step order
    async fn records_for_execution(
        &self,
        execution_uuid: Uuid,
    ) -> PersistenceResult<Vec<StepRecord>>;

    async fn list_executions(&self, filter: &ExecutionFilter) -> PersistenceResult<Vec<Execution>>;

    /// Apply every write in `changes` or none of them
    async fn commit(&self, changes: ChangeSet) -> PersistenceResult<()>;

    /// Audit trail for an execution or step record, ordered by sort key
    async fn transitions_for(&self, entity_uuid: Uuid) -> PersistenceResult<Vec<TransitionRecord>>;
}
