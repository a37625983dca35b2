use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use super::{ChangeSet, ExecutionFilter, ExecutionStore};
use crate::models::{EntityKind, Execution, NewTransition, StepRecord, TransitionRecord};
use crate::state_machine::errors::{PersistenceError, PersistenceResult};

#[derive(Debug, Default)]
struct MemoryState {
    executions: HashMap<Uuid, Execution>,
    records: HashMap<Uuid, StepRecord>,
    transitions: HashMap<Uuid, Vec<TransitionRecord>>,
}

impl MemoryState {
    fn append_transitions(&mut self, transitions: Vec<NewTransition>) {
        for transition in transitions {
            let history = self.transitions.entry(transition.entity_uuid).or_default();
            let sort_key = history.last().map_or(1, |last| last.sort_key + 1);
            history.push(transition.into_record(sort_key));
        }
    }
}

/// Process-local store; every commit is applied under a single write lock
#[derive(Debug, Default)]
pub struct MemoryExecutionStore {
    state: RwLock<MemoryState>,
}

impl MemoryExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn execution_count(&self) -> usize {
        self.state.read().executions.len()
    }
}

fn check_version(
    entity: EntityKind,
    entity_uuid: Uuid,
    stored_version: Option<i64>,
    new_version: i64,
) -> PersistenceResult<()> {
    match stored_version {
        None => Err(PersistenceError::Missing {
            entity,
            entity_uuid,
        }),
        Some(stored) if stored + 1 != new_version => Err(PersistenceError::ConcurrentModification {
            entity,
            entity_uuid,
        }),
        Some(_) => Ok(()),
    }
}

#[async_trait]
impl ExecutionStore for MemoryExecutionStore {
    async fn insert_execution(
        &self,
        execution: &Execution,
        records: &[StepRecord],
        transitions: Vec<NewTransition>,
    ) -> PersistenceResult<()> {
        let mut state = self.state.write();

        if state.executions.contains_key(&execution.execution_uuid) {
            return Err(PersistenceError::Duplicate {
                entity: EntityKind::Execution,
                entity_uuid: execution.execution_uuid,
            });
        }
        if let Some(existing) = records
            .iter()
            .find(|record| state.records.contains_key(&record.step_record_uuid))
        {
            return Err(PersistenceError::Duplicate {
                entity: EntityKind::StepRecord,
                entity_uuid: existing.step_record_uuid,
            });
        }

        state
            .executions
            .insert(execution.execution_uuid, execution.clone());
        for record in records {
            state.records.insert(record.step_record_uuid, record.clone());
        }
        state.append_transitions(transitions);
        Ok(())
    }

    async fn find_execution(&self, execution_uuid: Uuid) -> PersistenceResult<Option<Execution>> {
        Ok(self.state.read().executions.get(&execution_uuid).cloned())
    }

    async fn find_record(&self, step_record_uuid: Uuid) -> PersistenceResult<Option<StepRecord>> {
        Ok(self.state.read().records.get(&step_record_uuid).cloned())
    }

    async fn records_for_execution(
        &self,
        execution_uuid: Uuid,
    ) -> PersistenceResult<Vec<StepRecord>> {
        let state = self.state.read();
        let Some(execution) = state.executions.get(&execution_uuid) else {
            return Ok(Vec::new());
        };

        execution
            .record_uuids
            .iter()
            .map(|uuid| {
                state
                    .records
                    .get(uuid)
                    .cloned()
                    .ok_or(PersistenceError::Missing {
                        entity: EntityKind::StepRecord,
                        entity_uuid: *uuid,
                    })
            })
            .collect()
    }

    async fn list_executions(&self, filter: &ExecutionFilter) -> PersistenceResult<Vec<Execution>> {
        let state = self.state.read();
        let mut executions: Vec<Execution> = state
            .executions
            .values()
            .filter(|execution| filter.matches(execution))
            .cloned()
            .collect();
        executions.sort_by_key(|execution| (execution.created_at, execution.execution_uuid));
        Ok(executions)
    }

    async fn commit(&self, changes: ChangeSet) -> PersistenceResult<()> {
        let mut state = self.state.write();

        // Validate everything before the first write
        if let Some(execution) = &changes.execution {
            let stored = state
                .executions
                .get(&execution.execution_uuid)
                .map(|e| e.version);
            check_version(
                EntityKind::Execution,
                execution.execution_uuid,
                stored,
                execution.version,
            )?;
        }
        if let Some(record) = &changes.record {
            let stored = state.records.get(&record.step_record_uuid).map(|r| r.version);
            check_version(
                EntityKind::StepRecord,
                record.step_record_uuid,
                stored,
                record.version,
            )?;
        }

        if let Some(execution) = changes.execution {
            state.executions.insert(execution.execution_uuid, execution);
        }
        if let Some(record) = changes.record {
            state.records.insert(record.step_record_uuid, record);
        }
        state.append_transitions(changes.transitions);
        Ok(())
    }

    async fn transitions_for(&self, entity_uuid: Uuid) -> PersistenceResult<Vec<TransitionRecord>> {
        Ok(self
            .state
            .read()
            .transitions
            .get(&entity_uuid)
            .cloned()
            .unwrap_or_default())
    }
}
