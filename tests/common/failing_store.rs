use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use uuid::Uuid;

use execution_tracker::models::{Execution, NewTransition, StepRecord, TransitionRecord};
use execution_tracker::persistence::{ChangeSet, ExecutionFilter, ExecutionStore, MemoryExecutionStore};
use execution_tracker::state_machine::errors::{PersistenceError, PersistenceResult};

/// Memory store whose writes can be made to fail on demand
pub struct FailingStore {
    inner: MemoryExecutionStore,
    fail_commits: AtomicBool,
    commits: AtomicUsize,
}

impl FailingStore {
    pub fn new(inner: MemoryExecutionStore) -> Self {
        Self {
            inner,
            fail_commits: AtomicBool::new(false),
            commits: AtomicUsize::new(0),
        }
    }

    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Successful commits so far
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExecutionStore for FailingStore {
    async fn insert_execution(
        &self,
        execution: &Execution,
        records: &[StepRecord],
        transitions: Vec<NewTransition>,
    ) -> PersistenceResult<()> {
        self.inner
            .insert_execution(execution, records, transitions)
            .await
    }

    async fn find_execution(&self, execution_uuid: Uuid) -> PersistenceResult<Option<Execution>> {
        self.inner.find_execution(execution_uuid).await
    }

    async fn find_record(&self, step_record_uuid: Uuid) -> PersistenceResult<Option<StepRecord>> {
        self.inner.find_record(step_record_uuid).await
    }

    async fn records_for_execution(
        &self,
        execution_uuid: Uuid,
    ) -> PersistenceResult<Vec<StepRecord>> {
        self.inner.records_for_execution(execution_uuid).await
    }

    async fn list_executions(&self, filter: &ExecutionFilter) -> PersistenceResult<Vec<Execution>> {
        self.inner.list_executions(filter).await
    }

    async fn commit(&self, changes: ChangeSet) -> PersistenceResult<()> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable {
                reason: "injected write failure".to_string(),
            });
        }
        self.inner.commit(changes).await?;
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn transitions_for(&self, entity_uuid: Uuid) -> PersistenceResult<Vec<TransitionRecord>> {
        self.inner.transitions_for(entity_uuid).await
    }
}
