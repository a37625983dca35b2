//! # Execution Manager
//!
//! Owns every status change of an execution and the derived `progress` field.
//!
//! ## Responsibilities
//!
//! - Instantiate executions from workflow definitions (`create`)
//! - Apply `start`, `pause`, `resume`, `complete` and `cancel` under the exclusive
//!   execution gate, so two status changes on the same execution never race
//! - Recompute and persist progress whenever a step record changes
//!   (`on_record_changed`, and the record commit path used by `StepRecordManager`)
//! - Serve read-side queries: single execution, ordered records, summary context,
//!   filtered listing and the transition history
//!
//! Every mutation is validated in full before the single atomic `commit`; a
//! rejected call leaves the stored execution exactly as it was.

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::locks::LockRegistry;
use crate::constants::{events, system};
use crate::error::{Result, TrackerError};
use crate::events::EventPublisher;
use crate::logging::log_execution_operation;
use crate::models::{
    EntityKind, Execution, ExecutionContext, NewTransition, StepRecord, TransitionRecord,
};
use crate::persistence::{ChangeSet, ExecutionFilter, ExecutionStore};
use crate::registry::WorkflowDefinitionSource;
use crate::state_machine::actions::{FailureLoggingAction, PublishTransitionEventAction};
use crate::state_machine::{
    ExecutionEvent, ExecutionStateMachine, ProgressCalculator, ProgressSnapshot, StateAction,
};

type ExecutionAction = Arc<dyn StateAction<Execution> + Send + Sync>;

/// Result of committing a step record transition together with its progress update
#[derive(Debug, Clone)]
pub struct RecordCommit {
    pub record: StepRecord,
    pub execution: Execution,
    pub snapshot: ProgressSnapshot,
}

pub struct ExecutionManager {
    store: Arc<dyn ExecutionStore>,
    definitions: Arc<dyn WorkflowDefinitionSource>,
    locks: Arc<LockRegistry>,
    event_publisher: Arc<EventPublisher>,
    actions: Vec<ExecutionAction>,
}

impl std::fmt::Debug for ExecutionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionManager")
            .field("actions", &self.actions.len())
            .finish()
    }
}

impl ExecutionManager {
    pub fn new(
        store: Arc<dyn ExecutionStore>,
        definitions: Arc<dyn WorkflowDefinitionSource>,
        locks: Arc<LockRegistry>,
        event_publisher: Arc<EventPublisher>,
    ) -> Self {
        let actions: Vec<ExecutionAction> = vec![
            Arc::new(PublishTransitionEventAction::new(event_publisher.clone())),
            Arc::new(FailureLoggingAction),
        ];

        Self {
            store,
            definitions,
            locks,
            event_publisher,
            actions,
        }
    }

    /// Instantiate a pending execution with one pending record per step
    #[instrument(skip_all, fields(workflow_uuid = %workflow_uuid))]
    pub async fn create(&self, workflow_uuid: Uuid) -> Result<Execution> {
        let definition = self
            .definitions
            .find_definition(workflow_uuid)
            .await?
            .ok_or_else(|| TrackerError::not_found(EntityKind::Workflow, workflow_uuid))?;

        if definition.steps.len() > system::MAX_EXECUTION_STEPS {
            return Err(TrackerError::Validation(format!(
                "workflow {workflow_uuid} has {} steps, more than the limit of {}",
                definition.steps.len(),
                system::MAX_EXECUTION_STEPS
            )));
        }

        let now = Utc::now();
        let (execution, records) = Execution::materialize(&definition, now);

        let mut transitions = Vec::with_capacity(records.len() + 1);
        transitions.push(
            NewTransition::new(
                EntityKind::Execution,
                execution.execution_uuid,
                None,
                execution.status.to_string(),
                system::INITIALIZE_EVENT,
                now,
            )
            .with_metadata(json!({ "workflow_uuid": workflow_uuid })),
        );
        transitions.extend(records.iter().map(|record| {
            NewTransition::new(
                EntityKind::StepRecord,
                record.step_record_uuid,
                None,
                record.status.to_string(),
                system::INITIALIZE_EVENT,
                now,
            )
        }));

        self.store
            .insert_execution(&execution, &records, transitions)
            .await
            .map_err(|e| {
                error!(execution_uuid = %execution.execution_uuid, error = %e, "Failed to persist new execution");
                TrackerError::from(e)
            })?;

        log_execution_operation(
            "create",
            execution.execution_uuid,
            &execution.status.to_string(),
            Some(execution.progress),
            Some(&format!("{} step records", records.len())),
        );
        self.run_actions(&execution, None, system::INITIALIZE_EVENT)
            .await;

        Ok(execution)
    }

    pub async fn get(&self, execution_uuid: Uuid) -> Result<Execution> {
        self.store
            .find_execution(execution_uuid)
            .await?
            .ok_or_else(|| TrackerError::not_found(EntityKind::Execution, execution_uuid))
    }

    /// Owned step records, in step order
    pub async fn records(&self, execution_uuid: Uuid) -> Result<Vec<StepRecord>> {
        self.get(execution_uuid).await?;
        Ok(self.store.records_for_execution(execution_uuid).await?)
    }

    /// Summary view computed from the current record set
    pub async fn context(&self, execution_uuid: Uuid) -> Result<ExecutionContext> {
        self.get(execution_uuid).await?;
        let gate = self.locks.share_execution(execution_uuid).await?;
        let execution = self.get(execution_uuid).await?;
        let records = self.store.records_for_execution(execution_uuid).await?;
        drop(gate);

        self.release_if_closed(&execution);
        Ok(ExecutionContext::build(&execution, &records, Utc::now()))
    }

    pub async fn list(&self, filter: &ExecutionFilter) -> Result<Vec<Execution>> {
        Ok(self.store.list_executions(filter).await?)
    }

    pub async fn history(&self, execution_uuid: Uuid) -> Result<Vec<TransitionRecord>> {
        self.get(execution_uuid).await?;
        Ok(self.store.transitions_for(execution_uuid).await?)
    }

    pub async fn start(&self, execution_uuid: Uuid) -> Result<Execution> {
        self.transition(execution_uuid, ExecutionEvent::Start).await
    }

    /// Allowed from `pending` as well as `in_progress`; records are untouched
    pub async fn pause(&self, execution_uuid: Uuid) -> Result<Execution> {
        self.transition(execution_uuid, ExecutionEvent::Pause).await
    }

    pub async fn resume(&self, execution_uuid: Uuid) -> Result<Execution> {
        self.transition(execution_uuid, ExecutionEvent::Resume).await
    }

    /// Fails with `Precompletion` while any owned record is pending or in progress
    pub async fn complete(&self, execution_uuid: Uuid) -> Result<Execution> {
        self.transition(execution_uuid, ExecutionEvent::Complete)
            .await
    }

    pub async fn cancel(&self, execution_uuid: Uuid) -> Result<Execution> {
        self.transition(execution_uuid, ExecutionEvent::Cancel).await
    }

    /// Recompute progress from the current records and persist it if it moved
    ///
    /// Never changes status. Safe to call any number of times for the same change.
    #[instrument(skip_all, fields(execution_uuid = %execution_uuid))]
    pub async fn on_record_changed(&self, execution_uuid: Uuid) -> Result<Execution> {
        self.get(execution_uuid).await?;
        let gate = self.locks.share_execution(execution_uuid).await?;
        let progress = self.locks.lock_progress(execution_uuid).await?;

        let execution = self.get(execution_uuid).await?;
        let records = self.store.records_for_execution(execution_uuid).await?;
        let snapshot = ProgressCalculator::compute(&records);

        let Some(updated) = ExecutionStateMachine::with_progress(&execution, &snapshot, Utc::now())
        else {
            debug!(progress = execution.progress, "Progress unchanged");
            drop(progress);
            drop(gate);
            self.release_if_closed(&execution);
            return Ok(execution);
        };

        self.store
            .commit(ChangeSet::execution(updated.clone()))
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to persist recomputed progress");
                TrackerError::from(e)
            })?;
        drop(progress);
        drop(gate);
        self.release_if_closed(&updated);

        self.publish_progress(&updated, execution.progress, &snapshot)
            .await;
        Ok(updated)
    }

    /// Drop lock entries of an execution that can no longer change
    pub(crate) fn release_if_closed(&self, execution: &Execution) {
        if execution.status.is_terminal() {
            self.locks
                .release_execution(execution.execution_uuid, &execution.record_uuids);
        }
    }

    /// Commit a validated step record transition together with the owning
    /// execution's recomputed progress
    ///
    /// Callers hold the shared execution gate and the record lock.
    pub(crate) async fn commit_record_transition(
        &self,
        record: StepRecord,
        transition: NewTransition,
    ) -> Result<RecordCommit> {
        let execution_uuid = record.execution_uuid;
        let _progress = self.locks.lock_progress(execution_uuid).await?;

        let execution = self.get(execution_uuid).await?;
        let mut records = self.store.records_for_execution(execution_uuid).await?;
        for existing in records.iter_mut() {
            if existing.step_record_uuid == record.step_record_uuid {
                *existing = record.clone();
            }
        }
        let snapshot = ProgressCalculator::compute(&records);
        let updated = ExecutionStateMachine::with_progress(&execution, &snapshot, record.updated_at);

        let changes = ChangeSet::record(record.clone())
            .with_execution(updated.clone())
            .with_transition(transition);

        self.store.commit(changes).await.map_err(|e| {
            error!(
                execution_uuid = %execution_uuid,
                step_record_uuid = %record.step_record_uuid,
                error = %e,
                "Failed to persist step record transition"
            );
            TrackerError::from(e)
        })?;

        let execution = match updated {
            Some(updated) => {
                self.publish_progress(&updated, execution.progress, &snapshot)
                    .await;
                updated
            }
            None => execution,
        };

        Ok(RecordCommit {
            record,
            execution,
            snapshot,
        })
    }

    #[instrument(skip_all, fields(execution_uuid = %execution_uuid, event = event.event_type()))]
    async fn transition(&self, execution_uuid: Uuid, event: ExecutionEvent) -> Result<Execution> {
        self.get(execution_uuid).await?;
        let gate = self.locks.lock_execution(execution_uuid).await?;

        let execution = self.get(execution_uuid).await?;
        let records = if ExecutionStateMachine::requires_records(event) {
            self.store.records_for_execution(execution_uuid).await?
        } else {
            Vec::new()
        };

        let now = Utc::now();
        let updated = match ExecutionStateMachine::apply(&execution, event, &records, now) {
            Ok(updated) => updated,
            Err(e) => {
                debug!(from_state = %execution.status, error = %e, "Execution transition rejected");
                drop(gate);
                self.release_if_closed(&execution);
                return Err(TrackerError::from_state_machine(
                    EntityKind::Execution,
                    execution_uuid,
                    e,
                ));
            }
        };

        let from_state = execution.status.to_string();
        let transition = NewTransition::new(
            EntityKind::Execution,
            execution_uuid,
            Some(from_state.clone()),
            updated.status.to_string(),
            event.event_type(),
            now,
        )
        .with_metadata(json!({ "progress": updated.progress }));

        self.store
            .commit(ChangeSet::execution(updated.clone()).with_transition(transition))
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to persist execution transition");
                TrackerError::from(e)
            })?;
        drop(gate);
        self.release_if_closed(&updated);

        info!(
            from_state = %from_state,
            to_state = %updated.status,
            progress = updated.progress,
            "Execution transitioned"
        );
        log_execution_operation(
            event.event_type(),
            execution_uuid,
            &updated.status.to_string(),
            Some(updated.progress),
            None,
        );
        self.run_actions(&updated, Some(from_state), event.event_type())
            .await;

        Ok(updated)
    }

    /// Post-commit side effects; failures are logged, never surfaced
    async fn run_actions(&self, execution: &Execution, from_state: Option<String>, event: &str) {
        for action in &self.actions {
            if let Err(e) = action
                .execute(execution, from_state.clone(), execution.status.to_string(), event)
                .await
            {
                warn!(
                    execution_uuid = %execution.execution_uuid,
                    action = action.description(),
                    error = %e,
                    "Post-transition action failed"
                );
            }
        }
    }

    async fn publish_progress(&self, execution: &Execution, previous: u8, snapshot: &ProgressSnapshot) {
        debug!(
            execution_uuid = %execution.execution_uuid,
            previous,
            progress = execution.progress,
            "Execution progress updated"
        );

        let context = json!({
            "execution_uuid": execution.execution_uuid,
            "previous_progress": previous,
            "progress": execution.progress,
            "all_terminal": snapshot.all_terminal,
            "total": snapshot.total,
            "resolved": snapshot.resolved(),
            "failed": snapshot.failed,
        });
        self.event_publisher
            .publish(events::EXECUTION_PROGRESS_UPDATED, context)
            .await;
    }
}
