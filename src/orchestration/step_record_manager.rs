//! # Step Record Manager
//!
//! The only component that changes a step record's status.
//!
//! A transition is checked in a fixed order before anything is written:
//!
//! 1. input (`Validation`: empty skip or failure reason)
//! 2. existence (`NotFound`)
//! 3. owning execution still open (`ExecutionClosed`)
//! 4. transition legality (`InvalidTransition`)
//!
//! Steps 3 and 4 run under the shared execution gate and the record's own lock,
//! against a freshly read record. The accepted record is then committed together
//! with the owning execution's recomputed progress via `ExecutionManager`.

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::execution_manager::ExecutionManager;
use super::locks::LockRegistry;
use crate::error::{Result, TrackerError};
use crate::events::EventPublisher;
use crate::logging::log_step_record_operation;
use crate::models::{
    AttachmentDescriptor, EntityKind, NewTransition, ResultPayload, StepRecord, TransitionRecord,
};
use crate::persistence::ExecutionStore;
use crate::services::AttachmentStore;
use crate::state_machine::actions::{FailureLoggingAction, PublishTransitionEventAction};
use crate::state_machine::guards::ExecutionOpenGuard;
use crate::state_machine::{StateAction, StateGuard, StepRecordEvent, StepRecordStateMachine};

type StepRecordAction = Arc<dyn StateAction<StepRecord> + Send + Sync>;

pub struct StepRecordManager {
    store: Arc<dyn ExecutionStore>,
    attachments: Arc<dyn AttachmentStore>,
    executions: Arc<ExecutionManager>,
    locks: Arc<LockRegistry>,
    actions: Vec<StepRecordAction>,
}

impl std::fmt::Debug for StepRecordManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepRecordManager")
            .field("actions", &self.actions.len())
            .finish()
    }
}

impl StepRecordManager {
    pub fn new(
        store: Arc<dyn ExecutionStore>,
        attachments: Arc<dyn AttachmentStore>,
        executions: Arc<ExecutionManager>,
        locks: Arc<LockRegistry>,
        event_publisher: Arc<EventPublisher>,
    ) -> Self {
        let actions: Vec<StepRecordAction> = vec![
            Arc::new(PublishTransitionEventAction::new(event_publisher)),
            Arc::new(FailureLoggingAction),
        ];

        Self {
            store,
            attachments,
            executions,
            locks,
            actions,
        }
    }

    pub async fn get(&self, step_record_uuid: Uuid) -> Result<StepRecord> {
        self.store
            .find_record(step_record_uuid)
            .await?
            .ok_or_else(|| TrackerError::not_found(EntityKind::StepRecord, step_record_uuid))
    }

    /// `pending -> in_progress`
    pub async fn start(&self, step_record_uuid: Uuid) -> Result<StepRecord> {
        self.transition(step_record_uuid, StepRecordEvent::Start)
            .await
    }

    /// `in_progress -> completed`, storing the notes and result payload
    pub async fn complete(
        &self,
        step_record_uuid: Uuid,
        notes: Option<String>,
        result: Option<ResultPayload>,
    ) -> Result<StepRecord> {
        self.transition(
            step_record_uuid,
            StepRecordEvent::complete_with(notes, result),
        )
        .await
    }

    /// `in_progress -> skipped`; the reason must not be empty
    pub async fn skip(&self, step_record_uuid: Uuid, reason: impl Into<String>) -> Result<StepRecord> {
        self.transition(step_record_uuid, StepRecordEvent::skip_because(reason))
            .await
    }

    /// `in_progress -> failed`; the reason must not be empty
    pub async fn fail(&self, step_record_uuid: Uuid, reason: impl Into<String>) -> Result<StepRecord> {
        self.transition(step_record_uuid, StepRecordEvent::fail_with(reason))
            .await
    }

    /// Attachment descriptors held by the attachment store for this record
    pub async fn attachments(&self, step_record_uuid: Uuid) -> Result<Vec<AttachmentDescriptor>> {
        self.get(step_record_uuid).await?;
        Ok(self.attachments.attachments_for(step_record_uuid).await?)
    }

    pub async fn history(&self, step_record_uuid: Uuid) -> Result<Vec<TransitionRecord>> {
        self.get(step_record_uuid).await?;
        Ok(self.store.transitions_for(step_record_uuid).await?)
    }

    #[instrument(skip_all, fields(step_record_uuid = %step_record_uuid, event = event.event_type()))]
    async fn transition(&self, step_record_uuid: Uuid, event: StepRecordEvent) -> Result<StepRecord> {
        StepRecordStateMachine::check_event(&event).map_err(|e| {
            TrackerError::from_state_machine(EntityKind::StepRecord, step_record_uuid, e)
        })?;

        let execution_uuid = self.get(step_record_uuid).await?.execution_uuid;
        let gate = self.locks.share_execution(execution_uuid).await?;
        let record_lock = self.locks.lock_record(step_record_uuid).await?;

        let record = self.get(step_record_uuid).await?;
        let execution = self.executions.get(execution_uuid).await?;
        if let Err(e) = ExecutionOpenGuard.check(&execution) {
            debug!(execution_status = %execution.status, "Step record change rejected: execution closed");
            drop(record_lock);
            drop(gate);
            self.executions.release_if_closed(&execution);
            return Err(TrackerError::from_state_machine(
                EntityKind::StepRecord,
                execution_uuid,
                e.into(),
            ));
        }

        let now = Utc::now();
        let updated = StepRecordStateMachine::apply(&record, &event, now).map_err(|e| {
            debug!(from_state = %record.status, error = %e, "Step record transition rejected");
            TrackerError::from_state_machine(EntityKind::StepRecord, step_record_uuid, e)
        })?;

        let from_state = record.status.to_string();
        let mut transition = NewTransition::new(
            EntityKind::StepRecord,
            step_record_uuid,
            Some(from_state.clone()),
            updated.status.to_string(),
            event.event_type(),
            now,
        );
        if let Some(reason) = updated.skip_reason.as_ref().or(updated.failure_reason.as_ref()) {
            transition = transition.with_metadata(json!({ "reason": reason }));
        }

        let committed = self
            .executions
            .commit_record_transition(updated, transition)
            .await?;

        info!(
            execution_uuid = %execution_uuid,
            from_state = %from_state,
            to_state = %committed.record.status,
            progress = committed.execution.progress,
            all_terminal = committed.snapshot.all_terminal,
            "Step record transitioned"
        );
        log_step_record_operation(
            event.event_type(),
            execution_uuid,
            step_record_uuid,
            &committed.record.status.to_string(),
            committed.record.skip_reason.as_deref().or(committed.record.failure_reason.as_deref()),
        );
        self.run_actions(&committed.record, from_state, event.event_type())
            .await;

        Ok(committed.record)
    }

    async fn run_actions(&self, record: &StepRecord, from_state: String, event: &str) {
        for action in &self.actions {
            if let Err(e) = action
                .execute(record, Some(from_state.clone()), record.status.to_string(), event)
                .await
            {
                warn!(
                    step_record_uuid = %record.step_record_uuid,
                    action = action.description(),
                    error = %e,
                    "Post-transition action failed"
                );
            }
        }
    }
}
