use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

use super::errors::ActionResult;
use super::states::{ExecutionState, StepRecordState};
use crate::constants::{execution_transition_event, step_record_transition_event};
use crate::events::publisher::EventPublisher;
use crate::models::{Execution, StepRecord};

/// Trait for implementing side effects that run after a transition commits
#[async_trait]
pub trait StateAction<T: Sync> {
    /// Execute the action
    async fn execute(
        &self,
        entity: &T,
        from_state: Option<String>,
        to_state: String,
        event: &str,
    ) -> ActionResult<()>;

    /// Get a description of this action for logging
    fn description(&self) -> &'static str;
}

/// Action to publish lifecycle events when state transitions occur
pub struct PublishTransitionEventAction {
    event_publisher: Arc<EventPublisher>,
}

impl PublishTransitionEventAction {
    pub fn new(event_publisher: Arc<EventPublisher>) -> Self {
        Self { event_publisher }
    }
}

#[async_trait]
impl StateAction<Execution> for PublishTransitionEventAction {
    async fn execute(
        &self,
        execution: &Execution,
        from_state: Option<String>,
        to_state: String,
        event: &str,
    ) -> ActionResult<()> {
        let from = from_state
            .as_deref()
            .and_then(|state| state.parse::<ExecutionState>().ok());
        let event_name = to_state
            .parse::<ExecutionState>()
            .ok()
            .and_then(|to| execution_transition_event(from, to));

        if let Some(event_name) = event_name {
            let context = build_execution_event_context(execution, &from_state, &to_state, event)?;
            self.event_publisher.publish(event_name, context).await;
        }

        Ok(())
    }

    fn description(&self) -> &'static str {
        "Publish lifecycle event for execution transition"
    }
}

#[async_trait]
impl StateAction<StepRecord> for PublishTransitionEventAction {
    async fn execute(
        &self,
        record: &StepRecord,
        from_state: Option<String>,
        to_state: String,
        event: &str,
    ) -> ActionResult<()> {
        let event_name = to_state
            .parse::<StepRecordState>()
            .ok()
            .and_then(step_record_transition_event);

        if let Some(event_name) = event_name {
            let context = build_step_record_event_context(record, &from_state, &to_state, event)?;
            self.event_publisher.publish(event_name, context).await;
        }

        Ok(())
    }

    fn description(&self) -> &'static str {
        "Publish lifecycle event for step record transition"
    }
}

/// Action to surface failures and cancellations in the logs
pub struct FailureLoggingAction;

#[async_trait]
impl StateAction<StepRecord> for FailureLoggingAction {
    async fn execute(
        &self,
        record: &StepRecord,
        _from_state: Option<String>,
        to_state: String,
        _event: &str,
    ) -> ActionResult<()> {
        if to_state == StepRecordState::Failed.to_string() {
            tracing::warn!(
                step_record_uuid = %record.step_record_uuid,
                execution_uuid = %record.execution_uuid,
                failure_reason = record.failure_reason.as_deref(),
                "Step record transitioned to failed state"
            );
        }

        Ok(())
    }

    fn description(&self) -> &'static str {
        "Log failed step records"
    }
}

#[async_trait]
impl StateAction<Execution> for FailureLoggingAction {
    async fn execute(
        &self,
        execution: &Execution,
        from_state: Option<String>,
        to_state: String,
        _event: &str,
    ) -> ActionResult<()> {
        if to_state == ExecutionState::Cancelled.to_string() {
            tracing::warn!(
                execution_uuid = %execution.execution_uuid,
                from_state = from_state.as_deref(),
                progress = execution.progress,
                "Execution cancelled"
            );
        }

        Ok(())
    }

    fn description(&self) -> &'static str {
        "Log cancelled executions"
    }
}

// Helper functions for event payloads; each carries a snapshot of the committed entity

fn build_execution_event_context(
    execution: &Execution,
    from_state: &Option<String>,
    to_state: &str,
    event: &str,
) -> ActionResult<Value> {
    Ok(serde_json::json!({
        "execution_uuid": execution.execution_uuid,
        "workflow_uuid": execution.workflow_uuid,
        "from_state": from_state,
        "to_state": to_state,
        "event": event,
        "progress": execution.progress,
        "execution": serde_json::to_value(execution)?,
        "transitioned_at": Utc::now(),
    }))
}

fn build_step_record_event_context(
    record: &StepRecord,
    from_state: &Option<String>,
    to_state: &str,
    event: &str,
) -> ActionResult<Value> {
    Ok(serde_json::json!({
        "execution_uuid": record.execution_uuid,
        "step_record_uuid": record.step_record_uuid,
        "step_uuid": record.step_uuid,
        "from_state": from_state,
        "to_state": to_state,
        "event": event,
        "reason": record.skip_reason.as_ref().or(record.failure_reason.as_ref()),
        "step_record": serde_json::to_value(record)?,
        "transitioned_at": Utc::now(),
    }))
}
