use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use execution_tracker::config::TrackerConfig;
use execution_tracker::models::{Execution, WorkflowDefinition};
use execution_tracker::persistence::{ExecutionStore, MemoryExecutionStore};
use execution_tracker::registry::InMemoryWorkflowRegistry;
use execution_tracker::services::InMemoryAttachmentStore;
use execution_tracker::TrackerSystem;

use super::failing_store::FailingStore;

/// Tracker wired over a fault-injectable store, plus one registered workflow
pub struct TestTracker {
    pub system: TrackerSystem,
    pub store: Arc<FailingStore>,
    pub registry: Arc<InMemoryWorkflowRegistry>,
    pub attachments: Arc<InMemoryAttachmentStore>,
}

impl TestTracker {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: TrackerConfig) -> Self {
        let store = Arc::new(FailingStore::new(MemoryExecutionStore::new()));
        let registry = Arc::new(InMemoryWorkflowRegistry::new());
        let attachments = Arc::new(InMemoryAttachmentStore::new());

        let system = TrackerSystem::with_components(
            config,
            store.clone() as Arc<dyn ExecutionStore>,
            registry.clone(),
            attachments.clone(),
        )
        .expect("valid test configuration");

        Self {
            system,
            store,
            registry,
            attachments,
        }
    }

    pub fn register<S: Into<String>>(&self, steps: impl IntoIterator<Item = S>) -> Uuid {
        self.registry
            .register(WorkflowDefinition::new("test_workflow", steps))
    }

    /// Create an execution with `step_count` pending records
    pub async fn execution_with_steps(&self, step_count: usize) -> Execution {
        let steps: Vec<String> = (1..=step_count).map(|i| format!("step_{i}")).collect();
        let workflow = self.register(steps);
        self.system
            .executions()
            .create(workflow)
            .await
            .expect("execution created")
    }

    /// Create an execution and start it along with every record
    pub async fn started_execution(&self, step_count: usize) -> Execution {
        let execution = self.execution_with_steps(step_count).await;
        self.system
            .executions()
            .start(execution.execution_uuid)
            .await
            .expect("execution started");
        for record in &execution.record_uuids {
            self.system
                .step_records()
                .start(*record)
                .await
                .expect("record started");
        }
        execution
    }
}

pub fn test_config() -> TrackerConfig {
    let mut config = TrackerConfig::default();
    config.locking.acquire_timeout_ms = Duration::from_secs(2).as_millis() as u64;
    config.events.channel_capacity = 256;
    config
}
