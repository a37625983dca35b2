//! # Tracker Bootstrap
//!
//! Wires configuration, storage, collaborators and both managers into one handle.
//!
//! ```rust
//! use execution_tracker::config::TrackerConfig;
//! use execution_tracker::models::WorkflowDefinition;
//! use execution_tracker::orchestration::TrackerSystem;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let system = TrackerSystem::in_memory(TrackerConfig::default())?;
//! let workflow = system
//!     .workflows()
//!     .register(WorkflowDefinition::new("onboarding", ["collect", "review"]));
//!
//! let execution = system.executions().create(workflow).await?;
//! system.executions().start(execution.execution_uuid).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use tracing::info;

use super::execution_manager::ExecutionManager;
use super::locks::LockRegistry;
use super::step_record_manager::StepRecordManager;
use crate::config::{ConfigManager, TrackerConfig};
use crate::error::Result;
use crate::events::EventPublisher;
use crate::persistence::{ExecutionStore, MemoryExecutionStore};
use crate::registry::{InMemoryWorkflowRegistry, WorkflowDefinitionSource};
use crate::services::{AttachmentStore, InMemoryAttachmentStore};

/// Fully wired tracker
#[derive(Debug)]
pub struct TrackerSystem {
    config: TrackerConfig,
    executions: Arc<ExecutionManager>,
    step_records: Arc<StepRecordManager>,
    event_publisher: Arc<EventPublisher>,
    locks: Arc<LockRegistry>,
    workflows: Arc<InMemoryWorkflowRegistry>,
    attachments: Arc<InMemoryAttachmentStore>,
}

impl TrackerSystem {
    /// Build a tracker over arbitrary collaborators
    pub fn with_components(
        config: TrackerConfig,
        store: Arc<dyn ExecutionStore>,
        definitions: Arc<dyn WorkflowDefinitionSource>,
        attachments: Arc<dyn AttachmentStore>,
    ) -> Result<Self> {
        Self::assemble(
            config,
            store,
            definitions,
            attachments,
            Arc::new(InMemoryWorkflowRegistry::new()),
            Arc::new(InMemoryAttachmentStore::new()),
        )
    }

    /// Tracker backed by process-local storage and in-memory collaborators
    pub fn in_memory(config: TrackerConfig) -> Result<Self> {
        let workflows = Arc::new(InMemoryWorkflowRegistry::new());
        let attachments = Arc::new(InMemoryAttachmentStore::new());
        Self::assemble(
            config,
            Arc::new(MemoryExecutionStore::new()),
            workflows.clone(),
            attachments.clone(),
            workflows,
            attachments,
        )
    }

    /// Tracker from layered configuration files and environment
    pub fn from_config_manager(manager: &ConfigManager) -> Result<Self> {
        info!(environment = manager.environment(), "Bootstrapping tracker");
        Self::in_memory(manager.config().clone())
    }

    /// Tracker backed by postgres, running migrations first
    #[cfg(feature = "postgres")]
    pub async fn postgres(config: TrackerConfig) -> Result<Self> {
        let store = crate::persistence::PgExecutionStore::connect(&config.database).await?;
        store.migrate().await?;

        let workflows = Arc::new(InMemoryWorkflowRegistry::new());
        let attachments = Arc::new(InMemoryAttachmentStore::new());
        Self::assemble(
            config,
            Arc::new(store),
            workflows.clone(),
            attachments.clone(),
            workflows,
            attachments,
        )
    }

    fn assemble(
        config: TrackerConfig,
        store: Arc<dyn ExecutionStore>,
        definitions: Arc<dyn WorkflowDefinitionSource>,
        attachment_store: Arc<dyn AttachmentStore>,
        workflows: Arc<InMemoryWorkflowRegistry>,
        attachments: Arc<InMemoryAttachmentStore>,
    ) -> Result<Self> {
        config.validate()?;

        let locks = Arc::new(LockRegistry::from_config(&config.locking));
        let event_publisher = Arc::new(EventPublisher::from_config(&config.events));

        let executions = Arc::new(ExecutionManager::new(
            store.clone(),
            definitions,
            locks.clone(),
            event_publisher.clone(),
        ));
        let step_records = Arc::new(StepRecordManager::new(
            store,
            attachment_store,
            executions.clone(),
            locks.clone(),
            event_publisher.clone(),
        ));

        info!(
            lock_timeout_ms = config.locking.acquire_timeout_ms,
            event_capacity = config.events.channel_capacity,
            "Tracker system assembled"
        );

        Ok(Self {
            config,
            executions,
            step_records,
            event_publisher,
            locks,
            workflows,
            attachments,
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn executions(&self) -> &Arc<ExecutionManager> {
        &self.executions
    }

    pub fn step_records(&self) -> &Arc<StepRecordManager> {
        &self.step_records
    }

    pub fn events(&self) -> &Arc<EventPublisher> {
        &self.event_publisher
    }

    pub fn locks(&self) -> &Arc<LockRegistry> {
        &self.locks
    }

    /// Built-in workflow registry (only consulted when the tracker was built with it)
    pub fn workflows(&self) -> &Arc<InMemoryWorkflowRegistry> {
        &self.workflows
    }

    /// Built-in attachment index (only consulted when the tracker was built with it)
    pub fn attachments(&self) -> &Arc<InMemoryAttachmentStore> {
        &self.attachments
    }
}
