use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::WorkflowDefinition;
use crate::state_machine::errors::PersistenceResult;

/// Where `ExecutionManager::create` resolves workflow definitions from
#[async_trait]
pub trait WorkflowDefinitionSource: Send + Sync {
    async fn find_definition(
        &self,
        workflow_uuid: Uuid,
    ) -> PersistenceResult<Option<WorkflowDefinition>>;
}

/// Concurrent in-process definition registry
#[derive(Debug, Default)]
pub struct InMemoryWorkflowRegistry {
    definitions: DashMap<Uuid, WorkflowDefinition>,
}

impl InMemoryWorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a definition, returning its workflow uuid
    pub fn register(&self, definition: WorkflowDefinition) -> Uuid {
        let workflow_uuid = definition.workflow_uuid;
        info!(
            workflow_uuid = %workflow_uuid,
            name = %definition.name,
            steps = definition.steps.len(),
            "Registered workflow definition"
        );
        self.definitions.insert(workflow_uuid, definition);
        workflow_uuid
    }

    pub fn unregister(&self, workflow_uuid: Uuid) -> Option<WorkflowDefinition> {
        self.definitions
            .remove(&workflow_uuid)
            .map(|(_, definition)| definition)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[async_trait]
impl WorkflowDefinitionSource for InMemoryWorkflowRegistry {
    async fn find_definition(
        &self,
        workflow_uuid: Uuid,
    ) -> PersistenceResult<Option<WorkflowDefinition>> {
        let found = self
            .definitions
            .get(&workflow_uuid)
            .map(|entry| entry.value().clone());
        debug!(workflow_uuid = %workflow_uuid, found = found.is_some(), "Resolved workflow definition");
        Ok(found)
    }
}
