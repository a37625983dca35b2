//! # Workflow Definition Registry
//!
//! Lookup of workflow definitions by uuid. Executions are instantiated from a
//! definition exactly once, at creation; later edits to the definition never reach
//! existing executions.
//!
//! ## Usage
//!
//! ```rust
//! use execution_tracker::models::WorkflowDefinition;
//! use execution_tracker::registry::{InMemoryWorkflowRegistry, WorkflowDefinitionSource};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = InMemoryWorkflowRegistry::new();
//! let definition = WorkflowDefinition::new("onboarding", ["collect", "review"]);
//! let workflow_uuid = registry.register(definition);
//!
//! let found = registry.find_definition(workflow_uuid).await?;
//! assert!(found.is_some());
//! # Ok(())
//! # }
//! ```

pub mod workflow_registry;

pub use workflow_registry::{InMemoryWorkflowRegistry, WorkflowDefinitionSource};
