//! Data entities tracked by the execution engine.

pub mod attachment;
pub mod execution;
pub mod execution_context;
pub mod result_payload;
pub mod step_record;
pub mod transition;
pub mod workflow_definition;

// Re-export models for easy access
pub use attachment::AttachmentDescriptor;
pub use execution::Execution;
pub use execution_context::ExecutionContext;
pub use result_payload::{InvalidPayload, ResultPayload};
pub use step_record::StepRecord;
pub use transition::{EntityKind, NewTransition, TransitionRecord};
pub use workflow_definition::{StepDefinition, WorkflowDefinition};
