#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Execution Tracker
//!
//! State machine and progress aggregation core for tracking multi-step workflow
//! executions.
//!
//! ## Overview
//!
//! An **execution** is one run of a workflow definition. It owns an ordered set of
//! **step records**, one per step, each moving through its own lifecycle
//! (`pending -> in_progress -> completed | skipped | failed`). The execution moves
//! through `pending -> in_progress <-> paused -> completed | cancelled`, and its
//! `progress` is derived from its records, never set directly.
//!
//! ## Module Organization
//!
//! - [`state_machine`] - Status enums, transition tables, guards, actions and the
//!   progress calculator. Pure; no storage access.
//! - [`models`] - Executions, step records, result payloads, transitions
//! - [`orchestration`] - `StepRecordManager`, `ExecutionManager`, locking, bootstrap
//! - [`persistence`] - `ExecutionStore` boundary with memory and postgres backends
//! - [`registry`] - Workflow definition lookup
//! - [`services`] - Attachment lookup
//! - [`events`] - Lifecycle event broadcast
//! - [`config`] - Layered configuration
//! - [`error`] - Structured error handling
//!
//! ## Guarantees
//!
//! - Every transition is validated in full before anything is written; a rejected
//!   call leaves state unchanged and returns a typed [`TrackerError`].
//! - A step record transition and the owning execution's progress are committed in
//!   one atomic write.
//! - Status changes on one execution are serialized; two concurrent terminal
//!   transitions on the same step record never both succeed.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use execution_tracker::config::TrackerConfig;
//! use execution_tracker::models::WorkflowDefinition;
//! use execution_tracker::orchestration::TrackerSystem;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let system = TrackerSystem::in_memory(TrackerConfig::default())?;
//! let workflow = system
//!     .workflows()
//!     .register(WorkflowDefinition::new("kyc", ["identify", "verify", "approve"]));
//!
//! let execution = system.executions().create(workflow).await?;
//! let first = execution.record_uuids[0];
//!
//! system.step_records().start(first).await?;
//! system.step_records().complete(first, Some("ok".into()), None).await?;
//!
//! let execution = system.executions().get(execution.execution_uuid).await?;
//! assert_eq!(execution.progress, 33);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod persistence;
pub mod registry;
pub mod services;
pub mod state_machine;

pub use config::{ConfigManager, TrackerConfig};
pub use constants::{status_groups, system, ExecutionStatus, StepRecordStatus};
// Re-export constants events with different name to avoid conflict
pub use constants::events as lifecycle_events;
pub use error::{Result, TrackerError};
pub use events::{EventPublisher, PublishedEvent};
pub use models::{
    AttachmentDescriptor, Execution, ExecutionContext, ResultPayload, StepRecord,
    TransitionRecord, WorkflowDefinition,
};
pub use orchestration::{ExecutionManager, LockRegistry, StepRecordManager, TrackerSystem};
pub use persistence::{ChangeSet, ExecutionFilter, ExecutionStore, MemoryExecutionStore};
pub use state_machine::{ProgressCalculator, ProgressSnapshot};
