//! # Orchestration
//!
//! Stateful managers that apply the pure state machine rules to stored entities:
//!
//! - [`StepRecordManager`]: step record transitions
//! - [`ExecutionManager`]: execution status changes, creation and progress
//! - [`LockRegistry`]: per-execution and per-record serialization
//! - [`TrackerSystem`]: configuration-driven wiring of all of the above

pub mod bootstrap;
pub mod execution_manager;
pub mod locks;
pub mod step_record_manager;

pub use bootstrap::TrackerSystem;
pub use execution_manager::{ExecutionManager, RecordCommit};
pub use locks::LockRegistry;
pub use step_record_manager::StepRecordManager;
