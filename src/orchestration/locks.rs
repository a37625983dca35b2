//! # Lock Registry
//!
//! Keyed async locks that serialize work on one execution and its step records.
//!
//! - **Execution gate** (`RwLock` per execution): status changes (`pause`, `resume`,
//!   `complete`, `cancel`, `start`) take it exclusively; step record transitions and
//!   progress recomputation take it shared. A status change therefore never
//!   interleaves with a record transition on the same execution.
//! - **Record lock** (`Mutex` per step record): at most one transition per record
//!   is evaluated at a time.
//! - **Progress lock** (`Mutex` per execution): progress is recomputed and written
//!   by one caller at a time, over a consistent record snapshot.
//!
//! Acquisition order is always gate, then record, then progress. Every wait is
//! bounded by `locking.acquire_timeout_ms`; expiry returns `LockTimeout` without
//! touching state.
//!
//! Entries are created on first use and dropped by `release_execution` once the
//! execution is completed or cancelled, so the maps only hold open executions.

use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard, OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::LockingConfig;
use crate::error::{Result, TrackerError};

const EXECUTION_RESOURCE: &str = "execution";
const RECORD_RESOURCE: &str = "step_record";
const PROGRESS_RESOURCE: &str = "execution_progress";

#[derive(Debug)]
pub struct LockRegistry {
    execution_gates: DashMap<Uuid, Arc<RwLock<()>>>,
    record_locks: DashMap<Uuid, Arc<Mutex<()>>>,
    progress_locks: DashMap<Uuid, Arc<Mutex<()>>>,
    acquire_timeout: Duration,
}

impl LockRegistry {
    pub fn new(acquire_timeout: Duration) -> Self {
        Self {
            execution_gates: DashMap::new(),
            record_locks: DashMap::new(),
            progress_locks: DashMap::new(),
            acquire_timeout,
        }
    }

    pub fn from_config(config: &LockingConfig) -> Self {
        Self::new(config.acquire_timeout())
    }

    pub fn acquire_timeout(&self) -> Duration {
        self.acquire_timeout
    }

    /// Exclusive hold on an execution, for status changes
    pub async fn lock_execution(&self, execution_uuid: Uuid) -> Result<OwnedRwLockWriteGuard<()>> {
        let gate = self.gate(execution_uuid);
        self.bounded(EXECUTION_RESOURCE, execution_uuid, gate.write_owned())
            .await
    }

    /// Shared hold on an execution, for record transitions and progress reads
    pub async fn share_execution(&self, execution_uuid: Uuid) -> Result<OwnedRwLockReadGuard<()>> {
        let gate = self.gate(execution_uuid);
        self.bounded(EXECUTION_RESOURCE, execution_uuid, gate.read_owned())
            .await
    }

    pub async fn lock_record(&self, step_record_uuid: Uuid) -> Result<OwnedMutexGuard<()>> {
        let lock = self
            .record_locks
            .entry(step_record_uuid)
            .or_default()
            .clone();
        self.bounded(RECORD_RESOURCE, step_record_uuid, lock.lock_owned())
            .await
    }

    pub async fn lock_progress(&self, execution_uuid: Uuid) -> Result<OwnedMutexGuard<()>> {
        let lock = self
            .progress_locks
            .entry(execution_uuid)
            .or_default()
            .clone();
        self.bounded(PROGRESS_RESOURCE, execution_uuid, lock.lock_owned())
            .await
    }

    /// Forget the entries of a closed execution and its records
    ///
    /// Entries still held or awaited stay; their holders call this again after
    /// observing the closed execution.
    pub fn release_execution(&self, execution_uuid: Uuid, record_uuids: &[Uuid]) -> usize {
        let mut removed = 0;
        if self
            .execution_gates
            .remove_if(&execution_uuid, |_, gate| Arc::strong_count(gate) == 1)
            .is_some()
        {
            removed += 1;
        }
        if self
            .progress_locks
            .remove_if(&execution_uuid, |_, lock| Arc::strong_count(lock) == 1)
            .is_some()
        {
            removed += 1;
        }
        for record_uuid in record_uuids {
            if self
                .record_locks
                .remove_if(record_uuid, |_, lock| Arc::strong_count(lock) == 1)
                .is_some()
            {
                removed += 1;
            }
        }

        debug!(execution_uuid = %execution_uuid, removed, "Released lock entries");
        removed
    }

    /// Number of lock entries currently tracked
    pub fn len(&self) -> usize {
        self.execution_gates.len() + self.record_locks.len() + self.progress_locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn gate(&self, execution_uuid: Uuid) -> Arc<RwLock<()>> {
        self.execution_gates
            .entry(execution_uuid)
            .or_default()
            .clone()
    }

    async fn bounded<G>(
        &self,
        resource: &'static str,
        uuid: Uuid,
        acquire: impl Future<Output = G>,
    ) -> Result<G> {
        tokio::time::timeout(self.acquire_timeout, acquire)
            .await
            .map_err(|_| {
                warn!(
                    resource,
                    uuid = %uuid,
                    timeout_ms = self.acquire_timeout.as_millis() as u64,
                    "Lock acquisition timed out"
                );
                TrackerError::LockTimeout { resource, uuid }
            })
    }
}

impl Default for LockRegistry {
    fn default() -> Self {
        Self::from_config(&LockingConfig::default())
    }
}
