//! # Tracker Configuration
//!
//! Layered configuration for the execution tracker, loaded with the `config` crate:
//!
//! 1. Built-in defaults (`TrackerConfig::default()`)
//! 2. `config/tracker.toml`
//! 3. `config/tracker.<environment>.toml`
//! 4. Environment variables prefixed `TRACKER__` (e.g. `TRACKER__LOCKING__ACQUIRE_TIMEOUT_MS`)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use execution_tracker::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let timeout = manager.config().locking.acquire_timeout();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring `config/tracker.toml`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct TrackerConfig {
    /// Lock acquisition limits for per-record and per-execution serialization
    #[serde(default)]
    pub locking: LockingConfig,

    /// Lifecycle event channel settings
    #[serde(default)]
    pub events: EventsConfig,

    /// Postgres connection settings (used by the postgres store only)
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LockingConfig {
    /// Upper bound on waiting for an execution or step record lock
    pub acquire_timeout_ms: u64,
}

impl LockingConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}

impl Default for LockingConfig {
    fn default() -> Self {
        Self {
            acquire_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EventsConfig {
    pub channel_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
}

impl DatabaseConfig {
    /// Explicit url, falling back to `DATABASE_URL`
    pub fn database_url(&self) -> Option<String> {
        self.url
            .clone()
            .or_else(|| std::env::var("DATABASE_URL").ok())
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_seconds)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            acquire_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `execution_tracker=debug`
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl TrackerConfig {
    /// Reject values that would make the tracker unusable
    pub fn validate(&self) -> ConfigResult<()> {
        if self.locking.acquire_timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "locking.acquire_timeout_ms",
                0,
                "lock acquisition timeout must be greater than 0",
            ));
        }

        if self.events.channel_capacity == 0 {
            return Err(ConfigurationError::invalid_value(
                "events.channel_capacity",
                0,
                "event channel capacity must be greater than 0",
            ));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigurationError::invalid_value(
                "database.max_connections",
                0,
                "pool size must be greater than 0",
            ));
        }

        if self.logging.level.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "logging.level",
                "logging configuration",
            ));
        }

        Ok(())
    }
}
