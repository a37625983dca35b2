//! Configuration Loader
//!
//! Environment-aware layered loading: defaults, base file, environment override
//! file, then `TRACKER__*` environment variables.

use config::{Config, Environment, File, FileFormat};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::error::ConfigResult;
use super::TrackerConfig;

/// Loaded configuration plus the context it was loaded from
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: TrackerConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    /// This is useful for testing without modifying global environment variables
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);

        debug!(
            environment = environment,
            config_directory = %config_directory.display(),
            "Loading tracker configuration"
        );

        let config = Self::build_config(&config_directory, environment)?;
        config.validate()?;

        debug!(
            config = %Self::sanitize_config_for_logging(&config),
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Wrap an already-built configuration (tests, embedding applications)
    pub fn from_config(config: TrackerConfig, environment: impl Into<String>) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            environment: environment.into(),
            config_directory: Self::default_config_directory(),
        })
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Configuration as JSON with credentials masked, safe to log
    pub fn debug_config(&self) -> serde_json::Value {
        Self::sanitize_config_for_logging(&self.config)
    }

    fn build_config(config_directory: &Path, environment: &str) -> ConfigResult<TrackerConfig> {
        let base_file = config_directory.join("tracker.toml");
        let environment_file = config_directory.join(format!("tracker.{environment}.toml"));

        let config = Config::builder()
            .add_source(Config::try_from(&TrackerConfig::default())?)
            .add_source(
                File::new(&base_file.to_string_lossy(), FileFormat::Toml).required(false),
            )
            .add_source(
                File::new(&environment_file.to_string_lossy(), FileFormat::Toml).required(false),
            )
            .add_source(
                Environment::with_prefix("TRACKER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize::<TrackerConfig>()?)
    }

    fn sanitize_config_for_logging(config: &TrackerConfig) -> serde_json::Value {
        let mut value = serde_json::to_value(config).unwrap_or(serde_json::Value::Null);
        if let Some(url) = value.pointer_mut("/database/url") {
            if !url.is_null() {
                *url = serde_json::Value::String("[REDACTED]".to_string());
            }
        }
        value
    }

    /// Environment name from `TRACKER_ENV`, then `APP_ENV`, defaulting to development
    pub fn detect_environment() -> String {
        env::var("TRACKER_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    /// `TRACKER_CONFIG_DIR` or `./config`
    fn default_config_directory() -> PathBuf {
        env::var("TRACKER_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"))
    }
}
