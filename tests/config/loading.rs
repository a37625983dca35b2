use std::fs;
use tempfile::TempDir;

use execution_tracker::config::{ConfigManager, ConfigurationError, TrackerConfig};
use execution_tracker::TrackerSystem;

#[test]
fn test_shipped_configuration_files_load() {
    let config_dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("config");

    for environment in ["development", "test", "production"] {
        let manager =
            ConfigManager::load_from_directory_with_env(Some(config_dir.clone()), environment)
                .unwrap_or_else(|e| panic!("{environment} failed to load: {e}"));
        assert!(manager.config().validate().is_ok());
    }

    let production =
        ConfigManager::load_from_directory_with_env(Some(config_dir), "production").unwrap();
    assert!(production.config().logging.json);
    assert_eq!(production.config().events.channel_capacity, 10_000);
}

#[test]
fn test_invalid_override_is_a_configuration_error() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("tracker.broken.toml"),
        "[database]\nmax_connections = 0\n",
    )
    .unwrap();

    let err = ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "broken")
        .unwrap_err();
    assert!(matches!(err, ConfigurationError::InvalidValue { .. }));
}

#[tokio::test]
async fn test_system_bootstraps_from_loaded_configuration() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("tracker.toml"),
        "[locking]\nacquire_timeout_ms = 750\n",
    )
    .unwrap();

    let manager =
        ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test").unwrap();
    let system = TrackerSystem::from_config_manager(&manager).unwrap();

    assert_eq!(system.config().locking.acquire_timeout_ms, 750);
    assert_eq!(
        system.locks().acquire_timeout(),
        std::time::Duration::from_millis(750)
    );
    assert_eq!(system.config().events, TrackerConfig::default().events);
}
