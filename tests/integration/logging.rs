//! File logging through the environment.
//!
//! The global logger can be installed once per process, so every check that
//! needs an installed logger lives in a single test.
use chrono::Utc;
use lazy_static::lazy_static;
use sponsored_relay::logging::{log_file_path, setup_logging, LoggingError};
use std::{env, fs, sync::Mutex};
use tempfile::TempDir;

lazy_static! {
    static ref ENV_MUTEX: Mutex<()> = Mutex::new(());
}

#[test]
fn test_setup_logging_file_mode_writes_dated_file() {
    let _guard = ENV_MUTEX
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_dir = temp_dir.path().join("logs");

    env::remove_var("LOG_MAX_SIZE");
    env::set_var("LOG_MODE", "file");
    env::set_var("LOG_LEVEL", "debug");
    env::set_var("LOG_DATA_DIR", &log_dir);

    setup_logging().expect("first setup must succeed");
    log::info!("sponsored relay logging check");

    let date_str = Utc::now().format("%Y-%m-%d").to_string();
    let expected = log_file_path(&log_dir, &date_str, 0);
    let contents = fs::read_to_string(&expected)
        .unwrap_or_else(|e| panic!("Expected log file {}: {}", expected.display(), e));
    assert!(contents.contains("sponsored relay logging check"));

    assert!(matches!(
        setup_logging(),
        Err(LoggingError::AlreadyInitialized(_))
    ));

    env::remove_var("LOG_MODE");
    env::remove_var("LOG_LEVEL");
    env::remove_var("LOG_DATA_DIR");
}

#[test]
fn test_setup_logging_rejects_invalid_max_size() {
    let _guard = ENV_MUTEX
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    env::set_var("LOG_MODE", "file");
    env::set_var("LOG_DATA_DIR", temp_dir.path());
    env::set_var("LOG_MAX_SIZE", "invalid_value");

    assert!(matches!(
        setup_logging(),
        Err(LoggingError::InvalidSetting(..))
    ));

    env::remove_var("LOG_MODE");
    env::remove_var("LOG_DATA_DIR");
    env::remove_var("LOG_MAX_SIZE");
}
