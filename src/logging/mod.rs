//! ## Sets up logging by reading configuration from environment variables.
//!
//! Environment variables used:
//! - LOG_MODE: "stdout" (default) or "file"
//! - LOG_LEVEL: log level ("trace", "debug", "info", "warn", "error"); default is "info"
//! - LOG_DATA_DIR: directory for log files in file mode (default "./logs")
//! - LOG_MAX_SIZE: size in bytes after which a new file is started (default 1GB)
//!
//! File mode writes to `<LOG_DATA_DIR>/relay-<YYYY-MM-DD>.log`, continuing with
//! `relay-<YYYY-MM-DD>.1.log`, `.2.log`, ... once a file exceeds LOG_MAX_SIZE.
use chrono::Utc;
use log::info;
use simplelog::{Config, LevelFilter, SimpleLogger, WriteLogger};
use std::{
    env,
    fs::{create_dir_all, metadata, OpenOptions},
    path::{Path, PathBuf},
};
use thiserror::Error;

const LOG_FILE_PREFIX: &str = "relay";
const DEFAULT_LOG_MAX_SIZE: u64 = 1_073_741_824;

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid logging setting {0}: {1}")]
    InvalidSetting(String, String),
    #[error("Log file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Logger already initialized: {0}")]
    AlreadyInitialized(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogMode {
    Stdout,
    File { dir: PathBuf, max_size: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub mode: LogMode,
    pub level: LevelFilter,
}

impl LoggingConfig {
    pub fn from_env() -> Result<Self, LoggingError> {
        let log_mode = env::var("LOG_MODE").unwrap_or_else(|_| "stdout".to_string());
        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let level = match log_level.to_lowercase().as_str() {
            "trace" => LevelFilter::Trace,
            "debug" => LevelFilter::Debug,
            "info" => LevelFilter::Info,
            "warn" => LevelFilter::Warn,
            "error" => LevelFilter::Error,
            _ => LevelFilter::Info,
        };

        let mode = match log_mode.to_lowercase().as_str() {
            "file" => {
                let dir = env::var("LOG_DATA_DIR").unwrap_or_else(|_| "./logs".to_string());
                let max_size = match env::var("LOG_MAX_SIZE") {
                    Ok(value) => value.parse::<u64>().map_err(|e| {
                        LoggingError::InvalidSetting("LOG_MAX_SIZE".to_string(), e.to_string())
                    })?,
                    Err(_) => DEFAULT_LOG_MAX_SIZE,
                };
                LogMode::File {
                    dir: PathBuf::from(dir),
                    max_size,
                }
            }
            "stdout" => LogMode::Stdout,
            other => {
                return Err(LoggingError::InvalidSetting(
                    "LOG_MODE".to_string(),
                    format!("unknown mode '{}'", other),
                ))
            }
        };

        Ok(Self { mode, level })
    }
}

/// Path of the `index`-th log file for `date_str`; index 0 is the unnumbered file.
pub fn log_file_path(dir: &Path, date_str: &str, index: u32) -> PathBuf {
    if index == 0 {
        dir.join(format!("{}-{}.log", LOG_FILE_PREFIX, date_str))
    } else {
        dir.join(format!("{}-{}.{}.log", LOG_FILE_PREFIX, date_str, index))
    }
}

/// First log file for `date_str` that does not exceed `max_size` bytes.
pub fn space_based_rolling(dir: &Path, date_str: &str, max_size: u64) -> PathBuf {
    let mut index = 0;
    let mut path = log_file_path(dir, date_str, index);
    while let Ok(metadata) = metadata(&path) {
        if metadata.len() > max_size {
            index += 1;
            path = log_file_path(dir, date_str, index);
        } else {
            break;
        }
    }
    path
}

/// Installs the global logger described by `config`.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    match &config.mode {
        LogMode::File { dir, max_size } => {
            create_dir_all(dir)?;
            let date_str = Utc::now().format("%Y-%m-%d").to_string();
            let path = space_based_rolling(dir, &date_str, *max_size);
            let log_file = OpenOptions::new().create(true).append(true).open(&path)?;
            WriteLogger::init(config.level, Config::default(), log_file)
                .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;
            info!("Logging to file {}", path.display());
        }
        LogMode::Stdout => {
            SimpleLogger::init(config.level, Config::default())
                .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;
        }
    }
    info!("Logging is successfully configured (level: {})", config.level);
    Ok(())
}

/// Sets up logging by reading configuration from environment variables.
pub fn setup_logging() -> Result<(), LoggingError> {
    init_logging(&LoggingConfig::from_env()?)
}
