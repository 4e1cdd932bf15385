//! Error types for configuration system.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Missing env var: {0}")]
    MissingEnvVar(String),
    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
    #[error("Invalid URL for {name}: {url}")]
    InvalidUrl { name: String, url: String },
    #[error("Invalid retry delays: max {max_ms}ms is below base {base_ms}ms")]
    InvalidRetryDelays { base_ms: u64, max_ms: u64 },
    #[error("Invalid timeout: {0}")]
    InvalidTimeout(u64),
}
