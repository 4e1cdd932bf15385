//! Configuration for the sponsored relay client.
//!
//! This module handles:
//! - Reading settings from environment variables (after `.env` is loaded)
//! - Validating URLs, numbers and enumerated settings
//! - Converting the result into the engine's [`RelayEngineConfig`]
//!
//! [`RelayEngineConfig`]: crate::domain::RelayEngineConfig
mod client_config;
pub use client_config::*;

mod error;
pub use error::*;
