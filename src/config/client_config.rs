//! Configuration for the relay client, read from the environment.
use std::{env, fmt::Display, str::FromStr, time::Duration};

use crate::{
    constants::{
        DEFAULT_COMPUTE_UNIT_LIMIT, DEFAULT_COMPUTE_UNIT_PRICE,
        DEFAULT_CONFIRMATION_POLL_INTERVAL_MS, DEFAULT_CONFIRMATION_TIMEOUT_MS,
        DEFAULT_NEGOTIATION_MAX_ATTEMPTS, DEFAULT_QUOTE_MAX_RETRIES,
        DEFAULT_QUOTE_RETRY_BASE_DELAY_MS, DEFAULT_QUOTE_RETRY_MAX_DELAY_MS,
        DEFAULT_RPC_TIMEOUT_MS,
    },
    domain::{ComputeBudget, FreshnessSource, NegotiationPolicy, RelayEngineConfig},
    models::{CommitmentLevel, ConfirmOptions},
    services::RetryConfig,
};

use super::ConfigError;

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the Relayer Service.
    pub relayer_url: String,
    /// Ledger RPC URL.
    pub rpc_url: String,
    /// Keypair file of the local wallet. Only the CLI needs it.
    pub wallet_keypair_path: Option<String>,
    pub rpc_timeout_ms: u64,
    pub commitment: CommitmentLevel,
    /// 0 disables the compute-unit-limit instruction.
    pub compute_unit_limit: u32,
    /// Micro-lamports per compute unit; 0 disables the instruction.
    pub compute_unit_price: u64,
    pub quote_max_retries: u8,
    pub quote_retry_base_delay_ms: u64,
    pub quote_retry_max_delay_ms: u64,
    pub negotiation_max_attempts: u8,
    pub max_fee_amount: Option<u64>,
    pub freshness_source: FreshnessSource,
    pub confirmation_poll_interval_ms: u64,
    pub confirmation_timeout_ms: u64,
    pub skip_preflight: bool,
}

fn required_url(name: &str) -> Result<String, ConfigError> {
    let url = env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))?;
    let url = url.trim().to_string();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::InvalidUrl {
            name: name.to_string(),
            url,
        });
    }
    Ok(url)
}

fn parse_or<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => parse_value(name, &value),
        _ => Ok(default),
    }
}

fn parse_value<T>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue {
            name: name.to_string(),
            reason: format!("'{}': {}", value, e),
        })
}

fn parse_optional<T>(name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => parse_value(name, &value).map(Some),
        _ => Ok(None),
    }
}

impl ClientConfig {
    /// Creates a new `ClientConfig` from environment variables.
    ///
    /// `RELAYER_URL` and `SOLANA_RPC_URL` are required; every other setting
    /// has a default. Unparseable values are errors rather than silently
    /// replaced by defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            relayer_url: required_url("RELAYER_URL")?,
            rpc_url: required_url("SOLANA_RPC_URL")?,
            wallet_keypair_path: env::var("WALLET_KEYPAIR_PATH")
                .ok()
                .filter(|path| !path.trim().is_empty()),
            rpc_timeout_ms: parse_or("RPC_TIMEOUT_MS", DEFAULT_RPC_TIMEOUT_MS)?,
            commitment: parse_or("COMMITMENT", CommitmentLevel::default())?,
            compute_unit_limit: parse_or("COMPUTE_UNIT_LIMIT", DEFAULT_COMPUTE_UNIT_LIMIT)?,
            compute_unit_price: parse_or("COMPUTE_UNIT_PRICE", DEFAULT_COMPUTE_UNIT_PRICE)?,
            quote_max_retries: parse_or("QUOTE_MAX_RETRIES", DEFAULT_QUOTE_MAX_RETRIES)?,
            quote_retry_base_delay_ms: parse_or(
                "QUOTE_RETRY_BASE_DELAY_MS",
                DEFAULT_QUOTE_RETRY_BASE_DELAY_MS,
            )?,
            quote_retry_max_delay_ms: parse_or(
                "QUOTE_RETRY_MAX_DELAY_MS",
                DEFAULT_QUOTE_RETRY_MAX_DELAY_MS,
            )?,
            negotiation_max_attempts: parse_or(
                "NEGOTIATION_MAX_ATTEMPTS",
                DEFAULT_NEGOTIATION_MAX_ATTEMPTS,
            )?,
            max_fee_amount: parse_optional("MAX_FEE_AMOUNT")?,
            freshness_source: parse_or("FRESHNESS_SOURCE", FreshnessSource::default())?,
            confirmation_poll_interval_ms: parse_or(
                "CONFIRMATION_POLL_INTERVAL_MS",
                DEFAULT_CONFIRMATION_POLL_INTERVAL_MS,
            )?,
            confirmation_timeout_ms: parse_or(
                "CONFIRMATION_TIMEOUT_MS",
                DEFAULT_CONFIRMATION_TIMEOUT_MS,
            )?,
            skip_preflight: env::var("SKIP_PREFLIGHT")
                .map(|v| v.trim().to_lowercase() == "true")
                .unwrap_or(false),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quote_retry_max_delay_ms < self.quote_retry_base_delay_ms {
            return Err(ConfigError::InvalidRetryDelays {
                base_ms: self.quote_retry_base_delay_ms,
                max_ms: self.quote_retry_max_delay_ms,
            });
        }
        if self.rpc_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout(self.rpc_timeout_ms));
        }
        if self.confirmation_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout(self.confirmation_timeout_ms));
        }
        if self.negotiation_max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                name: "NEGOTIATION_MAX_ATTEMPTS".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    pub fn engine_config(&self) -> RelayEngineConfig {
        RelayEngineConfig {
            compute_budget: ComputeBudget::new(self.compute_unit_limit, self.compute_unit_price),
            negotiation: NegotiationPolicy {
                retry: RetryConfig::new(
                    self.quote_max_retries,
                    self.quote_retry_base_delay_ms,
                    self.quote_retry_max_delay_ms,
                ),
                max_attempts: self.negotiation_max_attempts,
                max_fee_amount: self.max_fee_amount,
                freshness_source: self.freshness_source,
            },
            confirm: ConfirmOptions {
                commitment: self.commitment,
                timeout: Duration::from_millis(self.confirmation_timeout_ms),
                poll_interval: Duration::from_millis(self.confirmation_poll_interval_ms),
            },
        }
    }
}
