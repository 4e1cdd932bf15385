//! # Retry Module
//!
//! Retries fallible async operations with exponential backoff and jitter.
//!
//! - [`RetryConfig`]: retry count and delay bounds
//! - [`retry_with_backoff`]: runs an operation, retrying only retriable errors
//! - [`calculate_retry_delay`]: delay for a given attempt
use rand::Rng;
use std::future::Future;
use std::time::Duration;

use crate::constants::{
    DEFAULT_QUOTE_MAX_RETRIES, DEFAULT_QUOTE_RETRY_BASE_DELAY_MS,
    DEFAULT_QUOTE_RETRY_MAX_DELAY_MS, RETRY_JITTER_PERCENT,
};

/// Calculate the retry delay using exponential backoff with jitter
///
/// # Arguments
/// * `attempt` - The retry attempt number (0 = first retry)
/// * `base_delay_ms` - Base delay in milliseconds
/// * `max_delay_ms` - Maximum delay in milliseconds
///
/// # Returns
/// Duration to wait before the next retry
pub fn calculate_retry_delay(attempt: u8, base_delay_ms: u64, max_delay_ms: u64) -> Duration {
    if base_delay_ms == 0 || max_delay_ms == 0 {
        return Duration::from_millis(0);
    }

    let exp_backoff = if attempt > 63 {
        max_delay_ms
    } else {
        let multiplier = 1u64.checked_shl(attempt as u32).unwrap_or(u64::MAX);
        base_delay_ms.saturating_mul(multiplier)
    };

    let delay_ms = exp_backoff.min(max_delay_ms);

    apply_jitter(delay_ms)
}

/// Randomizes `delay_ms` within `delay_ms × (1 ± RETRY_JITTER_PERCENT)`.
fn apply_jitter(delay_ms: u64) -> Duration {
    if delay_ms == 0 {
        return Duration::from_millis(0);
    }

    let jitter_range = (delay_ms as f64 * RETRY_JITTER_PERCENT).floor() as u64;

    if jitter_range == 0 {
        return Duration::from_millis(delay_ms);
    }

    let mut rng = rand::rng();
    let jitter_value = rng.random_range(0..=jitter_range);

    let final_delay = if rng.random_bool(0.5) {
        delay_ms.saturating_add(jitter_value)
    } else {
        delay_ms.saturating_sub(jitter_value)
    };

    Duration::from_millis(final_delay)
}

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u8,
    /// Base delay in milliseconds for exponential backoff
    pub base_delay_ms: u64,
    /// Maximum delay in milliseconds for exponential backoff
    pub max_delay_ms: u64,
}

impl RetryConfig {
    pub fn new(max_retries: u8, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            max_delay_ms,
        }
    }

    /// A config that attempts once and never sleeps.
    pub fn no_retry() -> Self {
        Self::new(0, 0, 0)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_QUOTE_MAX_RETRIES,
            DEFAULT_QUOTE_RETRY_BASE_DELAY_MS,
            DEFAULT_QUOTE_RETRY_MAX_DELAY_MS,
        )
    }
}

/// Runs `operation`, retrying errors for which `is_retriable_error` holds.
///
/// Non-retriable errors are returned immediately. When retries are exhausted
/// the last error is returned.
pub async fn retry_with_backoff<T, E, F, Fut>(
    operation_name: &str,
    is_retriable_error: impl Fn(&E) -> bool,
    mut operation: F,
    config: &RetryConfig,
) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt: u8 = 0;
    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    log::debug!(
                        "Call '{}' succeeded after {} retries",
                        operation_name,
                        attempt
                    );
                }
                return Ok(result);
            }
            Err(e) => {
                if !is_retriable_error(&e) {
                    log::warn!(
                        "Call '{}' failed with non-retriable error: {}",
                        operation_name,
                        e
                    );
                    return Err(e);
                }
                if attempt >= config.max_retries {
                    log::warn!(
                        "Call '{}' failed after {} attempts: {}",
                        operation_name,
                        attempt as u16 + 1,
                        e
                    );
                    return Err(e);
                }

                let delay =
                    calculate_retry_delay(attempt, config.base_delay_ms, config.max_delay_ms);
                log::warn!(
                    "Call '{}' failed (attempt {}/{}): {}. Retrying in {:?}",
                    operation_name,
                    attempt as u16 + 1,
                    config.max_retries as u16 + 1,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
