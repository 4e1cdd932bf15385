//! Fee negotiation and retry defaults.

/// Transport-level retries for a single relayer quote call.
pub const DEFAULT_QUOTE_MAX_RETRIES: u8 = 3;

/// Base delay for exponential backoff between quote retries.
pub const DEFAULT_QUOTE_RETRY_BASE_DELAY_MS: u64 = 200;

/// Upper bound for the backoff delay between quote retries.
pub const DEFAULT_QUOTE_RETRY_MAX_DELAY_MS: u64 = 2_000;

/// Number of times negotiation may restart from Round 1 after a malformed quote.
pub const DEFAULT_NEGOTIATION_MAX_ATTEMPTS: u8 = 2;

/// Jitter applied to backoff delays, as a fraction of the delay.
pub const RETRY_JITTER_PERCENT: f64 = 0.2;
