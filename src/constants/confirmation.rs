//! Submission and confirmation defaults.

pub const DEFAULT_CONFIRMATION_POLL_INTERVAL_MS: u64 = 1_000;

/// Wall-clock cap on confirmation polling, on top of block height expiry.
pub const DEFAULT_CONFIRMATION_TIMEOUT_MS: u64 = 90_000;

pub const DEFAULT_RPC_TIMEOUT_MS: u64 = 10_000;
