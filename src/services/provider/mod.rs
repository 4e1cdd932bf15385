//! Ledger access: the Solana RPC provider and the retry helper shared by
//! every outbound call that may be retried.
mod solana;
pub use solana::*;

pub mod retry;
pub use retry::{calculate_retry_delay, retry_with_backoff, RetryConfig};
