use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use solana_sdk::{commitment_config::CommitmentConfig, signature::Signature};

use crate::{
    constants::{DEFAULT_CONFIRMATION_POLL_INTERVAL_MS, DEFAULT_CONFIRMATION_TIMEOUT_MS},
    models::{FeeQuote, FreshnessToken, SponsoredTransaction},
};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum CommitmentLevel {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

impl FromStr for CommitmentLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "processed" => Ok(CommitmentLevel::Processed),
            "confirmed" => Ok(CommitmentLevel::Confirmed),
            "finalized" => Ok(CommitmentLevel::Finalized),
            other => Err(format!("unknown commitment level '{}'", other)),
        }
    }
}

impl fmt::Display for CommitmentLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitmentLevel::Processed => write!(f, "processed"),
            CommitmentLevel::Confirmed => write!(f, "confirmed"),
            CommitmentLevel::Finalized => write!(f, "finalized"),
        }
    }
}

impl From<CommitmentLevel> for CommitmentConfig {
    fn from(level: CommitmentLevel) -> Self {
        match level {
            CommitmentLevel::Processed => CommitmentConfig::processed(),
            CommitmentLevel::Confirmed => CommitmentConfig::confirmed(),
            CommitmentLevel::Finalized => CommitmentConfig::finalized(),
        }
    }
}

/// Signature status as reported by the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSignatureStatus {
    pub slot: u64,
    /// Highest commitment level the transaction has reached.
    pub commitment: CommitmentLevel,
    /// Execution error, if the transaction landed but failed.
    pub err: Option<String>,
}

impl LedgerSignatureStatus {
    pub fn satisfies(&self, target: CommitmentLevel) -> bool {
        self.commitment >= target
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    /// `slot` is unknown when settlement was reported by the relayer.
    Confirmed { slot: Option<u64> },
    Failed(String),
    /// The freshness token expired (or the wall-clock cap passed) without
    /// confirmation. The transaction may still land.
    TimedOut,
}

impl ConfirmationOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, ConfirmationOutcome::Confirmed { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmOptions {
    pub commitment: CommitmentLevel,
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ConfirmOptions {
    fn default() -> Self {
        Self {
            commitment: CommitmentLevel::default(),
            timeout: Duration::from_millis(DEFAULT_CONFIRMATION_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_CONFIRMATION_POLL_INTERVAL_MS),
        }
    }
}

/// Fully signed transaction ready for submission.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalTransaction {
    pub transaction: SponsoredTransaction,
    pub freshness: FreshnessToken,
    pub fee_quote: FeeQuote,
    pub initiator_index: usize,
}

/// Result of a submission; holds the exact bytes sent so they can be re-sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionHandle {
    pub signature: Signature,
    pub wire: Vec<u8>,
    pub last_valid_block_height: u64,
}
