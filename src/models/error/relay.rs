use serde::Serialize;
use thiserror::Error;

use crate::{
    config::ConfigError,
    domain::TokenError,
    services::{RelayerClientError, SolanaProviderError},
    utils::WireError,
};

use super::SignerError;

/// Errors that abort a relay session.
///
/// Every variant ends the current session; partial progress is never resumed,
/// only replayed from Round 1.
#[derive(Error, Debug, Serialize, Clone, PartialEq)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Quote error: {0}")]
    Quote(String),

    #[error("Malformed quote: {0}")]
    MalformedQuote(String),

    #[error("Signer unavailable: {0}")]
    SignerUnavailable(String),

    #[error("Signer {0} is not a required signer of the transaction")]
    SignerNotFound(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Reconstruction error: {0}")]
    Reconstruction(String),

    #[error("Relayer co-signature error: {0}")]
    CoSign(String),

    #[error("Submission rejected: {0}")]
    SubmissionRejected(String),

    #[error("Transaction failed on-chain: {0}")]
    Failed(String),

    #[error("Confirmation timed out: {0}")]
    TimedOut(String),

    #[error("Relay session cancelled")]
    Cancelled,

    #[error("Invalid state transition: {event} in {state}")]
    InvalidTransition { state: String, event: String },

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Quote failures may be retried from Round 1; a timeout may be retried by
    /// restarting the whole flow with a fresh freshness token.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RelayError::Quote(_) | RelayError::TimedOut(_))
    }

    /// Stable short label used in log lines.
    pub fn category(&self) -> &'static str {
        match self {
            RelayError::Configuration(_) => "configuration",
            RelayError::Quote(_) => "quote",
            RelayError::MalformedQuote(_) => "malformed_quote",
            RelayError::SignerUnavailable(_) => "signer_unavailable",
            RelayError::SignerNotFound(_) => "signer_not_found",
            RelayError::InvalidSignature(_) => "invalid_signature",
            RelayError::Reconstruction(_) => "reconstruction",
            RelayError::CoSign(_) => "co_sign",
            RelayError::SubmissionRejected(_) => "submission_rejected",
            RelayError::Failed(_) => "failed",
            RelayError::TimedOut(_) => "timed_out",
            RelayError::Cancelled => "cancelled",
            RelayError::InvalidTransition { .. } => "invalid_transition",
            RelayError::Provider(_) => "provider",
            RelayError::Serialization(_) => "serialization",
            RelayError::Internal(_) => "internal",
        }
    }
}

impl From<SignerError> for RelayError {
    fn from(error: SignerError) -> Self {
        match error {
            SignerError::Unavailable(msg) => RelayError::SignerUnavailable(msg),
            SignerError::Rejected => {
                RelayError::SignerUnavailable("user rejected signing request".to_string())
            }
            other => RelayError::InvalidSignature(other.to_string()),
        }
    }
}

impl From<SolanaProviderError> for RelayError {
    fn from(error: SolanaProviderError) -> Self {
        match error {
            SolanaProviderError::TransactionRejected(reason) => {
                RelayError::SubmissionRejected(reason)
            }
            other => RelayError::Provider(other.to_string()),
        }
    }
}

impl From<RelayerClientError> for RelayError {
    fn from(error: RelayerClientError) -> Self {
        match error {
            RelayerClientError::Decode(msg) => RelayError::MalformedQuote(msg),
            RelayerClientError::InvalidUrl(msg) => RelayError::Configuration(msg),
            other => RelayError::Quote(other.to_string()),
        }
    }
}

impl From<ConfigError> for RelayError {
    fn from(error: ConfigError) -> Self {
        RelayError::Configuration(error.to_string())
    }
}

impl From<TokenError> for RelayError {
    fn from(error: TokenError) -> Self {
        match error {
            TokenError::InvalidTokenInstruction(_) | TokenError::Instruction(_) => {
                RelayError::MalformedQuote(error.to_string())
            }
            TokenError::InvalidTokenMint(_) | TokenError::InvalidTokenProgram(_) => {
                RelayError::Configuration(error.to_string())
            }
            TokenError::AccountError(_) => RelayError::Provider(error.to_string()),
        }
    }
}

impl From<WireError> for RelayError {
    fn from(error: WireError) -> Self {
        RelayError::Serialization(error.to_string())
    }
}

impl From<bincode::Error> for RelayError {
    fn from(error: bincode::Error) -> Self {
        RelayError::Serialization(error.to_string())
    }
}
