use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Serialize, Clone, PartialEq)]
#[allow(clippy::enum_variant_names)]
pub enum SignerError {
    #[error("Wallet signer unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to sign transaction: {0}")]
    SigningError(String),

    #[error("Invalid key format: {0}")]
    KeyError(String),

    #[error("User rejected signing request")]
    Rejected,

    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signer_error_display() {
        assert_eq!(
            SignerError::Unavailable("not connected".to_string()).to_string(),
            "Wallet signer unavailable: not connected"
        );
        assert_eq!(
            SignerError::Rejected.to_string(),
            "User rejected signing request"
        );
        assert_eq!(
            SignerError::KeyError("bad length".to_string()).to_string(),
            "Invalid key format: bad length"
        );
    }
}
