//! Wallet signer abstraction.
//!
//! The wallet holds the initiator's key. The relay engine needs exactly one
//! capability from it: a signature over supplied transaction bytes, returned
//! without altering anything else in them.
//!
//! ```text
//! WalletSigner
//!   └── LocalWalletSigner (keypair file or seed)
//! ```
mod local_signer;
pub use local_signer::*;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use solana_sdk::pubkey::Pubkey;

use crate::models::SignerError;

#[async_trait]
#[cfg_attr(test, automock)]
pub trait WalletSigner: Send + Sync {
    /// The connected account, or `SignerError::Unavailable` when no wallet is connected.
    fn pubkey(&self) -> Result<Pubkey, SignerError>;

    /// Signs the wire transaction and returns it with the signer's slot filled.
    async fn sign_transaction(&self, wire: &[u8]) -> Result<Vec<u8>, SignerError>;
}
