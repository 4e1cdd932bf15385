//! Solana Provider Module
//!
//! Abstraction over the Solana RPC client covering what the relay engine
//! needs from the ledger: account lookup, the latest blockhash with its expiry
//! height, the current block height, raw transaction submission and signature
//! status.
//!
//! The provider uses the nonblocking `RpcClient`. Submission goes through a raw
//! `sendTransaction` request so the exact signed bytes reach the ledger.
use std::{str::FromStr, time::Duration};

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::Serialize;
use serde_json::json;
use solana_client::{
    client_error::{ClientError, ClientErrorKind},
    nonblocking::rpc_client::RpcClient,
    rpc_request::{RpcError, RpcRequest},
};
use solana_sdk::{
    account::Account, commitment_config::CommitmentConfig, pubkey::Pubkey, signature::Signature,
};
use thiserror::Error;

use crate::{
    models::{CommitmentLevel, FreshnessToken, LedgerSignatureStatus},
    utils::base64_encode,
};

#[derive(Error, Debug, Serialize, Clone, PartialEq)]
pub enum SolanaProviderError {
    #[error("RPC client error: {0}")]
    RpcError(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Transaction rejected: {0}")]
    TransactionRejected(String),
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl From<ClientError> for SolanaProviderError {
    fn from(error: ClientError) -> Self {
        match error.kind() {
            ClientErrorKind::RpcError(RpcError::RpcResponseError { message, .. }) => {
                SolanaProviderError::RpcError(message.clone())
            }
            ClientErrorKind::Reqwest(_) | ClientErrorKind::Io(_) => {
                SolanaProviderError::NetworkError(error.to_string())
            }
            _ => SolanaProviderError::RpcError(error.to_string()),
        }
    }
}

/// A trait that abstracts the Solana ledger operations used by the relay engine.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait SolanaProviderTrait: Send + Sync {
    /// Retrieves an account, `None` when it does not exist.
    async fn get_account(&self, pubkey: &Pubkey) -> Result<Option<Account>, SolanaProviderError>;

    /// Retrieves the latest blockhash together with its last valid block height.
    async fn get_latest_blockhash_with_height(&self)
        -> Result<FreshnessToken, SolanaProviderError>;

    /// Retrieves the current block height.
    async fn get_block_height(&self) -> Result<u64, SolanaProviderError>;

    /// Submits already-serialized transaction bytes without re-encoding them.
    async fn send_raw_transaction(&self, wire: &[u8]) -> Result<Signature, SolanaProviderError>;

    /// Looks up the status of a submitted transaction, `None` when the ledger
    /// has not seen it.
    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<LedgerSignatureStatus>, SolanaProviderError>;
}

pub struct SolanaProvider {
    client: RpcClient,
    commitment: CommitmentConfig,
    skip_preflight: bool,
}

impl SolanaProvider {
    pub fn new(url: &str, timeout: Duration, commitment: CommitmentLevel) -> Self {
        let commitment = CommitmentConfig::from(commitment);
        let client =
            RpcClient::new_with_timeout_and_commitment(url.to_string(), timeout, commitment);
        Self {
            client,
            commitment,
            skip_preflight: false,
        }
    }

    pub fn with_skip_preflight(mut self, skip_preflight: bool) -> Self {
        self.skip_preflight = skip_preflight;
        self
    }

    pub fn url(&self) -> String {
        self.client.url()
    }
}

#[async_trait]
impl SolanaProviderTrait for SolanaProvider {
    async fn get_account(&self, pubkey: &Pubkey) -> Result<Option<Account>, SolanaProviderError> {
        self.client
            .get_account_with_commitment(pubkey, self.commitment)
            .await
            .map(|response| response.value)
            .map_err(SolanaProviderError::from)
    }

    async fn get_latest_blockhash_with_height(
        &self,
    ) -> Result<FreshnessToken, SolanaProviderError> {
        self.client
            .get_latest_blockhash_with_commitment(self.commitment)
            .await
            .map(|(blockhash, last_valid_block_height)| {
                FreshnessToken::new(blockhash, last_valid_block_height)
            })
            .map_err(SolanaProviderError::from)
    }

    async fn get_block_height(&self) -> Result<u64, SolanaProviderError> {
        self.client
            .get_block_height_with_commitment(self.commitment)
            .await
            .map_err(SolanaProviderError::from)
    }

    /// Sends the bytes as base64 through `sendTransaction`.
    ///
    /// # Errors
    ///
    /// Returns `SolanaProviderError::TransactionRejected` with the ledger's
    /// message when the node refuses the transaction, and
    /// `SolanaProviderError::NetworkError` when the node cannot be reached.
    async fn send_raw_transaction(&self, wire: &[u8]) -> Result<Signature, SolanaProviderError> {
        let params = json!([
            base64_encode(wire),
            {
                "encoding": "base64",
                "skipPreflight": self.skip_preflight,
                "preflightCommitment": self.commitment.commitment,
            }
        ]);

        let signature: String = self
            .client
            .send(RpcRequest::SendTransaction, params)
            .await
            .map_err(|e| match SolanaProviderError::from(e) {
                SolanaProviderError::RpcError(message) => {
                    SolanaProviderError::TransactionRejected(message)
                }
                other => other,
            })?;

        Signature::from_str(&signature).map_err(|e| {
            SolanaProviderError::UnexpectedResponse(format!(
                "invalid signature '{}': {}",
                signature, e
            ))
        })
    }

    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<LedgerSignatureStatus>, SolanaProviderError> {
        let response = self
            .client
            .get_signature_statuses(&[*signature])
            .await
            .map_err(SolanaProviderError::from)?;

        Ok(response.value.into_iter().next().flatten().map(|status| {
            let commitment = if status.satisfies_commitment(CommitmentConfig::finalized()) {
                CommitmentLevel::Finalized
            } else if status.satisfies_commitment(CommitmentConfig::confirmed()) {
                CommitmentLevel::Confirmed
            } else {
                CommitmentLevel::Processed
            };
            LedgerSignatureStatus {
                slot: status.slot,
                commitment,
                err: status.err.map(|err| err.to_string()),
            }
        }))
    }
}
