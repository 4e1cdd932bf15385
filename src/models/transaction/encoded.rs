use serde::{Deserialize, Serialize};
use solana_sdk::transaction::Transaction;

use crate::{
    models::RelayError,
    utils::{base64_decode, base64_encode},
};

/// Base64 wire transaction as it travels over the Relayer Service API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct EncodedSerializedTransaction(String);

impl EncodedSerializedTransaction {
    pub fn new(encoded: String) -> Self {
        Self(encoded)
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(base64_encode(bytes))
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, RelayError> {
        base64_decode(&self.0)
            .map_err(|e| RelayError::Serialization(format!("Invalid base64 transaction: {}", e)))
    }
}

impl TryFrom<&Transaction> for EncodedSerializedTransaction {
    type Error = RelayError;

    fn try_from(transaction: &Transaction) -> Result<Self, Self::Error> {
        let serialized = bincode::serialize(transaction)?;
        Ok(Self::from_bytes(&serialized))
    }
}

impl TryFrom<EncodedSerializedTransaction> for Transaction {
    type Error = RelayError;

    fn try_from(encoded: EncodedSerializedTransaction) -> Result<Self, Self::Error> {
        let bytes = encoded.to_bytes()?;
        Ok(bincode::deserialize(&bytes)?)
    }
}
