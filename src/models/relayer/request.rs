use serde::{Deserialize, Serialize};

use crate::models::EncodedSerializedTransaction;

// POST /payment-instruction
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInstructionRequest {
    pub transaction: EncodedSerializedTransaction,
    pub fee_token: String,
    pub source_account: String,
}

// POST /sign
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SignTransactionRequest {
    pub transaction: EncodedSerializedTransaction,
    pub signer_key: String,
}
