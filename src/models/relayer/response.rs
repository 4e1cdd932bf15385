use serde::{Deserialize, Serialize};

use crate::{
    models::{EncodedSerializedTransaction, SerializedInstruction},
    utils::{deserialize_u64, serialize_u64_as_string},
};

// GET /config
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RelayerConfigResponse {
    pub fee_payer: String,
    #[serde(default)]
    pub accepted_fee_tokens: Vec<String>,
}

impl RelayerConfigResponse {
    pub fn accepts(&self, fee_token: &str) -> bool {
        self.accepted_fee_tokens.iter().any(|token| token == fee_token)
    }
}

// GET /blockhash
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BlockhashResponse {
    pub blockhash: String,
    #[serde(deserialize_with = "deserialize_u64")]
    pub last_valid_block_height: u64,
}

// POST /payment-instruction
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInstructionResponse {
    pub payment_instruction: SerializedInstruction,
    #[serde(
        deserialize_with = "deserialize_u64",
        serialize_with = "serialize_u64_as_string"
    )]
    pub fee_amount: u64,
    /// Some relayers echo the token they charged in; absent means the requested one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_token: Option<String>,
}

// POST /sign
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SignTransactionResponse {
    pub signed_transaction: EncodedSerializedTransaction,
}

// GET /order-status
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
    Open,
    PendingClose,
    Closed,
    Failed,
}

impl OrderStatus {
    pub fn is_final(&self) -> bool {
        matches!(self, OrderStatus::Closed | OrderStatus::Failed)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct OrderStatusResponse {
    pub status: OrderStatus,
}
