//! JSON form of a Solana instruction returned by the Relayer Service.
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};

use crate::{
    models::RelayError,
    utils::{base64_decode, base64_encode},
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SerializedInstruction {
    /// Program ID (base58-encoded pubkey)
    pub program_id: String,
    pub accounts: Vec<SerializedAccountMeta>,
    /// Instruction data (base64-encoded)
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SerializedAccountMeta {
    pub pubkey: String,
    pub is_signer: bool,
    pub is_writable: bool,
}

fn parse_pubkey(value: &str, field: &str) -> Result<Pubkey, RelayError> {
    Pubkey::from_str(value)
        .map_err(|e| RelayError::MalformedQuote(format!("Invalid {} '{}': {}", field, value, e)))
}

impl TryFrom<&SerializedInstruction> for Instruction {
    type Error = RelayError;

    fn try_from(serialized: &SerializedInstruction) -> Result<Self, Self::Error> {
        let program_id = parse_pubkey(&serialized.program_id, "program id")?;
        let accounts = serialized
            .accounts
            .iter()
            .map(|meta| {
                Ok(AccountMeta {
                    pubkey: parse_pubkey(&meta.pubkey, "account")?,
                    is_signer: meta.is_signer,
                    is_writable: meta.is_writable,
                })
            })
            .collect::<Result<Vec<_>, RelayError>>()?;
        let data = base64_decode(&serialized.data).map_err(|e| {
            RelayError::MalformedQuote(format!("Invalid instruction data: {}", e))
        })?;

        Ok(Instruction {
            program_id,
            accounts,
            data,
        })
    }
}

impl From<&Instruction> for SerializedInstruction {
    fn from(instruction: &Instruction) -> Self {
        Self {
            program_id: instruction.program_id.to_string(),
            accounts: instruction
                .accounts
                .iter()
                .map(|meta| SerializedAccountMeta {
                    pubkey: meta.pubkey.to_string(),
                    is_signer: meta.is_signer,
                    is_writable: meta.is_writable,
                })
                .collect(),
            data: base64_encode(&instruction.data),
        }
    }
}
