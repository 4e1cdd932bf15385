//! Strongly-typed view over a legacy wire transaction.
//!
//! A [`SponsoredTransaction`] always carries the exact bytes it was parsed
//! from next to the decoded form. Anything that has to reach another signer
//! (relayer or wallet) is taken from those bytes, never re-serialized from the
//! decoded structure.
use solana_sdk::{
    hash::Hash,
    instruction::CompiledInstruction,
    pubkey::Pubkey,
    signature::Signature,
    transaction::Transaction,
};

use crate::{
    models::{EncodedSerializedTransaction, RelayError},
    utils::{is_placeholder_signature, message_section},
};

#[derive(Debug, Clone, PartialEq)]
pub struct SponsoredTransaction {
    transaction: Transaction,
    wire: Vec<u8>,
}

impl SponsoredTransaction {
    pub fn from_transaction(transaction: Transaction) -> Result<Self, RelayError> {
        let wire = bincode::serialize(&transaction)?;
        Self::validate(&transaction)?;
        Ok(Self { transaction, wire })
    }

    /// Parses `wire`, keeping the bytes verbatim.
    pub fn from_wire(wire: Vec<u8>) -> Result<Self, RelayError> {
        let transaction: Transaction = bincode::deserialize(&wire)?;
        let consumed = bincode::serialized_size(&transaction)?;
        if consumed != wire.len() as u64 {
            return Err(RelayError::Serialization(format!(
                "{} trailing bytes after transaction",
                wire.len() as u64 - consumed.min(wire.len() as u64)
            )));
        }
        Self::validate(&transaction)?;
        Ok(Self { transaction, wire })
    }

    pub fn from_encoded(encoded: &EncodedSerializedTransaction) -> Result<Self, RelayError> {
        Self::from_wire(encoded.to_bytes()?)
    }

    fn validate(transaction: &Transaction) -> Result<(), RelayError> {
        let header = &transaction.message.header;
        let required = header.num_required_signatures as usize;
        if transaction.signatures.len() != required {
            return Err(RelayError::Serialization(format!(
                "transaction has {} signature slots but {} required signers",
                transaction.signatures.len(),
                required
            )));
        }
        if required > transaction.message.account_keys.len() {
            return Err(RelayError::Serialization(format!(
                "{} required signers but only {} account keys",
                required,
                transaction.message.account_keys.len()
            )));
        }
        Ok(())
    }

    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    pub fn wire(&self) -> &[u8] {
        &self.wire
    }

    pub fn into_wire(self) -> Vec<u8> {
        self.wire
    }

    pub fn encode(&self) -> EncodedSerializedTransaction {
        EncodedSerializedTransaction::from_bytes(&self.wire)
    }

    /// The signed portion of the wire bytes.
    pub fn message_bytes(&self) -> Result<&[u8], RelayError> {
        Ok(message_section(&self.wire)?)
    }

    pub fn fee_payer(&self) -> Option<&Pubkey> {
        self.transaction.message.account_keys.first()
    }

    /// Accounts that must sign, in signature-slot order.
    pub fn required_signers(&self) -> &[Pubkey] {
        let required = self.transaction.message.header.num_required_signatures as usize;
        &self.transaction.message.account_keys[..required]
    }

    /// Signature slot index of `account`, found by scanning the required signers.
    pub fn find_signer_index(&self, account: &Pubkey) -> Option<usize> {
        self.required_signers().iter().position(|key| key == account)
    }

    pub fn signature(&self, index: usize) -> Option<&Signature> {
        self.transaction.signatures.get(index)
    }

    /// The first signature identifies the transaction on the ledger.
    pub fn id(&self) -> Option<&Signature> {
        self.transaction.signatures.first()
    }

    pub fn placeholder_slots(&self) -> Vec<usize> {
        self.transaction
            .signatures
            .iter()
            .enumerate()
            .filter(|(_, signature)| is_placeholder_signature(signature.as_ref()))
            .map(|(index, _)| index)
            .collect()
    }

    pub fn instruction_count(&self) -> usize {
        self.transaction.message.instructions.len()
    }

    pub fn compiled_instructions(&self) -> &[CompiledInstruction] {
        &self.transaction.message.instructions
    }

    pub fn recent_blockhash(&self) -> &Hash {
        &self.transaction.message.recent_blockhash
    }
}
