use std::{fmt, str::FromStr};

use solana_sdk::{hash::Hash, instruction::Instruction};

use crate::models::{BlockhashResponse, RelayError};

/// Recent blockhash plus the last block height at which it is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessToken {
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

impl FreshnessToken {
    pub fn new(blockhash: Hash, last_valid_block_height: u64) -> Self {
        Self {
            blockhash,
            last_valid_block_height,
        }
    }

    pub fn is_expired_at(&self, block_height: u64) -> bool {
        block_height > self.last_valid_block_height
    }
}

impl TryFrom<&BlockhashResponse> for FreshnessToken {
    type Error = RelayError;

    fn try_from(response: &BlockhashResponse) -> Result<Self, Self::Error> {
        let blockhash = Hash::from_str(&response.blockhash).map_err(|e| {
            RelayError::Quote(format!(
                "Relayer returned invalid blockhash '{}': {}",
                response.blockhash, e
            ))
        })?;
        Ok(Self::new(blockhash, response.last_valid_block_height))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationRound {
    /// Quote over the transaction without a payment instruction.
    Estimate,
    /// Authoritative quote over the transaction that carries the payment instruction.
    Final,
}

impl fmt::Display for NegotiationRound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NegotiationRound::Estimate => write!(f, "round 1"),
            NegotiationRound::Final => write!(f, "round 2"),
        }
    }
}

/// A relayer's fee proposal.
///
/// A quote prices the transaction it was requested for. Inserting its payment
/// instruction changes that transaction, so only a `Final` quote is ever
/// embedded in what gets signed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeeQuote {
    pub round: NegotiationRound,
    pub payment_instruction: Instruction,
    pub fee_amount: u64,
    pub fee_token: String,
}

impl FeeQuote {
    pub fn new(
        round: NegotiationRound,
        payment_instruction: Instruction,
        fee_amount: u64,
        fee_token: String,
    ) -> Self {
        Self {
            round,
            payment_instruction,
            fee_amount,
            fee_token,
        }
    }

    pub fn is_final(&self) -> bool {
        self.round == NegotiationRound::Final
    }
}
