//! Transaction Assembler.
//!
//! Builds the provisional transactions that are sent to the relayer for
//! quoting. Compute budget instructions always occupy a fixed prefix ahead of
//! the business instructions, and the fee payer is the relayer's placeholder
//! signer, never the initiator.
use log::debug;
use solana_sdk::{
    compute_budget::{self, ComputeBudgetInstruction},
    instruction::Instruction,
    message::Message,
    pubkey::Pubkey,
    signer::null_signer::NullSigner,
    transaction::Transaction,
};

use crate::{
    constants::{SET_COMPUTE_UNIT_LIMIT_TAG, SET_COMPUTE_UNIT_PRICE_TAG},
    models::{FreshnessToken, RelayError, SponsoredTransaction},
};

/// Compute budget applied to every assembled transaction. `None` leaves the
/// caller's own instruction (if any) in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComputeBudget {
    pub unit_limit: Option<u32>,
    pub unit_price: Option<u64>,
}

impl ComputeBudget {
    /// Zero values disable the corresponding instruction.
    pub fn new(unit_limit: u32, unit_price: u64) -> Self {
        Self {
            unit_limit: (unit_limit > 0).then_some(unit_limit),
            unit_price: (unit_price > 0).then_some(unit_price),
        }
    }
}

/// A transaction built only to be quoted. Never submitted as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionalTransaction {
    pub transaction: SponsoredTransaction,
    /// Instructions in transaction order, compute budget prefix included.
    pub instructions: Vec<Instruction>,
    /// Number of compute budget instructions at the front.
    pub budget_prefix_len: usize,
}

impl ProvisionalTransaction {
    /// Instructions after the compute budget prefix.
    pub fn body(&self) -> &[Instruction] {
        &self.instructions[self.budget_prefix_len..]
    }
}

fn compute_budget_tag(instruction: &Instruction) -> Option<u8> {
    if instruction.program_id == compute_budget::id() {
        instruction.data.first().copied()
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TransactionAssembler {
    budget: ComputeBudget,
}

impl TransactionAssembler {
    pub fn new(budget: ComputeBudget) -> Self {
        Self { budget }
    }

    pub fn budget(&self) -> ComputeBudget {
        self.budget
    }

    /// Orders `instructions` as `[unit limit?, unit price?, rest...]`.
    ///
    /// Unit limit and unit price instructions supplied by the caller are
    /// replaced by the configured values, or moved into the prefix when no
    /// value is configured. Other compute budget instructions stay where they are.
    pub fn plan(&self, instructions: &[Instruction]) -> (Vec<Instruction>, usize) {
        let mut caller_limit = None;
        let mut caller_price = None;
        let mut rest = Vec::with_capacity(instructions.len());

        for instruction in instructions {
            match compute_budget_tag(instruction) {
                Some(SET_COMPUTE_UNIT_LIMIT_TAG) => caller_limit = Some(instruction.clone()),
                Some(SET_COMPUTE_UNIT_PRICE_TAG) => caller_price = Some(instruction.clone()),
                _ => rest.push(instruction.clone()),
            }
        }

        let limit = self
            .budget
            .unit_limit
            .map(ComputeBudgetInstruction::set_compute_unit_limit)
            .or(caller_limit);
        let price = self
            .budget
            .unit_price
            .map(ComputeBudgetInstruction::set_compute_unit_price)
            .or(caller_price);

        let mut planned: Vec<Instruction> = limit.into_iter().chain(price).collect();
        let prefix_len = planned.len();
        planned.extend(rest);
        (planned, prefix_len)
    }

    /// Builds a provisional transaction paid for by `fee_payer`.
    ///
    /// The fee payer's slot is reserved by a placeholder signer and stays
    /// all-zero until the relayer co-signs.
    pub fn assemble(
        &self,
        instructions: &[Instruction],
        fee_payer: &Pubkey,
        freshness: &FreshnessToken,
    ) -> Result<ProvisionalTransaction, RelayError> {
        let (planned, budget_prefix_len) = self.plan(instructions);
        let message = Message::new_with_blockhash(&planned, Some(fee_payer), &freshness.blockhash);
        let mut transaction = Transaction::new_unsigned(message);

        let placeholder = NullSigner::new(fee_payer);
        transaction
            .try_partial_sign(&[&placeholder], freshness.blockhash)
            .map_err(|e| RelayError::Internal(format!("Failed to reserve fee payer slot: {}", e)))?;

        let transaction = SponsoredTransaction::from_transaction(transaction)?;
        debug!(
            "Assembled provisional transaction: {} instructions ({} compute budget), {} bytes",
            planned.len(),
            budget_prefix_len,
            transaction.wire().len()
        );

        Ok(ProvisionalTransaction {
            transaction,
            instructions: planned,
            budget_prefix_len,
        })
    }
}
