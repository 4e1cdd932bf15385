//! Fixtures shared by the relay unit tests.
use solana_sdk::{
    account::Account,
    hash::Hash,
    instruction::Instruction,
    program_pack::Pack,
    pubkey::Pubkey,
    signature::Keypair,
    signer::{keypair::keypair_from_seed, Signer},
};

use crate::{
    domain::relay::{
        AccountResolver, ComputeBudget, NegotiatedTransaction, NegotiationRequest,
        TransactionAssembler,
    },
    models::{
        EncodedSerializedTransaction, FeeQuote, FreshnessToken, NegotiationRound,
        PaymentInstructionResponse, SerializedInstruction, SponsoredTransaction,
    },
    utils::{message_section, write_signature_slot},
};

pub const FEE_TOKEN_DECIMALS: u8 = 6;

/// An initialized mint with `FEE_TOKEN_DECIMALS` decimals owned by `owner_program`.
pub fn mint_account(owner_program: &Pubkey) -> Account {
    let mut data = vec![0u8; spl_token::state::Mint::LEN];
    let state = spl_token::state::Mint {
        decimals: FEE_TOKEN_DECIMALS,
        is_initialized: true,
        ..Default::default()
    };
    spl_token::state::Mint::pack(state, &mut data).unwrap();
    Account {
        lamports: 1_461_600,
        data,
        owner: *owner_program,
        executable: false,
        rent_epoch: 0,
    }
}

pub fn token_account(program_id: &Pubkey, mint: &Pubkey, owner: &Pubkey, amount: u64) -> Account {
    let mut data = vec![0u8; spl_token::state::Account::LEN];
    if program_id == &spl_token_2022::id() {
        let state = spl_token_2022::state::Account {
            mint: *mint,
            owner: *owner,
            amount,
            state: spl_token_2022::state::AccountState::Initialized,
            ..Default::default()
        };
        spl_token_2022::state::Account::pack(state, &mut data).unwrap();
    } else {
        let state = spl_token::state::Account {
            mint: *mint,
            owner: *owner,
            amount,
            state: spl_token::state::AccountState::Initialized,
            ..Default::default()
        };
        spl_token::state::Account::pack(state, &mut data).unwrap();
    }
    Account {
        lamports: 2_039_280,
        data,
        owner: *program_id,
        executable: false,
        rent_epoch: 0,
    }
}

/// SPL Token `TransferChecked` of `amount` from `authority` to `fee_payer`.
pub fn payment_instruction(
    authority: &Pubkey,
    mint: &Pubkey,
    fee_payer: &Pubkey,
    amount: u64,
) -> Instruction {
    let program_id = spl_token::id();
    AccountResolver::create_transfer_checked_instruction(
        &program_id,
        &AccountResolver::holding_account(authority, mint, &program_id),
        mint,
        &AccountResolver::holding_account(fee_payer, mint, &program_id),
        authority,
        amount,
        FEE_TOKEN_DECIMALS,
    )
    .unwrap()
}

pub fn payment_response(instruction: &Instruction, fee_amount: u64) -> PaymentInstructionResponse {
    PaymentInstructionResponse {
        payment_instruction: SerializedInstruction::from(instruction),
        fee_amount,
        fee_token: None,
    }
}

fn sign_slot(keypair: &Keypair, wire: &[u8]) -> Vec<u8> {
    let transaction = SponsoredTransaction::from_wire(wire.to_vec()).unwrap();
    let index = transaction.find_signer_index(&keypair.pubkey()).unwrap();
    let signature = keypair.sign_message(message_section(wire).unwrap());
    let mut signed = wire.to_vec();
    write_signature_slot(&mut signed, index, signature.as_ref()).unwrap();
    signed
}

/// What an honest relayer does on `POST /sign`.
pub fn relayer_co_sign(
    fee_payer: &Keypair,
    transaction: &EncodedSerializedTransaction,
) -> EncodedSerializedTransaction {
    let wire = transaction.to_bytes().unwrap();
    EncodedSerializedTransaction::from_bytes(&sign_slot(fee_payer, &wire))
}

/// What an honest wallet does.
pub fn wallet_sign(initiator: &Keypair, wire: &[u8]) -> Vec<u8> {
    sign_slot(initiator, wire)
}

/// An initiator paying a business transfer, a relayer fee payer and a fee token.
pub struct RelayFixture {
    initiator_seed: [u8; 32],
    fee_payer_seed: [u8; 32],
    pub initiator: Pubkey,
    pub fee_payer: Pubkey,
    pub fee_mint: Pubkey,
    pub business_mint: Pubkey,
    pub recipient: Pubkey,
    pub blockhash: Hash,
}

impl RelayFixture {
    pub fn new() -> Self {
        let initiator_seed = [11u8; 32];
        let fee_payer_seed = [22u8; 32];
        Self {
            initiator: keypair_from_seed(&initiator_seed).unwrap().pubkey(),
            fee_payer: keypair_from_seed(&fee_payer_seed).unwrap().pubkey(),
            initiator_seed,
            fee_payer_seed,
            fee_mint: Pubkey::new_unique(),
            business_mint: Pubkey::new_unique(),
            recipient: Pubkey::new_unique(),
            blockhash: Hash::new_unique(),
        }
    }

    pub fn initiator_keypair(&self) -> Keypair {
        keypair_from_seed(&self.initiator_seed).unwrap()
    }

    pub fn fee_payer_keypair(&self) -> Keypair {
        keypair_from_seed(&self.fee_payer_seed).unwrap()
    }

    pub fn business_instruction(&self) -> Instruction {
        let program_id = spl_token::id();
        AccountResolver::create_transfer_checked_instruction(
            &program_id,
            &AccountResolver::holding_account(&self.initiator, &self.business_mint, &program_id),
            &self.business_mint,
            &AccountResolver::holding_account(&self.recipient, &self.business_mint, &program_id),
            &self.initiator,
            1_000_000,
            FEE_TOKEN_DECIMALS,
        )
        .unwrap()
    }

    pub fn request(&self) -> NegotiationRequest {
        NegotiationRequest {
            initiator: self.initiator,
            fee_payer: self.fee_payer,
            fee_token: self.fee_mint.to_string(),
            instructions: vec![self.business_instruction()],
        }
    }

    pub fn payment_instruction(&self, amount: u64) -> Instruction {
        payment_instruction(&self.initiator, &self.fee_mint, &self.fee_payer, amount)
    }

    pub fn freshness(&self) -> FreshnessToken {
        FreshnessToken::new(self.blockhash, 500)
    }

    /// A finished negotiation whose Round 2 quote is `amount`.
    pub fn negotiated(&self, amount: u64) -> NegotiatedTransaction {
        let assembler = TransactionAssembler::new(ComputeBudget::new(200_000, 0));
        let payment = self.payment_instruction(amount);
        let instructions = vec![self.business_instruction(), payment.clone()];
        let freshness = self.freshness();
        let provisional = assembler
            .assemble(&instructions, &self.fee_payer, &freshness)
            .unwrap();
        let quote = FeeQuote::new(
            NegotiationRound::Final,
            payment,
            amount,
            self.fee_mint.to_string(),
        );
        NegotiatedTransaction {
            provisional,
            quote,
            freshness,
            business_instruction_count: 1,
        }
    }
}
