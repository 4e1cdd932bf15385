//! Account Resolver.
//!
//! Derives the token holding accounts referenced by instructions and reads
//! balances for display. Derivation is a pure function of owner, mint and
//! token program; only balance reads touch the ledger.
//!
//! Both SPL Token and Token-2022 are supported. Token-2022 accounts are read
//! with their extensions stripped.
use ::spl_token::state::Account as SplTokenAccount;
use log::debug;
use solana_sdk::{
    account::Account as SolanaAccount, instruction::Instruction, program_pack::Pack,
    pubkey::Pubkey,
};
use spl_associated_token_account::{
    get_associated_token_address_with_program_id,
    instruction::create_associated_token_account_idempotent,
};

use crate::services::SolanaProviderTrait;

/// A decoded token holding account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenAccount {
    pub mint: Pubkey,
    pub owner: Pubkey,
    pub amount: u64,
    pub is_frozen: bool,
}

/// A non-zero balance held in an owner's holding account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBalance {
    pub holding_account: Pubkey,
    pub mint: Pubkey,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TokenError {
    #[error("Invalid token instruction: {0}")]
    InvalidTokenInstruction(String),
    #[error("Invalid token mint: {0}")]
    InvalidTokenMint(String),
    #[error("Invalid token program: {0}")]
    InvalidTokenProgram(String),
    #[error("Instruction error: {0}")]
    Instruction(String),
    #[error("Account error: {0}")]
    AccountError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenInstruction {
    Transfer { amount: u64 },
    TransferChecked { amount: u64, decimals: u8 },
    Other,
}

/// A token transfer decoded from an instruction, with its accounts resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenTransfer {
    pub program_id: Pubkey,
    pub source: Pubkey,
    pub destination: Pubkey,
    pub authority: Pubkey,
    pub mint: Option<Pubkey>,
    pub amount: u64,
}

pub struct AccountResolver;

impl AccountResolver {
    pub fn is_token_program(program_id: &Pubkey) -> bool {
        program_id == &spl_token::id() || program_id == &spl_token_2022::id()
    }

    fn ensure_token_program(program_id: &Pubkey) -> Result<(), TokenError> {
        if Self::is_token_program(program_id) {
            Ok(())
        } else {
            Err(TokenError::InvalidTokenProgram(format!(
                "Unknown token program: {}",
                program_id
            )))
        }
    }

    /// Derives the holding account of `owner` for `mint` under `token_program`.
    pub fn holding_account(owner: &Pubkey, mint: &Pubkey, token_program: &Pubkey) -> Pubkey {
        get_associated_token_address_with_program_id(owner, mint, token_program)
    }

    async fn fetch_mint<P: SolanaProviderTrait + ?Sized>(
        provider: &P,
        mint: &Pubkey,
    ) -> Result<SolanaAccount, TokenError> {
        let account = provider
            .get_account(mint)
            .await
            .map_err(|e| TokenError::AccountError(e.to_string()))?
            .ok_or_else(|| TokenError::InvalidTokenMint(format!("Mint {} not found", mint)))?;
        Self::ensure_token_program(&account.owner)?;
        Ok(account)
    }

    /// Resolves the token program that owns `mint`.
    pub async fn token_program_for_mint<P: SolanaProviderTrait + ?Sized>(
        provider: &P,
        mint: &Pubkey,
    ) -> Result<Pubkey, TokenError> {
        Ok(Self::fetch_mint(provider, mint).await?.owner)
    }

    /// Resolves the token program and decimals of `mint`.
    pub async fn mint_info<P: SolanaProviderTrait + ?Sized>(
        provider: &P,
        mint: &Pubkey,
    ) -> Result<(Pubkey, u8), TokenError> {
        let account = Self::fetch_mint(provider, mint).await?;
        let decimals = if account.owner == spl_token::id() {
            spl_token::state::Mint::unpack(&account.data).map(|state| state.decimals)
        } else {
            spl_token_2022::extension::StateWithExtensions::<spl_token_2022::state::Mint>::unpack(
                &account.data,
            )
            .map(|state| state.base.decimals)
        }
        .map_err(|e| TokenError::InvalidTokenMint(format!("Invalid mint {}: {}", mint, e)))?;
        Ok((account.owner, decimals))
    }

    pub fn create_transfer_checked_instruction(
        program_id: &Pubkey,
        source: &Pubkey,
        mint: &Pubkey,
        destination: &Pubkey,
        authority: &Pubkey,
        amount: u64,
        decimals: u8,
    ) -> Result<Instruction, TokenError> {
        Self::ensure_token_program(program_id)?;
        if program_id == &spl_token::id() {
            spl_token::instruction::transfer_checked(
                program_id,
                source,
                mint,
                destination,
                authority,
                &[],
                amount,
                decimals,
            )
            .map_err(|e| TokenError::Instruction(e.to_string()))
        } else {
            spl_token_2022::instruction::transfer_checked(
                program_id,
                source,
                mint,
                destination,
                authority,
                &[],
                amount,
                decimals,
            )
            .map_err(|e| TokenError::Instruction(e.to_string()))
        }
    }

    /// Creates `owner`'s holding account for `mint` if missing, funded by `payer`.
    pub fn create_holding_account_instruction(
        payer: &Pubkey,
        owner: &Pubkey,
        mint: &Pubkey,
        token_program: &Pubkey,
    ) -> Instruction {
        create_associated_token_account_idempotent(payer, owner, mint, token_program)
    }

    pub fn unpack_account(
        program_id: &Pubkey,
        account: &SolanaAccount,
    ) -> Result<TokenAccount, TokenError> {
        Self::ensure_token_program(program_id)?;
        if program_id == &spl_token::id() {
            let account = SplTokenAccount::unpack(&account.data)
                .map_err(|e| TokenError::AccountError(format!("Invalid token account: {}", e)))?;

            Ok(TokenAccount {
                mint: account.mint,
                owner: account.owner,
                amount: account.amount,
                is_frozen: account.is_frozen(),
            })
        } else {
            let state_with_extensions = spl_token_2022::extension::StateWithExtensions::<
                spl_token_2022::state::Account,
            >::unpack(&account.data)
            .map_err(|e| TokenError::AccountError(format!("Invalid token account: {}", e)))?;

            let base_account = state_with_extensions.base;

            Ok(TokenAccount {
                mint: base_account.mint,
                owner: base_account.owner,
                amount: base_account.amount,
                is_frozen: base_account.is_frozen(),
            })
        }
    }

    pub fn unpack_instruction(
        program_id: &Pubkey,
        data: &[u8],
    ) -> Result<TokenInstruction, TokenError> {
        Self::ensure_token_program(program_id)?;
        if program_id == &spl_token::id() {
            match spl_token::instruction::TokenInstruction::unpack(data) {
                Ok(spl_token::instruction::TokenInstruction::Transfer { amount }) => {
                    Ok(TokenInstruction::Transfer { amount })
                }
                Ok(spl_token::instruction::TokenInstruction::TransferChecked {
                    amount,
                    decimals,
                }) => Ok(TokenInstruction::TransferChecked { amount, decimals }),
                Ok(_) => Ok(TokenInstruction::Other),
                Err(e) => Err(TokenError::InvalidTokenInstruction(e.to_string())),
            }
        } else {
            match spl_token_2022::instruction::TokenInstruction::unpack(data) {
                #[allow(deprecated)]
                Ok(spl_token_2022::instruction::TokenInstruction::Transfer { amount }) => {
                    Ok(TokenInstruction::Transfer { amount })
                }
                Ok(spl_token_2022::instruction::TokenInstruction::TransferChecked {
                    amount,
                    decimals,
                }) => Ok(TokenInstruction::TransferChecked { amount, decimals }),
                Ok(_) => Ok(TokenInstruction::Other),
                Err(e) => Err(TokenError::InvalidTokenInstruction(e.to_string())),
            }
        }
    }

    /// Decodes `instruction` as a token transfer.
    ///
    /// Returns `Ok(None)` for instructions that are not SPL Token / Token-2022
    /// transfers. A transfer whose account list is too short is an error.
    pub fn decode_transfer(instruction: &Instruction) -> Result<Option<TokenTransfer>, TokenError> {
        if !Self::is_token_program(&instruction.program_id) {
            return Ok(None);
        }
        let account = |index: usize| {
            instruction
                .accounts
                .get(index)
                .map(|meta| meta.pubkey)
                .ok_or_else(|| {
                    TokenError::InvalidTokenInstruction(format!(
                        "transfer is missing account #{}",
                        index
                    ))
                })
        };

        match Self::unpack_instruction(&instruction.program_id, &instruction.data)? {
            TokenInstruction::Transfer { amount } => Ok(Some(TokenTransfer {
                program_id: instruction.program_id,
                source: account(0)?,
                destination: account(1)?,
                authority: account(2)?,
                mint: None,
                amount,
            })),
            TokenInstruction::TransferChecked { amount, .. } => Ok(Some(TokenTransfer {
                program_id: instruction.program_id,
                source: account(0)?,
                mint: Some(account(1)?),
                destination: account(2)?,
                authority: account(3)?,
                amount,
            })),
            TokenInstruction::Other => Ok(None),
        }
    }

    /// Reads `owner`'s balance of `mint`.
    ///
    /// An unknown mint, an absent holding account and a zero balance all
    /// yield `Ok(None)`.
    pub async fn token_balance<P: SolanaProviderTrait + ?Sized>(
        provider: &P,
        owner: &Pubkey,
        mint: &Pubkey,
    ) -> Result<Option<TokenBalance>, TokenError> {
        let mint_account = provider
            .get_account(mint)
            .await
            .map_err(|e| TokenError::AccountError(e.to_string()))?;
        let program_id = match mint_account {
            Some(account) if Self::is_token_program(&account.owner) => account.owner,
            Some(account) => {
                debug!("Mint {} is owned by {}, not a token program", mint, account.owner);
                return Ok(None);
            }
            None => {
                debug!("Mint {} not found", mint);
                return Ok(None);
            }
        };
        let holding_account = Self::holding_account(owner, mint, &program_id);

        let account = provider.get_account(&holding_account).await.map_err(|e| {
            TokenError::AccountError(format!(
                "Failed to fetch token account for owner {} and mint {}: {}",
                owner, mint, e
            ))
        })?;

        let Some(account) = account else {
            debug!("No holding account {} for owner {}", holding_account, owner);
            return Ok(None);
        };

        let token_account = Self::unpack_account(&program_id, &account)?;
        if token_account.amount == 0 {
            return Ok(None);
        }
        Ok(Some(TokenBalance {
            holding_account,
            mint: *mint,
            amount: token_account.amount,
        }))
    }
}
