//! Sponsored Transaction Relay Library
//!
//! Client-side engine for fee-sponsored Solana transactions. A relayer pays
//! the network fee and is reimbursed in an SPL token through a payment
//! instruction it quotes over the exact transaction being sent. It includes:
//!
//! - Holding account derivation and balance reads
//! - Provisional transaction assembly with a fixed compute budget prefix
//! - Two-round fee negotiation with the relayer
//! - Relayer co-signing and byte-exact wallet signature injection
//! - Submission and confirmation bounded by blockhash expiry
//!
//! # Module Structure
//!
//! - `config`: Environment-driven client configuration
//! - `constants`: Protocol and default values
//! - `domain`: The relay engine and its components
//! - `logging`: Logging setup
//! - `models`: Wire types, transaction value objects and errors
//! - `services`: Ledger RPC, relayer HTTP client and wallet signers
//! - `utils`: Common utilities and helper functions

pub mod config;
pub mod constants;
pub mod domain;
pub mod logging;
pub mod models;
pub mod services;
pub mod utils;
