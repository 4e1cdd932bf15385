//! # Domain Module
//!
//! Core domain logic of the sponsored relay:
//!
//! * Holding account resolution and balances
//! * Provisional transaction assembly
//! * Two-round fee negotiation with the relayer
//! * Co-signing and signature injection
//! * Submission and confirmation
mod relay;
pub use relay::*;
