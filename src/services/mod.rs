//! # Services Module
//!
//! External collaborators of the relay engine: the ledger RPC provider, the
//! Relayer Service HTTP client, and the wallet signer.

mod provider;
pub use provider::*;

mod relayer;
pub use relayer::*;

mod signer;
pub use signer::*;
