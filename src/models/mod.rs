//! # Models Module
//!
//! Contains core data structures and type definitions for the relay engine:
//! the Relayer Service wire format, the transaction value objects exchanged
//! between engine components, and the error taxonomy.

mod error;
pub use error::*;

mod relayer;
pub use relayer::*;

mod transaction;
pub use transaction::*;
