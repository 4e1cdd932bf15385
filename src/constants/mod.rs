//! This module contains all the constant values used by the relay engine
mod compute_budget;
pub use compute_budget::*;

mod negotiation;
pub use negotiation::*;

mod confirmation;
pub use confirmation::*;

mod relayer;
pub use relayer::*;
