//! Compute budget defaults and instruction discriminators.

/// Default compute unit limit requested for sponsored transactions.
pub const DEFAULT_COMPUTE_UNIT_LIMIT: u32 = 200_000;

/// Default compute unit price (micro-lamports). Zero omits the instruction.
pub const DEFAULT_COMPUTE_UNIT_PRICE: u64 = 0;

/// `ComputeBudgetInstruction::SetComputeUnitLimit` tag byte.
pub const SET_COMPUTE_UNIT_LIMIT_TAG: u8 = 2;

/// `ComputeBudgetInstruction::SetComputeUnitPrice` tag byte.
pub const SET_COMPUTE_UNIT_PRICE_TAG: u8 = 3;
