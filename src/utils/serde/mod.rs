mod u64_amount;
pub use u64_amount::*;
