mod relay;
pub use relay::*;

mod signer;
pub use signer::*;
