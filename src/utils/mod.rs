mod serde;
pub use serde::*;

mod uuid;
pub use uuid::*;

mod base64;
pub use base64::*;

mod wire;
pub use wire::*;
