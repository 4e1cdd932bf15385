mod encoded;
pub use encoded::*;

mod instruction;
pub use instruction::*;

mod sponsored;
pub use sponsored::*;

mod quote;
pub use quote::*;

mod status;
pub use status::*;
