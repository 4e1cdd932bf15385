//! Request and response bodies of the Relayer Service HTTP API.
mod request;
pub use request::*;

mod response;
pub use response::*;
