//! HTTP protocol layer module
//!
//! Request parsing and response writing, independent of which listener
//! (plain or TLS) the request arrived on.

pub mod request;
pub mod response;

// Re-export commonly used types
pub use request::IncomingRequest;
pub use response::{write, Transport, JSON};
