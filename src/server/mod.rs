// Server module entry
// Process supervision, worker runtime, listeners, TLS and connection handling

pub mod connection;
pub mod listener;
pub mod signal;
pub mod supervisor;
pub mod tls;
pub mod worker;

pub use supervisor::Role;
