//! Startup and supervision errors
//!
//! Per-request failures never reach this type: the dispatcher turns them
//! into a 500 response. Everything here is fatal for the process that
//! returns it.

use std::io;
use std::net::SocketAddr;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid worker id: {0}")]
    InvalidWorkerId(String),
}
