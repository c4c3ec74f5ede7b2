//! Request handler module
//!
//! Handler contract, the built-in handlers, the static route table and the
//! per-request dispatcher.

pub mod dispatch;
pub mod hello;
pub mod router;

use serde_json::{json, Value};

use crate::http::{IncomingRequest, JSON};

// Re-export main entry points
pub use dispatch::handle_request;
pub use router::Router;

/// A handler turns one parsed request into exactly one result
pub type Handler = fn(&IncomingRequest) -> Result<HandlerResult, HandlerError>;

/// Typed handler failure; the details stay in the operator logs
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// For handlers that can fail; `hello` and `not_found` never do
    #[cfg_attr(not(test), allow(dead_code))]
    #[error("{0}")]
    Failed(String),

    #[error("handler panicked: {0}")]
    Panicked(String),
}

/// What a handler asks the response writer to send
///
/// Missing fields are filled in by the writer: status 200, content type
/// `json`, and an empty JSON object as payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandlerResult {
    pub status_code: Option<u16>,
    pub payload: Option<Value>,
    pub content_type: Option<String>,
}

impl HandlerResult {
    /// Result carrying only a status code
    pub const fn status(code: u16) -> Self {
        Self {
            status_code: Some(code),
            payload: None,
            content_type: None,
        }
    }

    /// JSON result with status and payload
    pub fn json(code: u16, payload: Value) -> Self {
        Self {
            status_code: Some(code),
            payload: Some(payload),
            content_type: Some(JSON.to_string()),
        }
    }

    /// Fixed result sent when a handler fails
    pub fn internal_error() -> Self {
        Self::json(500, json!({"Error": "An unknown error has occurred"}))
    }

    /// Result sent when a declared body exceeds `http.max_body_size`
    pub fn payload_too_large() -> Self {
        Self::json(413, json!({"Error": "Payload too large"}))
    }
}
