//! HTTP response writing module
//!
//! Serializes a [`HandlerResult`] into the single response a connection
//! sends back, applying the status and content-type defaults.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::{Response, StatusCode};
use serde_json::Value;

use super::request::empty_object;
use crate::handler::HandlerResult;
use crate::logger;

/// Content-type tag selecting JSON serialization
pub const JSON: &str = "json";

/// Single-use response slot for one request
///
/// At most one response is committed. Writes after a commit, or after the
/// transport was closed, are dropped instead of reaching the wire.
#[derive(Debug, Default)]
pub struct Transport {
    response: Option<Response<Full<Bytes>>>,
    closed: bool,
}

impl Transport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Close the transport; later writes become no-ops
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Store the response unless one was already committed or the transport closed
    fn commit(&mut self, response: Response<Full<Bytes>>) -> bool {
        if self.response.is_some() || self.closed {
            return false;
        }
        self.response = Some(response);
        true
    }

    /// Hand the committed response to the connection
    pub fn into_response(self) -> Option<Response<Full<Bytes>>> {
        self.response
    }
}

/// Write a handler result to the transport
///
/// Returns `false` when the transport already carried a response.
pub fn write(transport: &mut Transport, method: &str, path: &str, result: HandlerResult) -> bool {
    let status = result
        .status_code
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::OK);
    let content_type = result.content_type.as_deref().unwrap_or(JSON);

    let mut builder = Response::builder().status(status);
    let body = if content_type == JSON {
        builder = builder.header(CONTENT_TYPE, "application/json");
        serialize_payload(result.payload)
    } else {
        Bytes::new()
    };

    let response = builder.body(Full::new(body)).unwrap_or_else(|e| {
        logger::log_error(&format!("Failed to build {status} response: {e}"));
        Response::new(Full::new(Bytes::new()))
    });

    if transport.commit(response) {
        logger::log_dispatch(method, path, status.as_u16());
        true
    } else {
        logger::log_warning(&format!(
            "Response for {method}:{path} already sent, dropping {status}"
        ));
        false
    }
}

/// Serialize a JSON payload; anything that is not an object or array becomes `{}`
fn serialize_payload(payload: Option<Value>) -> Bytes {
    let payload = match payload {
        Some(value @ (Value::Object(_) | Value::Array(_))) => value,
        _ => empty_object(),
    };
    match serde_json::to_vec(&payload) {
        Ok(bytes) => Bytes::from(bytes),
        Err(e) => {
            logger::log_error(&format!("Failed to serialize response: {e}"));
            Bytes::from_static(b"{}")
        }
    }
}
