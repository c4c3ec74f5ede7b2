//! Request parsing module
//!
//! Turns the pieces of a received HTTP request into an [`IncomingRequest`].
//! Parsing never fails: malformed query strings and bodies degrade to empty
//! values so the request can still be routed.

use hyper::header::HeaderMap;
use hyper::{Method, Uri};
use serde_json::Value;
use std::collections::HashMap;

/// Parsed request handed to handlers
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingRequest {
    /// Path with leading and trailing `/` removed
    pub path: String,
    /// Decoded query parameters; the last occurrence of a key wins
    pub query_params: HashMap<String, String>,
    /// Lowercase method token
    pub method: String,
    /// Request headers; repeated headers are joined with `", "`
    pub headers: HashMap<String, String>,
    /// Decoded JSON body, or an empty object when absent or invalid
    pub body: Value,
}

impl IncomingRequest {
    /// Build a request from its HTTP parts and the fully accumulated body
    pub fn parse(method: &Method, uri: &Uri, headers: &HeaderMap, body: &[u8]) -> Self {
        Self {
            path: normalize_path(uri.path()),
            query_params: parse_query(uri.query().unwrap_or_default()),
            method: method.as_str().to_ascii_lowercase(),
            headers: collect_headers(headers),
            body: parse_body(body),
        }
    }
}

/// Strip every leading and trailing `/`
pub fn normalize_path(path: &str) -> String {
    path.trim_matches('/').to_string()
}

/// Parse `key=value&key2=value2` into a map
pub fn parse_query(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Decode the body as JSON, falling back to `{}`
pub fn parse_body(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap_or_else(|_| empty_object())
}

pub fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

fn collect_headers(headers: &HeaderMap) -> HashMap<String, String> {
    let mut map: HashMap<String, String> = HashMap::with_capacity(headers.keys_len());
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        map.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }
    map
}
