//! Built-in handlers
//!
//! `hello` greets the caller by the `name` field of a POSTed JSON body;
//! `not_found` answers every unregistered path.

use serde_json::json;

use super::{HandlerError, HandlerResult};
use crate::http::IncomingRequest;

/// Name used when the body carries no usable `name`
pub const FALLBACK_NAME: &str = "anonymouse";

/// Greet the caller, tagging the reply with the serving process id
pub fn hello(req: &IncomingRequest) -> Result<HandlerResult, HandlerError> {
    let pid = std::process::id();

    if req.method != "post" {
        return Ok(HandlerResult::json(
            405,
            json!({"payload": format!("Method not allowed, use post [{pid}]")}),
        ));
    }

    let name = req
        .body
        .get("name")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(FALLBACK_NAME);

    Ok(HandlerResult::json(
        200,
        json!({"payload": format!("Hello, {name} [{pid}]")}),
    ))
}

/// Answer unregistered paths with a bare 404
#[allow(clippy::unnecessary_wraps)]
pub const fn not_found(_req: &IncomingRequest) -> Result<HandlerResult, HandlerError> {
    Ok(HandlerResult::status(404))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::collections::HashMap;

    fn request(method: &str, body: Value) -> IncomingRequest {
        IncomingRequest {
            path: "hello".to_string(),
            query_params: HashMap::new(),
            method: method.to_string(),
            headers: HashMap::new(),
            body,
        }
    }

    fn greeting(name: &str) -> Value {
        json!({"payload": format!("Hello, {name} [{}]", std::process::id())})
    }

    #[test]
    fn test_hello_with_name() {
        let result = hello(&request("post", json!({"name": "Ada"}))).unwrap();
        assert_eq!(result, HandlerResult::json(200, greeting("Ada")));
    }

    #[test]
    fn test_hello_trims_name() {
        let result = hello(&request("post", json!({"name": "  Grace \n"}))).unwrap();
        assert_eq!(result.payload, Some(greeting("Grace")));
    }

    #[test]
    fn test_hello_falls_back_to_anonymouse() {
        let bodies = [
            json!({"name": "   "}),
            json!({}),
            json!({"name": 42}),
            json!({"name": null}),
            json!(["Ada"]),
            json!("Ada"),
        ];
        for body in bodies {
            let result = hello(&request("post", body)).unwrap();
            assert_eq!(result.status_code, Some(200));
            assert_eq!(result.payload, Some(greeting(FALLBACK_NAME)));
        }
    }

    #[test]
    fn test_hello_rejects_other_methods() {
        let expected = json!({
            "payload": format!("Method not allowed, use post [{}]", std::process::id())
        });
        for method in ["get", "put", "delete", "patch", "head", "options"] {
            let result = hello(&request(method, json!({"name": "Ada"}))).unwrap();
            assert_eq!(result.status_code, Some(405), "method {method}");
            assert_eq!(result.payload.as_ref(), Some(&expected));
            assert_eq!(result.content_type.as_deref(), Some("json"));
        }
    }

    #[test]
    fn test_hello_is_repeatable() {
        let req = request("post", json!({"name": "Ada"}));
        assert_eq!(hello(&req).unwrap(), hello(&req).unwrap());
    }

    #[test]
    fn test_not_found_has_no_payload() {
        let result = not_found(&request("get", json!({}))).unwrap();
        assert_eq!(result, HandlerResult::status(404));
    }
}
