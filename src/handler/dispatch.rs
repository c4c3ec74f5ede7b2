//! Request dispatch module
//!
//! Drives one request end to end: accumulate the body, parse, route, run the
//! handler, write the response. Handler failures (errors and panics) are
//! contained here and replaced by a fixed 500 result.

use http_body_util::{BodyExt, Full, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderMap, CONTENT_LENGTH};
use hyper::{Request, Response};
use std::any::Any;
use std::cell::Cell;
use std::convert::Infallible;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use super::{Handler, HandlerError, HandlerResult, Router};
use crate::config::AppState;
use crate::http::{self, request::normalize_path, IncomingRequest, Transport};
use crate::logger;

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (parts, body) = req.into_parts();
    let max_body_size = state.config.http.max_body_size;
    let mut transport = Transport::new();

    if exceeds_body_limit(&parts.headers, max_body_size) {
        let method = parts.method.as_str().to_ascii_lowercase();
        let path = normalize_path(parts.uri.path());
        http::write(&mut transport, &method, &path, HandlerResult::payload_too_large());
    } else {
        let bytes = read_body(body, max_body_size).await;
        let request = IncomingRequest::parse(&parts.method, &parts.uri, &parts.headers, &bytes);
        dispatch(&state.router, &request, &mut transport);
    }

    Ok(transport.into_response().unwrap_or_else(|| {
        logger::log_error("No response was committed, sending 500");
        let mut fallback = Transport::new();
        http::write(&mut fallback, "", "", HandlerResult::internal_error());
        fallback.into_response().unwrap_or_default()
    }))
}

/// Route a parsed request and write exactly one response for it
///
/// The transport is closed afterwards, so nothing else can write to it.
pub fn dispatch(router: &Router, request: &IncomingRequest, transport: &mut Transport) {
    let handler = router.lookup(&request.path);

    let result = match invoke(handler, request) {
        Ok(result) => result,
        Err(err) => {
            logger::log_handler_failure(&request.method, &request.path, &err);
            HandlerResult::internal_error()
        }
    };

    http::write(transport, &request.method, &request.path, result);
    transport.close();
}

thread_local! {
    /// Set while a handler runs on this thread
    static IN_HANDLER: Cell<bool> = const { Cell::new(false) };
}

/// Route panic reports through the logger
///
/// Panics raised inside a handler are skipped here: the dispatcher already
/// logs them once as handler failures. Call once per process at startup.
pub fn install_panic_hook() {
    install_panic_hook_with(logger::log_error);
}

fn install_panic_hook_with(report: fn(&str)) {
    panic::set_hook(Box::new(move |info| {
        if !IN_HANDLER.with(Cell::get) {
            report(&format!("Panic: {info}"));
        }
    }));
}

/// Run a handler, turning a panic into a typed failure
fn invoke(handler: Handler, request: &IncomingRequest) -> Result<HandlerResult, HandlerError> {
    IN_HANDLER.with(|flag| flag.set(true));
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(request)));
    IN_HANDLER.with(|flag| flag.set(false));
    outcome.unwrap_or_else(|panic| Err(HandlerError::Panicked(panic_message(&*panic))))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Check the declared Content-Length against the configured limit
fn exceeds_body_limit(headers: &HeaderMap, max_body_size: u64) -> bool {
    let Some(content_length) = headers.get(CONTENT_LENGTH) else {
        return false;
    };
    match content_length.to_str().map(str::parse::<u64>) {
        Ok(Ok(size)) if size > max_body_size => {
            logger::log_warning(&format!(
                "Request body too large: {size} bytes (max: {max_body_size})"
            ));
            true
        }
        Ok(Ok(_)) => false,
        _ => {
            logger::log_warning("Invalid Content-Length value, skipping size check");
            false
        }
    }
}

/// Accumulate the whole body; a failed or oversized read counts as no body
async fn read_body<B>(body: B, max_body_size: u64) -> Bytes
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    match Limited::new(body, limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            logger::log_warning(&format!("Failed to read request body: {e}"));
            Bytes::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::handler::hello::hello;
    use hyper::{Method, StatusCode};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    fn state() -> Arc<AppState> {
        let config = Config::load_from("does-not-exist", None).unwrap();
        Arc::new(AppState::new(&config, Router::new()))
    }

    fn parsed(path: &str, method: &str) -> IncomingRequest {
        IncomingRequest {
            path: path.to_string(),
            query_params: HashMap::new(),
            method: method.to_string(),
            headers: HashMap::new(),
            body: json!({}),
        }
    }

    async fn send(method: Method, uri: &str, body: &'static str) -> (StatusCode, Bytes) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .body(Full::new(Bytes::from_static(body.as_bytes())))
            .unwrap();
        let response = handle_request(req, state()).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, body)
    }

    fn json_body(bytes: &Bytes) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    fn failing(_req: &IncomingRequest) -> Result<HandlerResult, HandlerError> {
        Err(HandlerError::Failed("database password is hunter2".to_string()))
    }

    fn panicking(_req: &IncomingRequest) -> Result<HandlerResult, HandlerError> {
        panic!("boom")
    }

    async fn committed_body(transport: Transport) -> (StatusCode, Value) {
        let response = transport.into_response().unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, json_body(&body))
    }

    #[tokio::test]
    async fn test_post_hello() {
        let (status, body) = send(Method::POST, "/hello", r#"{"name": "Ada"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json_body(&body),
            json!({"payload": format!("Hello, Ada [{}]", std::process::id())})
        );
    }

    #[tokio::test]
    async fn test_post_hello_with_slashes_and_query() {
        let (status, body) = send(Method::POST, "//hello/?lang=en", r#"{"name": "Ada"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert!(json_body(&body)["payload"]
            .as_str()
            .unwrap()
            .starts_with("Hello, Ada ["));
    }

    #[tokio::test]
    async fn test_post_hello_invalid_body_uses_fallback() {
        for payload in ["", "{not json", r#"{"name": "   "}"#, r#"{"other": 1}"#] {
            let (status, body) = send(Method::POST, "/hello", payload).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(
                json_body(&body),
                json!({"payload": format!("Hello, anonymouse [{}]", std::process::id())})
            );
        }
    }

    #[tokio::test]
    async fn test_get_hello_not_allowed() {
        let (status, body) = send(Method::GET, "/hello", r#"{"name": "Ada"}"#).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            json_body(&body),
            json!({"payload": format!("Method not allowed, use post [{}]", std::process::id())})
        );
    }

    #[tokio::test]
    async fn test_unknown_path_is_404_for_every_method() {
        let methods = [
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ];
        for method in methods {
            let (status, body) = send(method, "/missing", "{}").await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body, Bytes::from_static(b"{}"));
        }
    }

    #[tokio::test]
    async fn test_declared_body_over_limit_is_rejected() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/hello")
            .header(CONTENT_LENGTH, "10485760")
            .body(Full::new(Bytes::from_static(b"{}")))
            .unwrap();
        let response = handle_request(req, state()).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_failing_handler_yields_fixed_500() {
        let router = Router::with_routes([("fail", failing as Handler)]);
        let mut transport = Transport::new();
        dispatch(&router, &parsed("fail", "get"), &mut transport);

        let (status, body) = committed_body(transport).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"Error": "An unknown error has occurred"}));
        assert!(!body.to_string().contains("hunter2"));
    }

    #[tokio::test]
    async fn test_panicking_handler_yields_fixed_500() {
        let router = Router::with_routes([("panic", panicking as Handler)]);
        let mut transport = Transport::new();
        dispatch(&router, &parsed("panic", "post"), &mut transport);

        let (status, body) = committed_body(transport).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"Error": "An unknown error has occurred"}));
    }

    #[test]
    fn test_dispatch_writes_exactly_once() {
        let router = Router::with_routes([("hello", hello as Handler), ("fail", failing as Handler)]);
        for path in ["hello", "fail", "missing"] {
            let mut transport = Transport::new();
            dispatch(&router, &parsed(path, "post"), &mut transport);
            assert!(!http::write(
                &mut transport,
                "post",
                path,
                HandlerResult::status(200)
            ));
            assert!(transport.into_response().is_some());
        }
    }

    fn count_lines(path: &std::path::Path, needles: &[&str]) -> usize {
        std::fs::read_to_string(path)
            .unwrap_or_default()
            .lines()
            .filter(|line| needles.iter().all(|needle| line.contains(needle)))
            .count()
    }

    #[test]
    fn test_handler_failure_is_logged_once() {
        let (info_log, error_log) = logger::writer::init_for_tests();
        let router = Router::with_routes([
            ("fail-once", failing as Handler),
            ("panic-once", panicking as Handler),
        ]);

        for path in ["fail-once", "panic-once"] {
            let mut transport = Transport::new();
            dispatch(&router, &parsed(path, "post"), &mut transport);
        }

        assert_eq!(count_lines(&error_log, &["post:fail-once failed", "hunter2"]), 1);
        assert_eq!(count_lines(&error_log, &["post:panic-once failed", "boom"]), 1);
        assert_eq!(count_lines(&error_log, &["post:fail-once 500"]), 1);
        assert_eq!(count_lines(&error_log, &["post:panic-once 500"]), 1);
        assert_eq!(count_lines(&info_log, &["-once"]), 0);
    }

    thread_local! {
        static REPORTED: Cell<usize> = const { Cell::new(0) };
    }

    fn count_report(_message: &str) {
        REPORTED.with(|n| n.set(n.get() + 1));
    }

    #[test]
    fn test_panic_hook_skips_handler_panics() {
        install_panic_hook_with(count_report);

        let router = Router::with_routes([("panic", panicking as Handler)]);
        let mut transport = Transport::new();
        dispatch(&router, &parsed("panic", "get"), &mut transport);
        let handler_reports = REPORTED.with(Cell::get);

        let outside = panic::catch_unwind(|| panic!("outside a handler"));
        let outside_reports = REPORTED.with(Cell::get);

        drop(panic::take_hook());
        assert!(outside.is_err());
        assert_eq!(handler_reports, 0);
        assert_eq!(outside_reports, 1);
        assert!(!IN_HANDLER.with(Cell::get));
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(&*payload), "static message");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_message(&*payload), "owned message");
        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(&*payload), "unknown panic payload");
    }
}
