//! Logger module
//!
//! Provides logging utilities for the API server including:
//! - Supervisor and worker lifecycle logging
//! - Per-response `method:path` trace lines (success and error channels)
//! - Error and warning logging
//! - File-based logging support

mod format;
pub mod writer;

pub use format::DispatchTrace;

use crate::config::{Config, EnvironmentProfile};
use std::net::SocketAddr;

/// Log verbosity, ordered from least to most verbose
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Error,
    Warn,
    Info,
    Debug,
}

impl Level {
    /// Parse a configured level name; unknown names mean `info`
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "error" => Self::Error,
            "warn" | "warning" => Self::Warn,
            "debug" | "trace" => Self::Debug,
            _ => Self::Info,
        }
    }
}

/// Initialize the logger with configuration
///
/// Should be called once at process startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    writer::init(
        config.logging.trace_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
        Level::parse(&config.logging.level),
        &config.logging.format,
    )
}

fn enabled(level: Level) -> bool {
    writer::get().map_or(Level::Info, writer::LogWriter::level) >= level
}

/// Write to info log
fn write_info(message: &str) {
    match writer::get() {
        Some(w) => w.write_info(message),
        None => println!("{message}"),
    }
}

/// Write to error log
fn write_error(message: &str) {
    match writer::get() {
        Some(w) => w.write_error(message),
        None => eprintln!("{message}"),
    }
}

pub fn log_info(message: &str) {
    if enabled(Level::Info) {
        write_info(message);
    }
}

pub fn log_error(message: &str) {
    if enabled(Level::Error) {
        write_error(&format!("[ERROR] [{}] {message}", std::process::id()));
    }
}

pub fn log_warning(message: &str) {
    if enabled(Level::Warn) {
        write_error(&format!("[WARN] [{}] {message}", std::process::id()));
    }
}

pub fn log_worker_start(
    worker_id: usize,
    profile: &EnvironmentProfile,
    http_addr: &SocketAddr,
    https_addr: &SocketAddr,
) {
    log_info(&format!(
        "[Worker {worker_id}] pid {} listening on http://{http_addr} in {} mode",
        std::process::id(),
        profile.env_name
    ));
    log_info(&format!(
        "[Worker {worker_id}] pid {} listening on https://{https_addr} in {} mode",
        std::process::id(),
        profile.env_name
    ));
}

pub fn log_supervisor_start(workers: usize, profile: &EnvironmentProfile) {
    log_info("======================================");
    log_info(&format!("Supervisor pid {} started", std::process::id()));
    log_info(&format!("Environment: {}", profile.env_name));
    log_info(&format!("HTTP port: {}", profile.http_port));
    log_info(&format!("HTTPS port: {}", profile.https_port));
    log_info(&format!("Worker processes: {workers}"));
    log_info("======================================");
}

pub fn log_worker_spawned(worker_id: usize, pid: Option<u32>) {
    match pid {
        Some(pid) => log_info(&format!("[Supervisor] Worker {worker_id} started with pid {pid}")),
        None => log_info(&format!("[Supervisor] Worker {worker_id} started")),
    }
}

/// Log a worker exit; only a clean exit goes to the info log
pub fn log_worker_exit(worker_id: usize, description: &str, success: bool) {
    let message = format!("[Supervisor] Worker {worker_id} {description}");
    if success {
        log_info(&message);
    } else {
        log_error(&message);
    }
}

pub fn log_connection_accepted(peer_addr: &SocketAddr, scheme: &str) {
    if enabled(Level::Debug) {
        write_info(&format!("[Connection] Accepted {scheme} from: {peer_addr}"));
    }
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    log_error(&format!("Failed to serve connection: {err:?}"));
}

/// Record a handler failure for operators; the client only sees a generic 500
pub fn log_handler_failure(method: &str, path: &str, err: &impl std::fmt::Display) {
    log_error(&format!("Handler for {method}:{path} failed: {err}"));
}

/// Write the per-response trace line to the success or error channel
pub fn log_dispatch(method: &str, path: &str, status: u16) {
    if !enabled(Level::Debug) {
        return;
    }
    let trace = DispatchTrace::new(method, path, status);
    match writer::get() {
        Some(w) => w.write_trace(&trace),
        None => println!("{}", trace.format("text", false)),
    }
}
