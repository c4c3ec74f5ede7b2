// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;
use std::collections::HashMap;

/// Profile used when the requested environment is unknown
pub const DEFAULT_ENVIRONMENT: &str = "staging";

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    /// Named environment profiles (staging, production, ...)
    pub environments: HashMap<String, EnvironmentProfile>,
    pub tls: TlsConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
}

/// Port selection for one deployment environment
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct EnvironmentProfile {
    pub http_port: u16,
    pub https_port: u16,
    pub env_name: String,
}

impl EnvironmentProfile {
    pub fn staging() -> Self {
        Self {
            http_port: 3000,
            https_port: 3001,
            env_name: "staging".to_string(),
        }
    }

    pub fn production() -> Self {
        Self {
            http_port: 5000,
            https_port: 5001,
            env_name: "production".to_string(),
        }
    }
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    /// Requested environment profile name (from `APP_ENV`)
    #[serde(default)]
    pub environment: Option<String>,
    /// Worker process count, defaults to the number of logical CPUs
    #[serde(default)]
    pub workers: Option<usize>,
    /// Run the master/worker supervisor; `false` serves from a single process
    pub supervise: bool,
}

/// TLS material locations (PEM)
#[derive(Debug, Deserialize, Clone)]
pub struct TlsConfig {
    pub cert_path: String,
    pub key_path: String,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// error, warn, info or debug
    pub level: String,
    /// Trace line format (text or json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Trace/info log file path (optional, stdout if not set)
    #[serde(default)]
    pub trace_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_log_format() -> String {
    "text".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive: bool,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub max_connections: Option<u64>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub max_body_size: u64,
}
