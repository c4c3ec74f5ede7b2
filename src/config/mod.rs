// Configuration module entry point
// Loads the layered configuration and resolves the active environment profile

mod state;
mod types;

use std::net::SocketAddr;

use crate::error::ServerError;

// Re-export public types
pub use state::AppState;
pub use types::{Config, EnvironmentProfile, TlsConfig, DEFAULT_ENVIRONMENT};

/// Default config file name (without extension)
const DEFAULT_CONFIG_PATH: &str = "config";

impl Config {
    /// Load configuration from `HELLO_API_CONFIG` or `config.toml`,
    /// selecting the environment profile named by `APP_ENV`
    pub fn load() -> Result<Self, ServerError> {
        let path = std::env::var("HELLO_API_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let environment = std::env::var("APP_ENV").ok();
        Ok(Self::load_from(&path, environment.as_deref())?)
    }

    /// Load configuration from specified file path (without extension)
    pub fn load_from(
        config_path: &str,
        environment: Option<&str>,
    ) -> Result<Self, config::ConfigError> {
        let staging = EnvironmentProfile::staging();
        let production = EnvironmentProfile::production();

        let settings = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.supervise", true)?
            .set_default("environments.staging.http_port", i64::from(staging.http_port))?
            .set_default("environments.staging.https_port", i64::from(staging.https_port))?
            .set_default("environments.staging.env_name", staging.env_name)?
            .set_default("environments.production.http_port", i64::from(production.http_port))?
            .set_default("environments.production.https_port", i64::from(production.https_port))?
            .set_default("environments.production.env_name", production.env_name)?
            .set_default("tls.cert_path", "https/cert.pem")?
            .set_default("tls.key_path", "https/key.pem")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "text")?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("http.max_body_size", 1_048_576)? // 1MB
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("HELLO_API")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_override_option("server.environment", environment.map(str::to_lowercase))?
            .build()?;

        settings.try_deserialize()
    }

    /// Active environment profile, falling back to staging for unknown names
    pub fn profile(&self) -> EnvironmentProfile {
        self.server
            .environment
            .as_deref()
            .map(str::to_lowercase)
            .and_then(|name| self.environments.get(&name).cloned())
            .or_else(|| self.environments.get(DEFAULT_ENVIRONMENT).cloned())
            .unwrap_or_else(EnvironmentProfile::staging)
    }

    pub fn http_socket_addr(&self) -> Result<SocketAddr, ServerError> {
        socket_addr(&self.server.host, self.profile().http_port)
    }

    pub fn https_socket_addr(&self) -> Result<SocketAddr, ServerError> {
        socket_addr(&self.server.host, self.profile().https_port)
    }

    /// Number of worker processes the supervisor starts
    pub fn worker_count(&self) -> usize {
        self.server
            .workers
            .filter(|&n| n > 0)
            .unwrap_or_else(num_cpus::get)
    }
}

fn socket_addr(host: &str, port: u16) -> Result<SocketAddr, ServerError> {
    let addr = if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    };
    addr.parse()
        .map_err(|e| ServerError::InvalidAddress(format!("{addr}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(environment: Option<&str>) -> Config {
        Config::load_from("does-not-exist", environment).unwrap()
    }

    #[test]
    fn test_defaults_to_staging_profile() {
        let cfg = load(None);
        assert_eq!(cfg.profile(), EnvironmentProfile::staging());
        assert_eq!(cfg.http_socket_addr().unwrap().port(), 3000);
        assert_eq!(cfg.https_socket_addr().unwrap().port(), 3001);
    }

    #[test]
    fn test_production_profile_is_case_insensitive() {
        let cfg = load(Some("PRODUCTION"));
        let profile = cfg.profile();
        assert_eq!(profile.env_name, "production");
        assert_eq!(profile.http_port, 5000);
        assert_eq!(profile.https_port, 5001);
    }

    #[test]
    fn test_unknown_environment_falls_back_to_staging() {
        let cfg = load(Some("qa"));
        assert_eq!(cfg.profile().env_name, "staging");
    }

    #[test]
    fn test_ipv6_host_is_bracketed() {
        let mut cfg = load(None);
        cfg.server.host = "::1".to_string();
        let addr = cfg.http_socket_addr().unwrap();
        assert!(addr.is_ipv6());
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_invalid_host_is_rejected() {
        let mut cfg = load(None);
        cfg.server.host = "not a host".to_string();
        assert!(matches!(
            cfg.http_socket_addr(),
            Err(ServerError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_worker_count_override() {
        let mut cfg = load(None);
        cfg.server.workers = Some(3);
        assert_eq!(cfg.worker_count(), 3);
        cfg.server.workers = Some(0);
        assert_eq!(cfg.worker_count(), num_cpus::get());
    }
}
