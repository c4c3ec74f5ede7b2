//! TLS material loading using rustls
//!
//! The key and certificate are read once when a worker starts. Missing or
//! unusable material is a startup error: a worker never serves plain HTTP
//! alone because its TLS listener could not be configured.

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;
use tokio_rustls::TlsAcceptor;

use crate::config::TlsConfig;
use crate::error::ServerError;

/// Build the acceptor used by the HTTPS listener
pub fn load_acceptor(config: &TlsConfig) -> Result<TlsAcceptor, ServerError> {
    let certs = load_certs(&config.cert_path)?;
    let key = load_private_key(&config.key_path)?;

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut server_config = rustls::ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| ServerError::Tls(e.to_string()))?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| ServerError::Tls(e.to_string()))?;
    server_config.alpn_protocols = vec![b"http/1.1".to_vec()];

    Ok(TlsAcceptor::from(Arc::new(server_config)))
}

/// Load certificates from PEM file
pub fn load_certs(path: &str) -> Result<Vec<CertificateDer<'static>>, ServerError> {
    let mut reader = open(path, "cert")?;

    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ServerError::Tls(format!("Failed to parse certs in {path}: {e}")))?;

    if certs.is_empty() {
        return Err(ServerError::Tls(format!("No certificates found in {path}")));
    }

    Ok(certs)
}

/// Load the first private key (PKCS#1, PKCS#8 or SEC1) from PEM file
pub fn load_private_key(path: &str) -> Result<PrivateKeyDer<'static>, ServerError> {
    let mut reader = open(path, "key")?;

    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| ServerError::Tls(format!("Failed to parse key in {path}: {e}")))?
        .ok_or_else(|| ServerError::Tls(format!("No private key found in {path}")))
}

fn open(path: &str, kind: &str) -> Result<BufReader<File>, ServerError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| ServerError::Tls(format!("Failed to open {kind} file {path}: {e}")))
}
