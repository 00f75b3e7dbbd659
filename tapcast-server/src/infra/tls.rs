//! TLS termination for the HTTPS listener.
//!
//! Certificates are read once at startup from PEM files (a `mkcert`-style
//! `localhost.pem` / `localhost-key.pem` pair by default).

use axum_server::tls_rustls::RustlsConfig;
use rustls::crypto::CryptoProvider;
use rustls::version::TLS13;
use rustls::{CipherSuite, ServerConfig};
use rustls::{DEFAULT_VERSIONS, SupportedProtocolVersion};
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use std::{
    io::BufReader,
    path::{Path, PathBuf},
    sync::Arc,
};
use tapcast_config::TlsConfig;

/// TLS-related errors
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("Certificate file not found: {0}")]
    CertificateNotFound(PathBuf),

    #[error("Private key file not found: {0}")]
    PrivateKeyNotFound(PathBuf),

    #[error("Failed to parse certificate: {0}")]
    CertificateParseFailed(String),

    #[error("Failed to parse private key: {0}")]
    PrivateKeyParseFailed(String),

    #[error("No private keys found in file")]
    NoPrivateKeysFound,

    #[error("TLS configuration error: {0}")]
    ConfigurationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// TLS certificate configuration
#[derive(Clone, Debug)]
pub struct TlsCertConfig {
    /// Path to the certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the private key file (PEM format)
    pub key_path: PathBuf,
    /// Minimum TLS version (e.g., "1.2", "1.3")
    pub min_tls_version: String,
    /// Cipher suites to use (empty = use defaults)
    pub cipher_suites: Vec<String>,
}

impl From<&TlsConfig> for TlsCertConfig {
    fn from(config: &TlsConfig) -> Self {
        Self {
            cert_path: config.cert_path.clone(),
            key_path: config.key_path.clone(),
            min_tls_version: config.min_version.clone(),
            cipher_suites: config.cipher_suites.clone(),
        }
    }
}

/// Build the acceptor config for `axum_server::bind_rustls`.
pub async fn create_tls_acceptor(
    config: &TlsCertConfig,
) -> Result<RustlsConfig, TlsError> {
    let server_config = build_server_config(config).await?;
    Ok(RustlsConfig::from_config(Arc::new(server_config)))
}

/// Load certificate and key and apply version and cipher suite policy.
pub async fn build_server_config(
    config: &TlsCertConfig,
) -> Result<ServerConfig, TlsError> {
    let cert_chain = load_certificates(&config.cert_path).await?;
    let private_key = load_private_key(&config.key_path).await?;

    // "1.3" => only TLS 1.3; otherwise 1.2 + 1.3
    let versions: Vec<&'static SupportedProtocolVersion> =
        match normalize_version(&config.min_tls_version).as_str() {
            "1.3" => vec![&TLS13],
            _ => DEFAULT_VERSIONS.to_vec(),
        };

    let mut provider = CryptoProvider::get_default()
        .map(|provider| (**provider).clone())
        .unwrap_or_else(rustls::crypto::ring::default_provider);

    if !config.cipher_suites.is_empty() {
        let desired = desired_cipher_suites(&config.cipher_suites);
        if desired.is_empty() {
            return Err(TlsError::ConfigurationError(
                "No recognized cipher suite names provided; supported TLS1.3 values include: TLS13_AES_128_GCM_SHA256, TLS13_AES_256_GCM_SHA384, TLS13_CHACHA20_POLY1305_SHA256"
                    .to_string(),
            ));
        }
        provider
            .cipher_suites
            .retain(|scs| desired.contains(&scs.suite()));
        if provider.cipher_suites.is_empty() {
            return Err(TlsError::ConfigurationError(
                "Configured cipher_suites did not match any provider-supported suites"
                    .to_string(),
            ));
        }
    }

    let mut server_config = ServerConfig::builder_with_provider(provider.into())
        .with_protocol_versions(&versions)
        .map_err(|e| TlsError::ConfigurationError(e.to_string()))?
        .with_no_client_auth()
        .with_single_cert(cert_chain, private_key)
        .map_err(|e| TlsError::ConfigurationError(e.to_string()))?;

    server_config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
    Ok(server_config)
}

/// Load certificates from PEM file
async fn load_certificates(
    path: &Path,
) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    if !path.exists() {
        return Err(TlsError::CertificateNotFound(path.to_path_buf()));
    }

    let pem_data = tokio::fs::read(path).await?;
    let mut reader = BufReader::new(&pem_data[..]);
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TlsError::CertificateParseFailed(e.to_string()))?;

    if certs.is_empty() {
        return Err(TlsError::CertificateParseFailed(
            "No certificates found in file".to_string(),
        ));
    }
    Ok(certs)
}

/// Load private key from PEM file. PKCS#8, PKCS#1 and SEC1 keys are accepted.
async fn load_private_key(
    path: &Path,
) -> Result<PrivateKeyDer<'static>, TlsError> {
    if !path.exists() {
        return Err(TlsError::PrivateKeyNotFound(path.to_path_buf()));
    }

    let pem_data = tokio::fs::read(path).await?;
    let mut reader = BufReader::new(&pem_data[..]);
    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| TlsError::PrivateKeyParseFailed(e.to_string()))?
        .ok_or(TlsError::NoPrivateKeysFound)
}

/// Normalize a version string like "TLS1.3", "1.3", "tls13" to "1.3" or "1.2".
fn normalize_version(s: &str) -> String {
    let u = s.trim().to_ascii_lowercase();
    if u.contains("1.3") || u == "tls13" {
        "1.3".into()
    } else {
        "1.2".into()
    }
}

/// Map user-provided cipher suite names to rustls `CipherSuite` identifiers.
/// Names are case-insensitive; hyphens are ignored.
fn desired_cipher_suites(names: &[String]) -> Vec<CipherSuite> {
    fn norm(s: &str) -> String {
        s.chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
            .map(|c| c.to_ascii_uppercase())
            .collect()
    }

    names
        .iter()
        .map(|s| norm(s))
        .filter_map(|n| match n.as_str() {
            "TLS13_AES_128_GCM_SHA256" | "TLS1_3_AES_128_GCM_SHA256" => {
                Some(CipherSuite::TLS13_AES_128_GCM_SHA256)
            }
            "TLS13_AES_256_GCM_SHA384" | "TLS1_3_AES_256_GCM_SHA384" => {
                Some(CipherSuite::TLS13_AES_256_GCM_SHA384)
            }
            "TLS13_CHACHA20_POLY1305_SHA256"
            | "TLS1_3_CHACHA20_POLY1305_SHA256" => {
                Some(CipherSuite::TLS13_CHACHA20_POLY1305_SHA256)
            }
            "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256" => {
                Some(CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256)
            }
            "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256" => {
                Some(CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256)
            }
            _ => None,
        })
        .collect()
}
