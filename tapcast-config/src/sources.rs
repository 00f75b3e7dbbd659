use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::PathBuf};
use tapcast_core::ProfileRecord;

use crate::models::ReaderBackendKind;

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub tls: FileTlsConfig,
    pub static_dir: Option<PathBuf>,
    #[serde(default)]
    pub cors: FileCorsConfig,
    #[serde(default)]
    pub reader: FileReaderConfig,
    #[serde(default)]
    pub transport: FileTransportConfig,
    pub builtin_profiles: Option<bool>,
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileRecord>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub https_port: Option<u16>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileTlsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cipher_suites: Option<Vec<String>>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileCorsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_origins: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_methods: Option<Vec<String>>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileReaderConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<ReaderBackendKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileTransportConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_queue: Option<usize>,
}

/// Environment-derived configuration values.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub server_host: Option<String>,
    pub http_port: Option<u16>,
    pub https_port: Option<u16>,
    pub tls_enabled: Option<bool>,
    pub tls_cert_path: Option<PathBuf>,
    pub tls_key_path: Option<PathBuf>,
    pub tls_min_version: Option<String>,
    pub tls_cipher_suites: Option<Vec<String>>,
    pub static_dir: Option<PathBuf>,
    pub cors_allowed_origins: Option<Vec<String>>,
    pub cors_allowed_methods: Option<Vec<String>>,
    /// Raw value; parsed during composition so a typo is reported, not ignored.
    pub reader_backend: Option<String>,
    pub reader_poll_interval_ms: Option<u64>,
    pub transport_client_queue: Option<usize>,
    pub builtin_profiles: Option<bool>,
}

impl EnvConfig {
    /// Read every recognised variable. Values that fail to parse are errors.
    pub fn gather() -> Result<Self, InvalidEnvVar> {
        Ok(Self {
            config_path: std::env::var("TAPCAST_CONFIG")
                .ok()
                .map(PathBuf::from),
            server_host: std::env::var("SERVER_HOST").ok(),
            http_port: parse_var("PORT")?,
            https_port: parse_var("HTTPS_PORT")?,
            tls_enabled: parse_bool_var("TLS_ENABLED")?,
            tls_cert_path: std::env::var("TLS_CERT_PATH")
                .ok()
                .map(PathBuf::from),
            tls_key_path: std::env::var("TLS_KEY_PATH").ok().map(PathBuf::from),
            tls_min_version: std::env::var("TLS_MIN_VERSION").ok(),
            tls_cipher_suites: parse_csv_var("TLS_CIPHER_SUITES"),
            static_dir: std::env::var("STATIC_DIR").ok().map(PathBuf::from),
            cors_allowed_origins: parse_csv_var("CORS_ALLOWED_ORIGINS"),
            cors_allowed_methods: parse_csv_var("CORS_ALLOWED_METHODS"),
            reader_backend: std::env::var("READER_BACKEND").ok(),
            reader_poll_interval_ms: parse_var("READER_POLL_INTERVAL_MS")?,
            transport_client_queue: parse_var("TRANSPORT_CLIENT_QUEUE")?,
            builtin_profiles: parse_bool_var("BUILTIN_PROFILES")?,
        })
    }
}

/// An environment variable was set to something its field cannot hold.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid value `{value}` for {name}: {reason}")]
pub struct InvalidEnvVar {
    pub name: &'static str,
    pub value: String,
    pub reason: String,
}

pub(crate) fn parse_value<T>(name: &'static str, raw: &str) -> Result<T, InvalidEnvVar>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|err: T::Err| InvalidEnvVar {
        name,
        value: raw.to_string(),
        reason: err.to_string(),
    })
}

fn parse_var<T>(name: &'static str) -> Result<Option<T>, InvalidEnvVar>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    std::env::var(name)
        .ok()
        .map(|raw| parse_value(name, &raw))
        .transpose()
}

pub(crate) fn parse_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|part| {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

fn parse_csv_var(name: &str) -> Option<Vec<String>> {
    std::env::var(name).ok().map(|raw| parse_csv(&raw))
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_bool_var(name: &'static str) -> Result<Option<bool>, InvalidEnvVar> {
    std::env::var(name)
        .ok()
        .map(|raw| {
            parse_bool(&raw).ok_or_else(|| InvalidEnvVar {
                name,
                reason: "expected true/false, yes/no, on/off or 1/0".to_string(),
                value: raw,
            })
        })
        .transpose()
}
