use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};
use tapcast_core::{CardId, ProfileRecord, ProfileStore};

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub tls: TlsConfig,
    pub static_dir: PathBuf,
    pub cors: CorsConfig,
    pub reader: ReaderConfig,
    pub transport: TransportConfig,
    /// Whether the demo profiles are part of the store.
    pub builtin_profiles: bool,
    /// Extra profiles from the config file, layered over the built-ins.
    pub profiles: BTreeMap<CardId, ProfileRecord>,
    pub metadata: ConfigMetadata,
}

impl Config {
    /// Build the read-only profile store this configuration describes.
    pub fn profile_store(&self) -> ProfileStore {
        let base = if self.builtin_profiles {
            ProfileStore::builtin()
        } else {
            ProfileStore::empty()
        };
        base.with_overrides(
            self.profiles
                .iter()
                .map(|(id, record)| (id.clone(), record.clone())),
        )
    }

    pub fn static_dir(&self) -> &Path {
        &self.static_dir
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub http_port: u16,
    pub https_port: u16,
}

#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub enabled: bool,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub min_version: String,
    pub cipher_suites: Vec<String>,
}

impl TlsConfig {
    /// True when both PEM files exist on disk.
    pub fn material_present(&self) -> bool {
        self.cert_path.exists() && self.key_path.exists()
    }
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
}

impl CorsConfig {
    pub fn is_wildcard_included(&self) -> bool {
        self.allowed_origins.iter().any(|origin| origin == "*")
    }
}

#[derive(Debug, Clone)]
pub struct ReaderConfig {
    pub backend: ReaderBackendKind,
    pub poll_interval_ms: u64,
}

impl ReaderConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Which reader backend the server brings up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReaderBackendKind {
    /// PC/SC smart card readers (ACR122U and friends).
    Pcsc,
    /// One card id per line on standard input.
    Stdin,
    /// Scanning disabled.
    None,
}

impl Default for ReaderBackendKind {
    /// PC/SC when the build includes it, otherwise scanning starts off.
    fn default() -> Self {
        if cfg!(feature = "pcsc") {
            Self::Pcsc
        } else {
            Self::None
        }
    }
}

impl ReaderBackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pcsc => "pcsc",
            Self::Stdin => "stdin",
            Self::None => "none",
        }
    }
}

impl fmt::Display for ReaderBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown reader backend `{0}` (expected pcsc, stdin or none)")]
pub struct UnknownReaderBackend(pub String);

impl FromStr for ReaderBackendKind {
    type Err = UnknownReaderBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pcsc" | "nfc" => Ok(Self::Pcsc),
            "stdin" | "keyboard" => Ok(Self::Stdin),
            "none" | "off" | "disabled" => Ok(Self::None),
            other => Err(UnknownReaderBackend(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Frames buffered per WebSocket client before new ones are dropped.
    pub client_queue: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}
