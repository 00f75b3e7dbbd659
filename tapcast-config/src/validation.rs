use axum::http::Method;
use thiserror::Error;

use crate::models::{Config, CorsConfig};

#[derive(Debug, Error)]
pub enum ConfigGuardRailError {
    #[error(
        "HTTP and HTTPS listeners cannot share port {port}; set PORT and HTTPS_PORT to different values"
    )]
    PortConflict { port: u16 },
    #[error("invalid CORS configuration: {reason}")]
    InvalidCorsConfig { reason: String },
    #[error("TRANSPORT_CLIENT_QUEUE must be at least 1")]
    EmptyClientQueue,
    #[error("READER_POLL_INTERVAL_MS must be greater than zero")]
    ZeroPollInterval,
}

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigWarning> {
        self.items.iter()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }
}

pub fn apply_guard_rails(
    config: &Config,
) -> Result<ConfigWarnings, ConfigGuardRailError> {
    let mut warnings = ConfigWarnings::default();

    if config.tls.enabled && config.server.http_port == config.server.https_port
    {
        return Err(ConfigGuardRailError::PortConflict {
            port: config.server.http_port,
        });
    }

    if config.transport.client_queue == 0 {
        return Err(ConfigGuardRailError::EmptyClientQueue);
    }

    if config.reader.poll_interval_ms == 0 {
        return Err(ConfigGuardRailError::ZeroPollInterval);
    }

    validate_cors(&config.cors)?;

    if !config.tls.enabled {
        warnings.push("TLS disabled; only the plaintext listener will start");
    } else if !config.tls.material_present() {
        warnings.push_with_hint(
            format!(
                "TLS material not found ({} / {}); the HTTPS listener is disabled",
                config.tls.cert_path.display(),
                config.tls.key_path.display()
            ),
            "Generate a localhost certificate (e.g. `mkcert localhost`) or set TLS_CERT_PATH and TLS_KEY_PATH",
        );
    }

    if !config.static_dir.is_dir() {
        warnings.push_with_hint(
            format!(
                "static directory {} does not exist; only API routes will answer",
                config.static_dir.display()
            ),
            "Set STATIC_DIR to the folder holding the display page",
        );
    }

    if !config.builtin_profiles && config.profiles.is_empty() {
        warnings.push_with_hint(
            "profile store is empty; every scan will broadcast a null profile",
            "Add [profiles.\"<uid>\"] tables to tapcast.toml",
        );
    }

    Ok(warnings)
}

fn validate_cors(cors: &CorsConfig) -> Result<(), ConfigGuardRailError> {
    if cors.allowed_origins.is_empty() {
        return Err(ConfigGuardRailError::InvalidCorsConfig {
            reason: "CORS_ALLOWED_ORIGINS must include at least one origin"
                .into(),
        });
    }

    if cors.allowed_methods.is_empty() {
        return Err(ConfigGuardRailError::InvalidCorsConfig {
            reason:
                "CORS_ALLOWED_METHODS must include at least one HTTP method"
                    .into(),
        });
    }

    for method in &cors.allowed_methods {
        Method::from_bytes(method.as_bytes()).map_err(|_| {
            ConfigGuardRailError::InvalidCorsConfig {
                reason: format!(
                    "invalid HTTP method `{}` in CORS_ALLOWED_METHODS",
                    method
                ),
            }
        })?;
    }

    Ok(())
}
