use once_cell::sync::Lazy;
use std::{collections::BTreeMap, fs, path::PathBuf};
use tapcast_core::CardId;
use thiserror::Error;

use crate::{
    constants::{
        DEFAULT_CLIENT_QUEUE, DEFAULT_HOST, DEFAULT_HTTP_PORT,
        DEFAULT_HTTPS_PORT, DEFAULT_READER_POLL_INTERVAL_MS,
        DEFAULT_STATIC_DIR, DEFAULT_TLS_CERT_PATH, DEFAULT_TLS_KEY_PATH,
        DEFAULT_TLS_MIN_VERSION,
    },
    models::{
        Config, ConfigMetadata, CorsConfig, ReaderBackendKind, ReaderConfig,
        ServerConfig, TlsConfig, TransportConfig, UnknownReaderBackend,
    },
    sources::{EnvConfig, FileConfig, InvalidEnvVar},
    validation::{self, ConfigGuardRailError, ConfigWarnings},
};

static DEFAULT_CONFIG_LOCATIONS: Lazy<Vec<PathBuf>> = Lazy::new(|| {
    vec![
        PathBuf::from("tapcast.toml"),
        PathBuf::from("config/tapcast.toml"),
    ]
});

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    /// Load `.env`, gather the process environment and compose the result.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(
                |err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                },
            )?,
            None => {
                dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                })?
            }
        };

        let mut load = self.load_with_env(EnvConfig::gather()?)?;
        load.config.metadata.env_file_loaded = env_file_loaded;
        Ok(load)
    }

    /// Compose from an already gathered environment. Does not touch `.env`.
    pub fn load_with_env(
        &self,
        env: EnvConfig,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        let (file_config, config_path) = self.load_file_config(&env)?;
        let (config, warnings) =
            self.compose_config(file_config, env, config_path)?;
        Ok(ConfigLoad { config, warnings })
    }

    fn load_file_config(
        &self,
        env_config: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let mut source = ConfigPathSource::default();

        if let Some(explicit) = &self.options.config_path {
            source.explicit = Some(explicit.clone());
        } else if let Some(from_env) = &env_config.config_path {
            source.env = Some(from_env.clone());
        }

        if source.is_empty() {
            source.default = DEFAULT_CONFIG_LOCATIONS
                .iter()
                .find(|candidate| candidate.exists())
                .cloned();
        }

        let Some((path, provenance)) = source.resolved_path() else {
            return Ok((None, None));
        };

        if !path.exists() {
            if provenance.is_explicit() {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            return Ok((None, None));
        }

        let contents =
            fs::read_to_string(&path).map_err(|err| ConfigLoadError::Io {
                path: path.clone(),
                source: err,
            })?;
        let file_config: FileConfig =
            toml::from_str(&contents).map_err(|err| {
                ConfigLoadError::Parse {
                    path: path.clone(),
                    source: err,
                }
            })?;

        Ok((Some(file_config), Some(path)))
    }

    fn compose_config(
        &self,
        file_config: Option<FileConfig>,
        env: EnvConfig,
        config_path: Option<PathBuf>,
    ) -> Result<(Config, ConfigWarnings), ConfigLoadError> {
        let mut warnings = ConfigWarnings::default();

        if file_config.is_none() {
            warnings.push_with_hint(
                "No tapcast.toml detected; using environment variables and defaults",
                "Create tapcast.toml or pass --config to add profiles and listener settings",
            );
        }

        let FileConfig {
            server: file_server,
            tls: file_tls,
            static_dir: file_static_dir,
            cors: file_cors,
            reader: file_reader,
            transport: file_transport,
            builtin_profiles: file_builtin_profiles,
            profiles: file_profiles,
        } = file_config.unwrap_or_default();

        let server = ServerConfig {
            host: env
                .server_host
                .or(file_server.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            http_port: env
                .http_port
                .or(file_server.http_port)
                .unwrap_or(DEFAULT_HTTP_PORT),
            https_port: env
                .https_port
                .or(file_server.https_port)
                .unwrap_or(DEFAULT_HTTPS_PORT),
        };

        let tls = TlsConfig {
            enabled: env.tls_enabled.or(file_tls.enabled).unwrap_or(true),
            cert_path: env
                .tls_cert_path
                .or(file_tls.cert_path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TLS_CERT_PATH)),
            key_path: env
                .tls_key_path
                .or(file_tls.key_path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TLS_KEY_PATH)),
            min_version: env
                .tls_min_version
                .or(file_tls.min_version)
                .unwrap_or_else(|| DEFAULT_TLS_MIN_VERSION.to_string()),
            cipher_suites: env
                .tls_cipher_suites
                .or(file_tls.cipher_suites)
                .unwrap_or_default(),
        };

        let cors = CorsConfig {
            allowed_origins: env
                .cors_allowed_origins
                .or(file_cors.allowed_origins)
                .unwrap_or_else(default_cors_origins),
            allowed_methods: env
                .cors_allowed_methods
                .or(file_cors.allowed_methods)
                .unwrap_or_else(default_cors_methods),
        };

        let backend = match env.reader_backend {
            Some(raw) => raw.parse::<ReaderBackendKind>()?,
            None => file_reader.backend.unwrap_or_default(),
        };
        let reader = ReaderConfig {
            backend,
            poll_interval_ms: env
                .reader_poll_interval_ms
                .or(file_reader.poll_interval_ms)
                .unwrap_or(DEFAULT_READER_POLL_INTERVAL_MS),
        };

        let transport = TransportConfig {
            client_queue: env
                .transport_client_queue
                .or(file_transport.client_queue)
                .unwrap_or(DEFAULT_CLIENT_QUEUE),
        };

        let profiles: BTreeMap<CardId, _> = file_profiles
            .into_iter()
            .map(|(uid, record)| (CardId::new(uid), record))
            .collect();

        let config = Config {
            server,
            tls,
            static_dir: env
                .static_dir
                .or(file_static_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR)),
            cors,
            reader,
            transport,
            builtin_profiles: env
                .builtin_profiles
                .or(file_builtin_profiles)
                .unwrap_or(true),
            profiles,
            metadata: ConfigMetadata {
                config_path,
                env_file_loaded: false,
            },
        };

        let guard_warnings = validation::apply_guard_rails(&config)?;
        warnings.extend(guard_warnings);

        Ok((config, warnings))
    }
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file missing: {path}")]
    MissingConfig { path: PathBuf },
    #[error("failed to read configuration {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error(transparent)]
    InvalidReaderBackend(#[from] UnknownReaderBackend),
    #[error(transparent)]
    InvalidEnv(#[from] InvalidEnvVar),
    #[error(transparent)]
    GuardRail(#[from] ConfigGuardRailError),
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}

#[derive(Debug, Default)]
struct ConfigPathSource {
    explicit: Option<PathBuf>,
    env: Option<PathBuf>,
    default: Option<PathBuf>,
}

impl ConfigPathSource {
    fn is_empty(&self) -> bool {
        self.explicit.is_none() && self.env.is_none() && self.default.is_none()
    }

    fn resolved_path(&self) -> Option<(PathBuf, ConfigPathProvenance)> {
        if let Some(path) = &self.explicit {
            return Some((path.clone(), ConfigPathProvenance::Explicit));
        }
        if let Some(path) = &self.env {
            return Some((path.clone(), ConfigPathProvenance::Env));
        }
        if let Some(path) = &self.default {
            return Some((path.clone(), ConfigPathProvenance::Default));
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigPathProvenance {
    Explicit,
    Env,
    Default,
}

impl ConfigPathProvenance {
    /// A path the operator named must exist.
    fn is_explicit(self) -> bool {
        matches!(
            self,
            ConfigPathProvenance::Explicit | ConfigPathProvenance::Env
        )
    }
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_cors_methods() -> Vec<String> {
    vec!["GET".to_string(), "POST".to_string()]
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provenance_marks_env_paths_as_explicit() {
        assert!(ConfigPathProvenance::Explicit.is_explicit());
        assert!(ConfigPathProvenance::Env.is_explicit());
        assert!(!ConfigPathProvenance::Default.is_explicit());
    }

    #[test]
    fn explicit_path_wins_over_env_path() {
        let source = ConfigPathSource {
            explicit: Some(PathBuf::from("cli.toml")),
            env: Some(PathBuf::from("env.toml")),
            default: None,
        };
        let (path, provenance) = source.resolved_path().unwrap();
        assert_eq!(path, PathBuf::from("cli.toml"));
        assert_eq!(provenance, ConfigPathProvenance::Explicit);
    }

    #[test]
    fn missing_env_config_path_is_an_error() {
        let env = EnvConfig {
            config_path: Some(PathBuf::from("/definitely/missing/tapcast.toml")),
            ..EnvConfig::default()
        };
        let err = ConfigLoader::new().load_with_env(env).unwrap_err();
        assert!(matches!(err, ConfigLoadError::MissingConfig { .. }));
    }

    #[test]
    fn unknown_reader_backend_in_env_is_rejected() {
        let env = EnvConfig {
            reader_backend: Some("serial".into()),
            ..EnvConfig::default()
        };
        let err = ConfigLoader::new().load_with_env(env).unwrap_err();
        assert!(matches!(err, ConfigLoadError::InvalidReaderBackend(_)));
    }
}
