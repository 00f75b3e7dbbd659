//! Configuration library for tapcast.
//!
//! Values are layered in this order, later wins: built-in defaults, the TOML
//! file (`tapcast.toml`), then the environment (including a `.env` file).
//! The server applies CLI overrides on top of the loaded [`Config`].

pub mod constants;
pub mod loader;
pub mod models;
pub mod sources;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoadError, ConfigLoader, ConfigLoaderOptions};
pub use models::{
    Config, ConfigMetadata, CorsConfig, ReaderBackendKind, ReaderConfig,
    ServerConfig, TlsConfig, TransportConfig,
};
pub use sources::{EnvConfig, FileConfig, InvalidEnvVar};
pub use validation::{ConfigGuardRailError, ConfigWarning, ConfigWarnings};
