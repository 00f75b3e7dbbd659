//! HTTP, WebSocket and reader plumbing around [`tapcast_core`].
//!
//! Each listener (plaintext and TLS) gets its own [`AppState`] with its own
//! [`ConnectionManager`]; both managers are registered as broadcast
//! transports on the single [`tapcast_core::ScanBridge`] fed by the reader.

pub mod handlers;
pub mod infra;
pub mod reader;
pub mod routes;

pub use infra::app_state::{AppState, ListenerKind};
pub use infra::errors::{AppError, AppResult};
pub use infra::websocket::ConnectionManager;
pub use routes::create_app;

/// Install the process-wide rustls crypto provider. Safe to call repeatedly.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}
