//! HTTP request handlers

pub mod handle_websocket;
pub mod ping;
pub mod profile;

pub use handle_websocket::websocket_handler;
pub use ping::ping_handler;
pub use profile::get_profile;
