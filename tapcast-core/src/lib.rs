//! # Tapcast Core
//!
//! Domain layer for the tapcast card-reader bridge: it turns card scans into
//! profile broadcasts without knowing anything about HTTP, TLS or sockets.
//!
//! ## Overview
//!
//! A scan travels through three pieces:
//!
//! - [`reader`]: a [`ReaderBackend`] produces [`ReaderEvent`]s (ready, card
//!   detected, fault) over a channel.
//! - [`dispatch`]: the [`ScanDispatcher`] resolves the card against the
//!   read-only [`ProfileStore`] and builds one [`BroadcastMessage`].
//! - [`transport`]: every [`BroadcastTransport`] registered in a
//!   [`TransportSet`] receives that message and fans it out to its own
//!   subscribers.
//!
//! [`ScanBridge`] wires the three together and is what the server runs.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use tapcast_core::{CardId, ProfileStore, ScanDispatcher, ScanEvent};
//!
//! let dispatcher = ScanDispatcher::new(Arc::new(ProfileStore::builtin()));
//! let message = dispatcher.dispatch(&ScanEvent::new(CardId::from("123456789")));
//! assert_eq!(
//!     message.profile.as_ref().map(|p| p.display_name.as_str()),
//!     Some("John Doe")
//! );
//! ```

pub mod bridge;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod profile;
pub mod reader;
pub mod routes;
pub mod transport;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use bridge::{BridgeStats, ScanBridge};
pub use dispatch::ScanDispatcher;
pub use error::{ReaderError, TransportError};
pub use events::{BroadcastMessage, SCANNED_EVENT, ScanEvent};
pub use profile::{CardId, ProfileRecord, ProfileStore};
pub use reader::{
    READER_EVENT_CAPACITY, ReaderBackend, ReaderEvent, ReaderEvents,
    ScriptedReader,
};
pub use transport::{BroadcastTransport, Delivery, TransportSet};
