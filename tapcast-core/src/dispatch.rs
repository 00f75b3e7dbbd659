use std::sync::Arc;

use crate::{
    events::{BroadcastMessage, ScanEvent},
    profile::ProfileStore,
};

/// Resolves scans into broadcast messages.
///
/// Dispatching has no side effects: handing the message to transports is the
/// caller's job (see [`crate::ScanBridge`]).
#[derive(Debug, Clone)]
pub struct ScanDispatcher {
    store: Arc<ProfileStore>,
}

impl ScanDispatcher {
    /// Dispatcher backed by a shared store.
    pub fn new(store: Arc<ProfileStore>) -> Self {
        Self { store }
    }

    /// The store lookups run against.
    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    /// Build the message for one scan.
    pub fn dispatch(&self, event: &ScanEvent) -> BroadcastMessage {
        BroadcastMessage {
            card_id: event.card_id.clone(),
            profile: self.store.lookup(&event.card_id).cloned(),
        }
    }
}
