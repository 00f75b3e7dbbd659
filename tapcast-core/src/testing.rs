//! Test doubles shared by this crate and downstream integration tests.

use std::sync::Mutex;

use crate::{
    events::BroadcastMessage,
    transport::{BroadcastTransport, Delivery},
};

/// Transport that records every broadcast it is handed.
#[derive(Debug)]
pub struct RecordingTransport {
    name: String,
    received: Mutex<Vec<(String, BroadcastMessage)>>,
}

impl RecordingTransport {
    /// Named, empty recorder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            received: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of `(event, message)` pairs in arrival order.
    pub fn received(&self) -> Vec<(String, BroadcastMessage)> {
        self.received
            .lock()
            .expect("recording transport mutex poisoned")
            .clone()
    }
}

impl BroadcastTransport for RecordingTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn broadcast(&self, event: &str, message: &BroadcastMessage) -> Delivery {
        self.received
            .lock()
            .expect("recording transport mutex poisoned")
            .push((event.to_string(), message.clone()));
        Delivery {
            delivered: 1,
            dropped: 0,
        }
    }
}
