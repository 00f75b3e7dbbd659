use chrono::{DateTime, Utc};
use std::fmt;
use tapcast_core::TransportError;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

/// One registered WebSocket subscriber.
pub struct Connection {
    /// Unique connection ID
    pub id: Uuid,
    pub connected_at: DateTime<Utc>,
    /// Encoded text frames waiting to be written to the socket
    sender: mpsc::Sender<String>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("connected_at", &self.connected_at)
            .field("channel_closed", &self.sender.is_closed())
            .field("queued_capacity", &self.sender.capacity())
            .finish()
    }
}

impl Connection {
    pub fn new(sender: mpsc::Sender<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            connected_at: Utc::now(),
            sender,
        }
    }

    /// Queue a frame without waiting. A slow client loses the frame instead
    /// of stalling everyone else.
    pub fn try_send(&self, frame: String) -> Result<(), TransportError> {
        self.sender.try_send(frame).map_err(|err| match err {
            TrySendError::Full(_) => TransportError::Full,
            TrySendError::Closed(_) => TransportError::Closed,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
