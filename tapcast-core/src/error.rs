use thiserror::Error;

/// Failures reported by a card reader backend.
///
/// `Unavailable` and `Init` are returned from [`crate::ReaderBackend::start`];
/// `Device` and `Subsystem` travel through the event stream as
/// [`crate::ReaderEvent::Error`] and never end it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReaderError {
    /// The backend is not compiled in or no compatible hardware stack exists.
    #[error("reader backend unavailable: {0}")]
    Unavailable(String),

    /// The backend exists but could not be brought up.
    #[error("failed to initialize reader backend: {0}")]
    Init(String),

    /// A single reader failed (read error, card removed mid-read, unplugged).
    #[error("reader {reader} fault: {message}")]
    Device {
        /// Reader that reported the fault.
        reader: String,
        /// Backend-provided description.
        message: String,
    },

    /// The backend as a whole hit an error not tied to one reader.
    #[error("reader subsystem fault: {0}")]
    Subsystem(String),
}

impl ReaderError {
    /// Convenience constructor for [`ReaderError::Device`].
    pub fn device(reader: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Device {
            reader: reader.into(),
            message: message.into(),
        }
    }

    /// True for failures that happen at startup rather than mid-stream.
    pub fn is_startup_failure(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Init(_))
    }
}

/// Failures while handing a message to a transport.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The payload could not be encoded for the wire.
    #[error("failed to encode broadcast frame: {0}")]
    Encode(#[from] serde_json::Error),

    /// The subscriber's outbound channel has been closed.
    #[error("subscriber channel closed")]
    Closed,

    /// The subscriber's outbound queue is full.
    #[error("subscriber queue full")]
    Full,
}

/// Result alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;
