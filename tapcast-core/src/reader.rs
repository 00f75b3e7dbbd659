use tokio::sync::mpsc;

use crate::{
    error::ReaderError,
    events::ScanEvent,
    profile::CardId,
};

/// Default capacity of the channel between a backend and the bridge.
pub const READER_EVENT_CAPACITY: usize = 64;

/// Something a reader backend observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderEvent {
    /// A reader is attached and waiting for cards.
    Ready {
        /// Reader name as reported by the backend.
        reader: String,
    },
    /// A card was presented.
    CardDetected {
        /// Reader the card was presented to.
        reader: String,
        /// The scan itself.
        scan: ScanEvent,
    },
    /// A fault that ends processing of the current card only.
    Error(ReaderError),
}

impl ReaderEvent {
    /// Card detected now on `reader`.
    pub fn card(reader: impl Into<String>, card_id: impl Into<CardId>) -> Self {
        Self::CardDetected {
            reader: reader.into(),
            scan: ScanEvent::new(card_id.into()),
        }
    }
}

/// Stream of events produced by a running backend. It ends when the backend
/// stops for good.
pub type ReaderEvents = mpsc::Receiver<ReaderEvent>;

/// A physical (or simulated) card reader backend.
///
/// Starting returns either a running event stream or the reason the backend
/// cannot run; callers decide what a startup failure means for the process.
pub trait ReaderBackend: Send {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Bring the backend up.
    fn start(self: Box<Self>) -> Result<ReaderEvents, ReaderError>;
}

/// Backend replaying a fixed list of events, then closing.
///
/// Used by demos and tests to exercise the scan path without hardware.
#[derive(Debug, Clone, Default)]
pub struct ScriptedReader {
    events: Vec<ReaderEvent>,
}

impl ScriptedReader {
    /// Empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a ready signal.
    pub fn ready(mut self, reader: impl Into<String>) -> Self {
        self.events.push(ReaderEvent::Ready {
            reader: reader.into(),
        });
        self
    }

    /// Append a card scan.
    pub fn card(
        mut self,
        reader: impl Into<String>,
        card_id: impl Into<CardId>,
    ) -> Self {
        self.events.push(ReaderEvent::card(reader, card_id));
        self
    }

    /// Append a device fault.
    pub fn fault(
        mut self,
        reader: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        self.events
            .push(ReaderEvent::Error(ReaderError::device(reader, message)));
        self
    }

    /// Number of scripted events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True when nothing is scripted.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl ReaderBackend for ScriptedReader {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn start(self: Box<Self>) -> Result<ReaderEvents, ReaderError> {
        let (tx, rx) = mpsc::channel(self.events.len().max(1));
        for event in self.events {
            tx.try_send(event).map_err(|err| {
                ReaderError::Init(format!("script overflow: {err}"))
            })?;
        }
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_reader_replays_in_order_then_closes() {
        let script = ScriptedReader::new()
            .ready("ACR122U")
            .card("ACR122U", "123456789")
            .fault("ACR122U", "card removed")
            .card("ACR122U", "deadbeef");
        assert_eq!(script.len(), 4);

        let mut events = Box::new(script).start().expect("script starts");

        assert!(matches!(
            events.recv().await,
            Some(ReaderEvent::Ready { ref reader }) if reader == "ACR122U"
        ));
        match events.recv().await {
            Some(ReaderEvent::CardDetected { scan, .. }) => {
                assert_eq!(scan.card_id.as_str(), "123456789")
            }
            other => panic!("expected card, got {other:?}"),
        }
        assert!(matches!(
            events.recv().await,
            Some(ReaderEvent::Error(ReaderError::Device { .. }))
        ));
        assert!(matches!(
            events.recv().await,
            Some(ReaderEvent::CardDetected { .. })
        ));
        assert!(events.recv().await.is_none());
    }

    #[tokio::test]
    async fn empty_script_closes_immediately() {
        let mut events = Box::new(ScriptedReader::new()).start().unwrap();
        assert!(events.recv().await.is_none());
    }

    #[test]
    fn startup_failures_are_classified() {
        assert!(ReaderError::Unavailable("no pcsc".into()).is_startup_failure());
        assert!(ReaderError::Init("no service".into()).is_startup_failure());
        assert!(!ReaderError::device("r", "x").is_startup_failure());
    }
}
