use std::{fmt, ops::AddAssign, sync::Arc};

use tracing::debug;

use crate::events::BroadcastMessage;

/// Outcome of one fan-out on one transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Subscribers the frame was queued for.
    pub delivered: usize,
    /// Subscribers that were skipped (queue full or gone).
    pub dropped: usize,
}

impl AddAssign for Delivery {
    fn add_assign(&mut self, rhs: Self) {
        self.delivered += rhs.delivered;
        self.dropped += rhs.dropped;
    }
}

/// A real-time channel that pushes server events to its connected clients.
///
/// `broadcast` must not block: it reaches the subscribers connected at call
/// time and nobody else.
pub trait BroadcastTransport: Send + Sync + fmt::Debug {
    /// Name used in logs (e.g. `http`, `https`).
    fn name(&self) -> &str;

    /// Fan `message` out under `event` to every current subscriber.
    fn broadcast(&self, event: &str, message: &BroadcastMessage) -> Delivery;
}

/// The transports a scan is delivered to.
#[derive(Debug, Clone, Default)]
pub struct TransportSet {
    transports: Vec<Arc<dyn BroadcastTransport>>,
}

impl TransportSet {
    /// No transports.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`TransportSet::push`].
    pub fn with(mut self, transport: Arc<dyn BroadcastTransport>) -> Self {
        self.push(transport);
        self
    }

    /// Register a transport.
    pub fn push(&mut self, transport: Arc<dyn BroadcastTransport>) {
        self.transports.push(transport);
    }

    /// Number of registered transports.
    pub fn len(&self) -> usize {
        self.transports.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.transports.is_empty()
    }

    /// Hand `message` to every registered transport, in registration order.
    pub fn broadcast(&self, event: &str, message: &BroadcastMessage) -> Delivery {
        let mut total = Delivery::default();
        for transport in &self.transports {
            let delivery = transport.broadcast(event, message);
            debug!(
                transport = transport.name(),
                event,
                delivered = delivery.delivered,
                dropped = delivery.dropped,
                "broadcast handed to transport"
            );
            total += delivery;
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        SCANNED_EVENT,
        profile::CardId,
        testing::RecordingTransport,
    };

    fn message(uid: &str) -> BroadcastMessage {
        BroadcastMessage {
            card_id: CardId::from(uid),
            profile: None,
        }
    }

    #[test]
    fn every_registered_transport_observes_the_broadcast() {
        let plain = Arc::new(RecordingTransport::new("http"));
        let secure = Arc::new(RecordingTransport::new("https"));
        let set = TransportSet::new()
            .with(plain.clone())
            .with(secure.clone());

        let delivery = set.broadcast(SCANNED_EVENT, &message("deadbeef"));

        assert_eq!(delivery.delivered, 2);
        for transport in [&plain, &secure] {
            let received = transport.received();
            assert_eq!(received.len(), 1);
            assert_eq!(received[0].0, SCANNED_EVENT);
            assert_eq!(received[0].1, message("deadbeef"));
        }
    }

    #[test]
    fn transport_registered_later_misses_earlier_broadcasts() {
        let early = Arc::new(RecordingTransport::new("early"));
        let mut set = TransportSet::new().with(early.clone());
        set.broadcast(SCANNED_EVENT, &message("first"));

        let late = Arc::new(RecordingTransport::new("late"));
        set.push(late.clone());
        set.broadcast(SCANNED_EVENT, &message("second"));

        assert_eq!(early.received().len(), 2);
        let late_received = late.received();
        assert_eq!(late_received.len(), 1);
        assert_eq!(late_received[0].1.card_id.as_str(), "second");
    }

    #[test]
    fn empty_set_delivers_nothing() {
        let set = TransportSet::new();
        assert!(set.is_empty());
        assert_eq!(
            set.broadcast(SCANNED_EVENT, &message("x")),
            Delivery::default()
        );
    }
}
