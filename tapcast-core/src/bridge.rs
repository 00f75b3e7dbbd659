use tracing::{error, info, warn};

use crate::{
    dispatch::ScanDispatcher,
    events::{BroadcastMessage, SCANNED_EVENT},
    reader::{ReaderEvent, ReaderEvents},
    transport::TransportSet,
};

/// Counters returned when a reader stream ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    /// Ready signals seen.
    pub readers_ready: usize,
    /// Scans dispatched and broadcast.
    pub scans: usize,
    /// Faults reported by the backend.
    pub faults: usize,
}

/// Card-detected handler: dispatches each scan and hands the result to every
/// transport.
///
/// Events are handled one at a time in arrival order.
#[derive(Debug, Clone)]
pub struct ScanBridge {
    dispatcher: ScanDispatcher,
    transports: TransportSet,
}

impl ScanBridge {
    /// Bridge delivering to `transports`.
    pub fn new(dispatcher: ScanDispatcher, transports: TransportSet) -> Self {
        Self {
            dispatcher,
            transports,
        }
    }

    /// Transports scans are delivered to.
    pub fn transports(&self) -> &TransportSet {
        &self.transports
    }

    /// React to one reader event. Returns the broadcast message for scans.
    pub fn handle(&self, event: ReaderEvent) -> Option<BroadcastMessage> {
        match event {
            ReaderEvent::Ready { reader } => {
                info!(reader = %reader, "card reader ready");
                None
            }
            ReaderEvent::CardDetected { reader, scan } => {
                info!(
                    reader = %reader,
                    uid = %scan.card_id,
                    detected_at = %scan.detected_at.to_rfc3339(),
                    "card scanned"
                );
                let message = self.dispatcher.dispatch(&scan);
                if !message.is_known() {
                    info!(uid = %message.card_id, "no profile for scanned card");
                }
                let delivery = self.transports.broadcast(SCANNED_EVENT, &message);
                if delivery.dropped > 0 {
                    warn!(
                        uid = %message.card_id,
                        delivered = delivery.delivered,
                        dropped = delivery.dropped,
                        "scan broadcast skipped some subscribers"
                    );
                }
                Some(message)
            }
            ReaderEvent::Error(err) => {
                error!(error = %err, "card reader error");
                None
            }
        }
    }

    /// Drain `events` until the backend closes the stream.
    pub async fn run(&self, mut events: ReaderEvents) -> BridgeStats {
        let mut stats = BridgeStats::default();
        while let Some(event) = events.recv().await {
            match &event {
                ReaderEvent::Ready { .. } => stats.readers_ready += 1,
                ReaderEvent::CardDetected { .. } => stats.scans += 1,
                ReaderEvent::Error(_) => stats.faults += 1,
            }
            self.handle(event);
        }
        info!(
            scans = stats.scans,
            faults = stats.faults,
            "reader event stream closed"
        );
        stats
    }
}
