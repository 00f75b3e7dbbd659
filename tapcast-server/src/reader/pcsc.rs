//! PC/SC backend (ACR122U and other contactless readers).
//!
//! Built only with the `pcsc` cargo feature; otherwise [`PcscReader::start`]
//! reports [`ReaderError::Unavailable`] and the server keeps serving.

use std::{collections::HashSet, time::Duration};

use tapcast_core::{ReaderBackend, ReaderError, ReaderEvents};

/// GET DATA for the card UID, answered by PC/SC part 3 compliant readers.
pub const GET_UID_APDU: [u8; 5] = [0xFF, 0xCA, 0x00, 0x00, 0x00];

#[derive(Debug, Clone)]
pub struct PcscReader {
    poll_interval: Duration,
}

impl PcscReader {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }
}

impl ReaderBackend for PcscReader {
    fn name(&self) -> &'static str {
        "pcsc"
    }

    #[cfg(feature = "pcsc")]
    fn start(self: Box<Self>) -> Result<ReaderEvents, ReaderError> {
        imp::start(self.poll_interval)
    }

    #[cfg(not(feature = "pcsc"))]
    fn start(self: Box<Self>) -> Result<ReaderEvents, ReaderError> {
        let _ = self.poll_interval;
        Err(ReaderError::Unavailable(
            "built without the `pcsc` feature".to_string(),
        ))
    }
}

/// Extract the UID from a GET DATA response: data followed by `90 00`.
pub fn parse_uid_response(response: &[u8]) -> Result<String, String> {
    match response {
        [data @ .., 0x90, 0x00] if !data.is_empty() => Ok(hex_lower(data)),
        [0x90, 0x00] => {
            Err("reader returned an empty UID".to_string())
        }
        [.., sw1, sw2] => {
            Err(format!("GET DATA failed with status {sw1:02X}{sw2:02X}"))
        }
        _ => Err("short response to GET DATA".to_string()),
    }
}

fn hex_lower(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// What the monitor saw in one reader slot after a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(not(feature = "pcsc"), allow(dead_code))]
pub(crate) enum Slot {
    Empty,
    CardPresent,
    Removed,
}

/// What the monitor should do about that observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(not(feature = "pcsc"), allow(dead_code))]
pub(crate) enum SlotAction {
    Nothing,
    ReadCard,
    ReportRemoved,
}

/// Card presence per reader, so a resting card is read once and an
/// unplugged reader is reported once.
#[derive(Debug, Default)]
#[cfg_attr(not(feature = "pcsc"), allow(dead_code))]
pub(crate) struct ReaderTracker {
    occupied: HashSet<String>,
    removed: HashSet<String>,
}

#[cfg_attr(not(feature = "pcsc"), allow(dead_code))]
impl ReaderTracker {
    pub(crate) fn observe(&mut self, reader: &str, slot: Slot) -> SlotAction {
        match slot {
            Slot::Removed => {
                self.occupied.remove(reader);
                if self.removed.insert(reader.to_string()) {
                    SlotAction::ReportRemoved
                } else {
                    SlotAction::Nothing
                }
            }
            Slot::Empty => {
                self.removed.remove(reader);
                self.occupied.remove(reader);
                SlotAction::Nothing
            }
            Slot::CardPresent => {
                self.removed.remove(reader);
                if self.occupied.insert(reader.to_string()) {
                    SlotAction::ReadCard
                } else {
                    SlotAction::Nothing
                }
            }
        }
    }

    /// A reader showed up (again); it starts with an empty slot.
    pub(crate) fn attached(&mut self, reader: &str) {
        self.removed.remove(reader);
        self.occupied.remove(reader);
    }
}

#[cfg(feature = "pcsc")]
mod imp {
    use std::{ffi::CString, time::Duration};

    use pcsc::{
        Context, Error as PcscError, MAX_BUFFER_SIZE, PNP_NOTIFICATION,
        Protocols, ReaderState, Scope, ShareMode, State,
    };
    use tapcast_core::{
        READER_EVENT_CAPACITY, ReaderError, ReaderEvent, ReaderEvents,
    };
    use tokio::sync::mpsc;
    use tracing::{debug, warn};

    use super::{
        GET_UID_APDU, ReaderTracker, Slot, SlotAction, parse_uid_response,
    };

    pub(super) fn start(
        poll_interval: Duration,
    ) -> Result<ReaderEvents, ReaderError> {
        let ctx = Context::establish(Scope::User).map_err(|e| {
            ReaderError::Init(format!("failed to establish PC/SC context: {e}"))
        })?;
        let (tx, rx) = mpsc::channel(READER_EVENT_CAPACITY);

        std::thread::Builder::new()
            .name("pcsc-monitor".into())
            .spawn(move || monitor(ctx, poll_interval, tx))
            .map_err(|e| ReaderError::Init(e.to_string()))?;

        Ok(rx)
    }

    fn slot(state: State) -> Slot {
        if state.intersects(State::UNKNOWN | State::IGNORE) {
            Slot::Removed
        } else if state.contains(State::PRESENT) {
            Slot::CardPresent
        } else {
            Slot::Empty
        }
    }

    /// Status-change loop. Runs until the bridge drops the receiver.
    fn monitor(
        ctx: Context,
        poll_interval: Duration,
        tx: mpsc::Sender<ReaderEvent>,
    ) {
        let mut states = vec![ReaderState::new(PNP_NOTIFICATION(), State::UNAWARE)];
        let mut tracker = ReaderTracker::default();

        loop {
            if tx.is_closed() {
                debug!("pcsc monitor stopping");
                return;
            }

            // Removals were reported after the previous status change.
            states.retain(|rs| {
                rs.name() == PNP_NOTIFICATION()
                    || slot(rs.event_state()) != Slot::Removed
            });

            match ctx.list_readers_owned() {
                Ok(names) => {
                    for name in names {
                        if !states.iter().any(|rs| rs.name() == name.as_c_str()) {
                            let reader = name.to_string_lossy().into_owned();
                            tracker.attached(&reader);
                            states.push(ReaderState::new(name, State::UNAWARE));
                            if tx.blocking_send(ReaderEvent::Ready { reader }).is_err() {
                                return;
                            }
                        }
                    }
                }
                Err(PcscError::NoReadersAvailable) => {}
                Err(e) => {
                    let event = ReaderEvent::Error(ReaderError::Subsystem(e.to_string()));
                    if tx.blocking_send(event).is_err() {
                        return;
                    }
                }
            }

            for rs in &mut states {
                rs.sync_current_state();
            }

            match ctx.get_status_change(poll_interval, &mut states) {
                Ok(()) => {}
                Err(PcscError::Timeout) => continue,
                Err(e) => {
                    warn!(error = %e, "pcsc status change failed");
                    let event = ReaderEvent::Error(ReaderError::Subsystem(e.to_string()));
                    if tx.blocking_send(event).is_err() {
                        return;
                    }
                    std::thread::sleep(poll_interval);
                    continue;
                }
            }

            for rs in &states {
                if rs.name() == PNP_NOTIFICATION() {
                    continue;
                }
                let reader = rs.name().to_string_lossy().into_owned();
                let event = match tracker.observe(&reader, slot(rs.event_state())) {
                    SlotAction::Nothing => continue,
                    SlotAction::ReportRemoved => ReaderEvent::Error(
                        ReaderError::device(reader, "reader removed"),
                    ),
                    SlotAction::ReadCard => match read_uid(&ctx, rs.name().to_owned()) {
                        Ok(uid) => ReaderEvent::card(reader, uid),
                        Err(message) => {
                            ReaderEvent::Error(ReaderError::device(reader, message))
                        }
                    },
                };
                if tx.blocking_send(event).is_err() {
                    return;
                }
            }
        }
    }

    fn read_uid(ctx: &Context, reader: CString) -> Result<String, String> {
        let card = ctx
            .connect(&reader, ShareMode::Shared, Protocols::ANY)
            .map_err(|e| format!("connect failed: {e}"))?;
        let mut buf = [0u8; MAX_BUFFER_SIZE];
        let response = card
            .transmit(&GET_UID_APDU, &mut buf)
            .map_err(|e| format!("transmit failed: {e}"))?;
        parse_uid_response(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uid_is_lowercase_hex_without_status_word() {
        assert_eq!(
            parse_uid_response(&[0xC2, 0x7C, 0xF9, 0xCF, 0x90, 0x00]),
            Ok("c27cf9cf".to_string())
        );
    }

    #[test]
    fn error_status_words_are_reported() {
        let err = parse_uid_response(&[0x6A, 0x81]).unwrap_err();
        assert!(err.contains("6A81"), "{err}");
        assert!(parse_uid_response(&[0x90, 0x00]).is_err());
        assert!(parse_uid_response(&[0x90]).is_err());
    }

    #[test]
    fn resting_card_is_read_once() {
        let mut tracker = ReaderTracker::default();

        assert_eq!(tracker.observe("ACR122U", Slot::CardPresent), SlotAction::ReadCard);
        assert_eq!(tracker.observe("ACR122U", Slot::CardPresent), SlotAction::Nothing);
        assert_eq!(tracker.observe("ACR122U", Slot::Empty), SlotAction::Nothing);
        assert_eq!(tracker.observe("ACR122U", Slot::CardPresent), SlotAction::ReadCard);
    }

    #[test]
    fn unplugged_reader_is_reported_once() {
        let mut tracker = ReaderTracker::default();
        tracker.observe("ACR122U", Slot::CardPresent);

        assert_eq!(tracker.observe("ACR122U", Slot::Removed), SlotAction::ReportRemoved);
        assert_eq!(tracker.observe("ACR122U", Slot::Removed), SlotAction::Nothing);

        // Plugged back in with the card still on it.
        tracker.attached("ACR122U");
        assert_eq!(tracker.observe("ACR122U", Slot::CardPresent), SlotAction::ReadCard);
    }

    #[test]
    fn readers_are_tracked_independently() {
        let mut tracker = ReaderTracker::default();

        assert_eq!(tracker.observe("left", Slot::CardPresent), SlotAction::ReadCard);
        assert_eq!(tracker.observe("right", Slot::Removed), SlotAction::ReportRemoved);
        assert_eq!(tracker.observe("left", Slot::CardPresent), SlotAction::Nothing);
    }

    #[cfg(not(feature = "pcsc"))]
    #[test]
    fn start_without_feature_is_unavailable() {
        let reader = Box::new(PcscReader::new(Duration::from_millis(500)));
        let err = reader.start().unwrap_err();
        assert!(err.is_startup_failure());
        assert!(matches!(err, ReaderError::Unavailable(_)));
    }
}
