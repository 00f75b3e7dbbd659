use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::profile::{CardId, ProfileRecord};

/// Event name used for scan broadcasts on every transport.
pub const SCANNED_EVENT: &str = "scanned";

/// A card presented to a reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEvent {
    /// Identifier as read from the card.
    pub card_id: CardId,
    /// When the backend detected the card.
    pub detected_at: DateTime<Utc>,
}

impl ScanEvent {
    /// Scan detected now.
    pub fn new(card_id: CardId) -> Self {
        Self::at(card_id, Utc::now())
    }

    /// Scan detected at a given instant.
    pub fn at(card_id: CardId, detected_at: DateTime<Utc>) -> Self {
        Self {
            card_id,
            detected_at,
        }
    }
}

/// Payload pushed to clients for every scan.
///
/// Serializes as `{"uid": "...", "profile": {...} | null}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastMessage {
    /// Scanned identifier.
    #[serde(rename = "uid")]
    pub card_id: CardId,
    /// Resolved profile, `None` when the card is unknown.
    pub profile: Option<ProfileRecord>,
}

impl BroadcastMessage {
    /// True when the card resolved to a profile.
    pub fn is_known(&self) -> bool {
        self.profile.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_card_serializes_null_profile() {
        let message = BroadcastMessage {
            card_id: CardId::from("deadbeef"),
            profile: None,
        };

        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({ "uid": "deadbeef", "profile": null })
        );
        assert!(!message.is_known());
    }

    #[test]
    fn known_card_embeds_profile() {
        let message = BroadcastMessage {
            card_id: CardId::from("123456789"),
            profile: Some(ProfileRecord::new("John Doe", "/profiles/john.jpg")),
        };

        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "uid": "123456789",
                "profile": { "name": "John Doe", "image": "/profiles/john.jpg" }
            })
        );
    }
}
