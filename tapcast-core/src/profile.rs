use serde::{Deserialize, Serialize};
use std::{borrow::Borrow, collections::HashMap, fmt};

/// Opaque identifier read from a card.
///
/// The value is kept exactly as the reader produced it: `c27cf9cf` and
/// `c2:7c:f9:cf` are different identifiers.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CardId(String);

impl CardId {
    /// Wrap a raw identifier.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the raw identifier.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CardId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CardId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for CardId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CardId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Display information attached to a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    /// Name shown to clients.
    #[serde(rename = "name")]
    pub display_name: String,
    /// Path or URL of the avatar shown to clients.
    #[serde(rename = "image")]
    pub image_ref: String,
}

impl ProfileRecord {
    /// Build a record from its two fields.
    pub fn new(
        display_name: impl Into<String>,
        image_ref: impl Into<String>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            image_ref: image_ref.into(),
        }
    }
}

/// Read-only card to profile table.
///
/// Built once at startup and shared behind an `Arc`; there is no mutation
/// API once the store is handed out.
#[derive(Debug, Clone, Default)]
pub struct ProfileStore {
    profiles: HashMap<CardId, ProfileRecord>,
}

impl ProfileStore {
    /// Store with no entries.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Store seeded with the built-in demo profiles.
    pub fn builtin() -> Self {
        Self::from_entries([
            (
                CardId::from("123456789"),
                ProfileRecord::new("John Doe", "/profiles/john.jpg"),
            ),
            (
                CardId::from("c2:7c:f9:cf"),
                ProfileRecord::new("Jane Smith", "/profiles/jane.jpg"),
            ),
        ])
    }

    /// Store holding exactly the given entries. Later duplicates win.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (CardId, ProfileRecord)>,
    {
        Self {
            profiles: entries.into_iter().collect(),
        }
    }

    /// Layer additional entries over this store, replacing existing ids.
    pub fn with_overrides<I>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (CardId, ProfileRecord)>,
    {
        self.profiles.extend(entries);
        self
    }

    /// Resolve a card id. Absence is a normal outcome.
    pub fn lookup(&self, id: impl AsRef<str>) -> Option<&ProfileRecord> {
        self.profiles.get(id.as_ref())
    }

    /// Number of known cards.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// True when no card is known.
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Iterate over all entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&CardId, &ProfileRecord)> {
        self.profiles.iter()
    }
}
