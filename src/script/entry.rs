/// Persisted cache entry format
///
/// Each script is stored as a JSON object `{"content": ..., "version": ...}`
/// under a key equal to the script's logical name.
use serde::{Deserialize, Serialize};

/// Script source paired with the version it was fetched for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub content: String,
    pub version: String,
}

impl CacheEntry {
    pub fn new(content: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            version: version.into(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Versions are opaque strings compared byte for byte
    pub fn matches(&self, version: &str) -> bool {
        self.version == version
    }
}

/// What a store read means for a requested version
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryState {
    Missing,
    /// Value present but not a serialized [`CacheEntry`]
    Malformed,
    Stale { cached_version: String },
    Fresh(CacheEntry),
}

impl EntryState {
    pub fn classify(raw: Option<&str>, requested_version: &str) -> Self {
        let Some(raw) = raw else {
            return EntryState::Missing;
        };

        match CacheEntry::from_json(raw) {
            Ok(entry) if entry.matches(requested_version) => EntryState::Fresh(entry),
            Ok(entry) => EntryState::Stale {
                cached_version: entry.version,
            },
            Err(_) => EntryState::Malformed,
        }
    }
}
