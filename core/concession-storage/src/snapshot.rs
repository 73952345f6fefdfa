//! The persisted snapshot format.

use concession_types::{Action, Record, RecordId};
use serde::{Deserialize, Serialize};

/// Key the store's snapshot lives under unless configured otherwise.
pub const DEFAULT_STORAGE_KEY: &str = "concession-store";

/// Full store state as persisted, exported and imported.
///
/// `records` is a list of `[id, record]` pairs; `history` is ordered oldest
/// first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub records: Vec<(RecordId, Record)>,
    #[serde(default)]
    pub history: Vec<Action>,
}

impl StoreSnapshot {
    pub fn new(records: Vec<(RecordId, Record)>, history: Vec<Action>) -> Self {
        Self { records, history }
    }

    /// Returns true if the snapshot holds neither records nor history.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.history.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
