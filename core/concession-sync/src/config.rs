//! Store configuration.

use concession_storage::DEFAULT_STORAGE_KEY;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of history entries kept before the oldest is evicted.
pub const MAX_HISTORY: usize = 100;

/// Configuration for [`crate::LocalRecordStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Key the snapshot is persisted under.
    pub storage_key: String,
    /// Maximum history entries kept.
    pub history_limit: usize,
    /// Run duplicate removal right after `initialize`. Off unless an
    /// operator opts in.
    pub dedupe_on_initialize: bool,
    /// Replay behaviour for `sync_pending_changes`.
    pub replay: ReplayConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            history_limit: MAX_HISTORY,
            dedupe_on_initialize: false,
            replay: ReplayConfig::default(),
        }
    }
}

/// How many times a pending action is attempted per replay pass, and how
/// long to wait between attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles on each further attempt.
    pub backoff_ms: u64,
}

impl ReplayConfig {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.backoff_ms.saturating_mul(factor))
    }
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff_ms: 0,
        }
    }
}
