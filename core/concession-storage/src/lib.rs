//! Durable persistence for the concession record store.
//!
//! The store keeps its entire state under one well-known key as a JSON blob
//! (`{"records": [[id, record], ...], "history": [action, ...]}`), read once
//! at startup and overwritten wholesale after every mutation.
//!
//! Backends implement the small [`KeyValueStore`] trait; snapshot encoding
//! lives in its provided methods so every backend stores the same format.
//!
//! - [`SqliteKeyValueStore`]: a `kv` table in a SQLite file.
//! - [`MemoryKeyValueStore`]: a process-local map, for tests and dry runs.

mod error;
mod memory;
mod snapshot;
mod sqlite;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryKeyValueStore;
pub use snapshot::{StoreSnapshot, DEFAULT_STORAGE_KEY};
pub use sqlite::SqliteKeyValueStore;

/// A durable string key/value store.
pub trait KeyValueStore: Send + Sync {
    /// Reads the value under `key`, if any.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Writes `value` under `key`, replacing any previous value.
    fn put(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Removes `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// Loads and decodes the snapshot stored under `key`.
    fn load_snapshot(&self, key: &str) -> StorageResult<Option<StoreSnapshot>> {
        match self.get(key)? {
            Some(blob) => Ok(Some(StoreSnapshot::from_json(&blob)?)),
            None => Ok(None),
        }
    }

    /// Encodes and writes `snapshot` under `key`.
    fn save_snapshot(&self, key: &str, snapshot: &StoreSnapshot) -> StorageResult<()> {
        self.put(key, &snapshot.to_json()?)
    }
}
