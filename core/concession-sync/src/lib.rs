//! Local-first record store and its synchronization engine.
//!
//! Every mutation succeeds against local state first. Propagation to the
//! remote feature service is attempted inline but treated as best-effort:
//! a failed remote write only leaves its history entry marked unsynced, to
//! be replayed later by the reconciler.
//!
//! ## Components
//!
//! - **LocalRecordStore**: owns the record map and the action log; runs
//!   validate → remote write → local mutation → log → persist → notify.
//! - **ActionLog**: bounded, ordered history of mutations and their sync status.
//! - **Notifier**: broadcasts the full record set to subscribers after each mutation.
//! - **Reconciler**: merges a remote snapshot at startup, replays unsynced
//!   writes, and removes duplicate records on demand.
//!
//! # Example
//!
//! ```
//! use concession_remote::mock::MockRemoteAdapter;
//! use concession_storage::MemoryKeyValueStore;
//! use concession_sync::{LocalRecordStore, StoreConfig};
//! use concession_types::{ActorId, RecordDraft};
//! use std::sync::Arc;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let store = LocalRecordStore::open(
//!     StoreConfig::default(),
//!     Arc::new(MockRemoteAdapter::offline()),
//!     Arc::new(MemoryKeyValueStore::new()),
//! )
//! .await
//! .unwrap();
//!
//! let record = store
//!     .create(RecordDraft::new("Acme Pit", "Jane Doe", 12.0), &ActorId::from("jane"))
//!     .await
//!     .unwrap();
//! assert!(record.id.is_local());
//! assert_eq!(store.pending_actions().await.len(), 1);
//! # });
//! ```

mod config;
mod error;
mod history;
mod notifier;
mod reconciler;
mod store;

pub use config::{ReplayConfig, StoreConfig, MAX_HISTORY};
pub use error::{StoreError, StoreResult};
pub use history::ActionLog;
pub use notifier::{Notifier, Subscription};
pub use reconciler::{InitializeReport, Reconciler, SyncReport};
pub use store::LocalRecordStore;
