//! Remote feature service adapter for the concession record store.
//!
//! The store never talks to the remote service directly. It goes through the
//! narrow [`RemoteSyncAdapter`] trait, which reports ordinary failures as
//! outcome values instead of errors so that a remote outage can only degrade
//! sync status, never block a local mutation.
//!
//! # Implementations
//!
//! - [`FeatureServiceAdapter`]: HTTP client for an ArcGIS-style feature layer
//!   (`addFeatures` / `updateFeatures` / `deleteFeatures` / `query`).
//! - [`mock::MockRemoteAdapter`]: scriptable in-process adapter for tests.
//!
//! Adapters never retry. Replay of failed writes belongs to the reconciler.

mod adapter;
mod error;
pub mod feature_service;
pub mod mapping;
pub mod mock;

pub use adapter::{CreateOutcome, RemoteCapabilities, RemoteSyncAdapter, SyncOutcome};
pub use error::{RemoteError, RemoteResult};
pub use feature_service::{FeatureServiceAdapter, FeatureServiceConfig};
