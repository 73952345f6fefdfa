//! The remote adapter contract.

use crate::error::RemoteResult;
use async_trait::async_trait;
use concession_types::{Record, RecordId};
use serde::{Deserialize, Serialize};

/// Which write operations the remote target accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCapabilities {
    pub supports_create: bool,
    pub supports_update: bool,
    pub supports_delete: bool,
}

impl RemoteCapabilities {
    /// A target that accepts every write.
    pub const fn full() -> Self {
        Self {
            supports_create: true,
            supports_update: true,
            supports_delete: true,
        }
    }

    /// A read-only target.
    pub const fn read_only() -> Self {
        Self {
            supports_create: false,
            supports_update: false,
            supports_delete: false,
        }
    }

    /// Returns true if at least one write operation is accepted.
    pub fn can_edit(&self) -> bool {
        self.supports_create || self.supports_update || self.supports_delete
    }
}

/// Outcome of a remote create.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateOutcome {
    pub success: bool,
    /// Id assigned by the remote service, present on success.
    pub remote_id: Option<RecordId>,
    pub error: Option<String>,
}

impl CreateOutcome {
    pub fn created(remote_id: RecordId) -> Self {
        Self {
            success: true,
            remote_id: Some(remote_id),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            remote_id: None,
            error: Some(error.into()),
        }
    }

    /// The remote id, if the create succeeded and reported one. A success
    /// without an id does not count as a create.
    pub fn assigned_id(&self) -> Option<&RecordId> {
        self.remote_id.as_ref().filter(|_| self.success)
    }
}

/// Outcome of a remote update or delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    pub success: bool,
    pub error: Option<String>,
}

impl SyncOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Stateless wrapper over the remote feature service.
///
/// Write operations never return errors: transport and protocol failures are
/// reported as `success: false` with a message. Implementations must not
/// retry.
#[async_trait]
pub trait RemoteSyncAdapter: Send + Sync {
    /// Probes whether the remote target accepts writes at all.
    async fn capabilities(&self) -> RemoteCapabilities;

    /// Creates the record remotely. On success the outcome must carry the
    /// remote-assigned id; callers treat a success without one as a failure.
    async fn create(&self, record: &Record) -> CreateOutcome;

    /// Overwrites the remote copy of the record.
    async fn update(&self, record: &Record) -> SyncOutcome;

    /// Deletes the remote copy of the record.
    async fn delete(&self, id: &RecordId) -> SyncOutcome;

    /// Fetches every record the remote service currently holds.
    async fn fetch_snapshot(&self) -> RemoteResult<Vec<Record>>;
}
