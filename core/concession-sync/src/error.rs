//! Error types for the record store.

use concession_remote::RemoteError;
use concession_storage::StorageError;
use concession_types::{RecordId, ValidationError};
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by the record store.
///
/// Mutations only ever return `Validation` or `NotFound`, both before any
/// side effect. Remote write failures never surface here; they are recorded
/// as unsynced history entries instead.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A required field was missing or invalid.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// No record with the given id.
    #[error("record not found: {0}")]
    NotFound(RecordId),

    /// The remote snapshot could not be fetched.
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// The persisted snapshot could not be read.
    #[error("persistence error: {0}")]
    Persistence(#[from] StorageError),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, StoreError::Validation(_))
    }
}
