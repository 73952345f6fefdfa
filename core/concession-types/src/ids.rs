//! Identifier types used throughout the store.
//!
//! Record ids are plain strings because they come from two sources: the
//! store's own sequential counter (`local-<n>`) and the remote feature
//! service's object ids. Action ids use UUID v7 for natural time ordering.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Prefix carried by every locally generated record id.
pub const LOCAL_ID_PREFIX: &str = "local-";

/// Identifier of a record, either locally generated or remote-assigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Wraps an existing id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Builds the local id for sequence number `seq`.
    #[must_use]
    pub fn local(seq: u64) -> Self {
        Self(format!("{LOCAL_ID_PREFIX}{seq}"))
    }

    /// Builds an id from a remote object id.
    #[must_use]
    pub fn remote(object_id: i64) -> Self {
        Self(object_id.to_string())
    }

    /// Returns true if this id was generated locally and never assigned by
    /// the remote service.
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.local_seq().is_some()
    }

    /// Returns the sequence number of a local id.
    #[must_use]
    pub fn local_seq(&self) -> Option<u64> {
        self.0.strip_prefix(LOCAL_ID_PREFIX)?.parse().ok()
    }

    /// Returns the remote object id, if this id is one.
    #[must_use]
    pub fn object_id(&self) -> Option<i64> {
        self.0.parse().ok()
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Unique identifier for a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(Uuid);

impl ActionId {
    /// Creates a new action ID with the current timestamp.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ActionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ActionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// The user (or system job) responsible for a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    /// Actor recorded for maintenance passes that no user triggered directly.
    pub const SYSTEM: &'static str = "system";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn system() -> Self {
        Self(Self::SYSTEM.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for ActorId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
