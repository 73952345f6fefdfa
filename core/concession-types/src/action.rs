//! History entries describing every mutation made through the store.

use crate::{ActionId, ActorId, Record, RecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of mutation an [`Action`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Create,
    Update,
    Delete,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        f.pad(s)
    }
}

/// A logged mutation with before/after snapshots and its remote-sync status.
///
/// Entries are immutable once appended, except for `synced_to_remote`
/// (flipped by a successful replay) and `record_id` (rewritten when a
/// replayed create is assigned its remote id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub id: ActionId,
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub record_id: RecordId,
    pub timestamp: DateTime<Utc>,
    pub actor_id: ActorId,
    /// New state, for create and update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<Record>,
    /// State before the mutation, for update and delete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_data: Option<Record>,
    #[serde(default)]
    pub synced_to_remote: bool,
}

impl Action {
    fn new(action_type: ActionType, record_id: RecordId, actor_id: ActorId) -> Self {
        Self {
            id: ActionId::new(),
            action_type,
            record_id,
            timestamp: Utc::now(),
            actor_id,
            changes: None,
            previous_data: None,
            synced_to_remote: false,
        }
    }

    /// Creates a create entry carrying the new record.
    #[must_use]
    pub fn create(record: &Record, actor_id: ActorId, synced: bool) -> Self {
        let mut action = Self::new(ActionType::Create, record.id.clone(), actor_id);
        action.changes = Some(record.clone());
        action.synced_to_remote = synced;
        action
    }

    /// Creates an update entry carrying both snapshots.
    #[must_use]
    pub fn update(previous: &Record, updated: &Record, actor_id: ActorId, synced: bool) -> Self {
        let mut action = Self::new(ActionType::Update, updated.id.clone(), actor_id);
        action.changes = Some(updated.clone());
        action.previous_data = Some(previous.clone());
        action.synced_to_remote = synced;
        action
    }

    /// Creates a delete entry carrying the removed record.
    #[must_use]
    pub fn delete(removed: &Record, actor_id: ActorId, synced: bool) -> Self {
        let mut action = Self::new(ActionType::Delete, removed.id.clone(), actor_id);
        action.previous_data = Some(removed.clone());
        action.synced_to_remote = synced;
        action
    }
}
