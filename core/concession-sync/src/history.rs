//! Bounded, ordered history of mutations.
//!
//! The log is the only durable evidence of what still has to reach the
//! remote service, so entries are never dropped except by FIFO eviction once
//! the capacity is exceeded.

use concession_types::{Action, ActionId, RecordId};
use std::collections::VecDeque;

/// Append-only action log with FIFO eviction.
#[derive(Debug, Clone)]
pub struct ActionLog {
    /// Oldest first.
    entries: VecDeque<Action>,
    capacity: usize,
}

impl ActionLog {
    /// Creates an empty log holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Rebuilds a log from persisted entries (oldest first), keeping only the
    /// newest `capacity` of them.
    pub fn from_entries(entries: Vec<Action>, capacity: usize) -> Self {
        let mut log = Self::new(capacity);
        for action in entries {
            log.push(action);
        }
        log
    }

    /// Appends an entry, returning the evicted oldest entry if the log was full.
    pub fn push(&mut self, action: Action) -> Option<Action> {
        self.entries.push_back(action);
        if self.entries.len() > self.capacity {
            self.entries.pop_front()
        } else {
            None
        }
    }

    /// Returns all entries, newest first.
    pub fn history(&self) -> Vec<Action> {
        self.entries.iter().rev().cloned().collect()
    }

    /// Returns all entries, oldest first (persistence order).
    pub fn to_vec(&self) -> Vec<Action> {
        self.entries.iter().cloned().collect()
    }

    /// Returns entries not yet propagated to the remote, oldest first.
    pub fn pending(&self) -> Vec<Action> {
        self.entries
            .iter()
            .filter(|a| !a.synced_to_remote)
            .cloned()
            .collect()
    }

    pub fn pending_count(&self) -> usize {
        self.entries.iter().filter(|a| !a.synced_to_remote).count()
    }

    pub fn get(&self, id: &ActionId) -> Option<&Action> {
        self.entries.iter().find(|a| a.id == *id)
    }

    /// Flags an entry as propagated. Returns false if it is no longer in the log.
    pub fn mark_synced(&mut self, id: &ActionId) -> bool {
        match self.entries.iter_mut().find(|a| a.id == *id) {
            Some(action) => {
                action.synced_to_remote = true;
                true
            }
            None => false,
        }
    }

    /// Points every still-pending entry for `old` at `new`. Synced entries
    /// keep the id they were recorded with. Returns the number rewritten.
    pub fn rekey_pending(&mut self, old: &RecordId, new: &RecordId) -> usize {
        let mut rewritten = 0;
        for action in self
            .entries
            .iter_mut()
            .filter(|a| !a.synced_to_remote && a.record_id == *old)
        {
            action.record_id = new.clone();
            rewritten += 1;
        }
        rewritten
    }

    /// Iterates every record id mentioned in the log.
    pub fn record_ids(&self) -> impl Iterator<Item = &RecordId> {
        self.entries.iter().map(|a| &a.record_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
