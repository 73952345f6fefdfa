//! A scriptable in-process adapter for testing.
//!
//! `MockRemoteAdapter` behaves like a tiny feature service: successful
//! creates assign sequential object ids and land in an in-memory table that
//! later updates, deletes and snapshots read from. Clones share state, so a
//! test can keep a handle while the store owns another.

use crate::adapter::{CreateOutcome, RemoteCapabilities, RemoteSyncAdapter, SyncOutcome};
use crate::error::{RemoteError, RemoteResult};
use async_trait::async_trait;
use concession_types::{Record, RecordId};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// A call observed by the mock, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Create(RecordId),
    Update(RecordId),
    Delete(RecordId),
}

#[derive(Debug)]
struct MockState {
    online: bool,
    capabilities: RemoteCapabilities,
    next_object_id: i64,
    features: BTreeMap<i64, Record>,
    calls: Vec<MockCall>,
}

/// Scriptable remote adapter.
#[derive(Debug, Clone)]
pub struct MockRemoteAdapter {
    state: Arc<Mutex<MockState>>,
}

impl MockRemoteAdapter {
    /// Creates an online, fully writable mock. Object ids start at 1.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                online: true,
                capabilities: RemoteCapabilities::full(),
                next_object_id: 1,
                features: BTreeMap::new(),
                calls: Vec::new(),
            })),
        }
    }

    /// Creates a mock whose every write fails.
    pub fn offline() -> Self {
        let mock = Self::new();
        mock.set_online(false);
        mock
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Switches between succeeding and failing writes.
    pub fn set_online(&self, online: bool) {
        self.state().online = online;
    }

    pub fn set_capabilities(&self, capabilities: RemoteCapabilities) {
        self.state().capabilities = capabilities;
    }

    /// Sets the object id the next successful create will assign.
    pub fn set_next_object_id(&self, id: i64) {
        self.state().next_object_id = id;
    }

    /// Places records in the remote table as if another actor created them.
    /// Records without a numeric id are ignored.
    pub fn seed(&self, records: impl IntoIterator<Item = Record>) {
        let mut state = self.state();
        for record in records {
            if let Some(object_id) = record.id.object_id() {
                state.next_object_id = state.next_object_id.max(object_id + 1);
                state.features.insert(object_id, record);
            }
        }
    }

    /// Returns the remote table, ordered by object id.
    pub fn remote_records(&self) -> Vec<Record> {
        self.state().features.values().cloned().collect()
    }

    /// Returns every write call observed so far.
    pub fn calls(&self) -> Vec<MockCall> {
        self.state().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }
}

impl Default for MockRemoteAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteSyncAdapter for MockRemoteAdapter {
    async fn capabilities(&self) -> RemoteCapabilities {
        self.state().capabilities
    }

    async fn create(&self, record: &Record) -> CreateOutcome {
        let mut state = self.state();
        state.calls.push(MockCall::Create(record.id.clone()));
        if !state.online {
            return CreateOutcome::failed("remote unreachable");
        }
        if !state.capabilities.supports_create {
            return CreateOutcome::failed("layer does not support create");
        }
        let object_id = state.next_object_id;
        state.next_object_id += 1;
        let remote_id = RecordId::remote(object_id);
        state
            .features
            .insert(object_id, record.clone().with_id(remote_id.clone()));
        CreateOutcome::created(remote_id)
    }

    async fn update(&self, record: &Record) -> SyncOutcome {
        let mut state = self.state();
        state.calls.push(MockCall::Update(record.id.clone()));
        if !state.online {
            return SyncOutcome::failed("remote unreachable");
        }
        if !state.capabilities.supports_update {
            return SyncOutcome::failed("layer does not support update");
        }
        match record.id.object_id() {
            Some(object_id) if state.features.contains_key(&object_id) => {
                state.features.insert(object_id, record.clone());
                SyncOutcome::ok()
            }
            _ => SyncOutcome::failed(format!("feature {} not found", record.id)),
        }
    }

    async fn delete(&self, id: &RecordId) -> SyncOutcome {
        let mut state = self.state();
        state.calls.push(MockCall::Delete(id.clone()));
        if !state.online {
            return SyncOutcome::failed("remote unreachable");
        }
        if !state.capabilities.supports_delete {
            return SyncOutcome::failed("layer does not support delete");
        }
        match id.object_id().and_then(|oid| state.features.remove(&oid)) {
            Some(_) => SyncOutcome::ok(),
            None => SyncOutcome::failed(format!("feature {id} not found")),
        }
    }

    async fn fetch_snapshot(&self) -> RemoteResult<Vec<Record>> {
        let state = self.state();
        if !state.online {
            return Err(RemoteError::Network("remote unreachable".into()));
        }
        Ok(state.features.values().cloned().collect())
    }
}
