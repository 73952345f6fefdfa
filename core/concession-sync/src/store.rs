//! The local-first record store.
//!
//! Every mutation runs the same pipeline: validate, attempt the remote
//! write, apply the change locally regardless of the remote outcome, append
//! one history entry, persist the full snapshot, notify listeners.
//!
//! The state lock is never held across the remote `await`. Two calls on the
//! same id can interleave there, and the later local write wins.

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::history::ActionLog;
use crate::notifier::{Notifier, Subscription};
use crate::reconciler::{InitializeReport, Reconciler, SyncReport};
use concession_remote::{RemoteCapabilities, RemoteSyncAdapter};
use concession_storage::{KeyValueStore, StoreSnapshot};
use concession_types::{Action, ActorId, Record, RecordDraft, RecordId};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// In-memory store state: the record map plus the history.
#[derive(Debug)]
pub(crate) struct StoreState {
    /// Insertion ordered so that "first seen" is well defined.
    pub(crate) records: IndexMap<RecordId, Record>,
    pub(crate) log: ActionLog,
    next_local_seq: u64,
    /// Local ids moved to a remote id by replay. Lets a mutation that was
    /// waiting on the remote when its record moved find it again.
    forwarded: HashMap<RecordId, RecordId>,
}

impl StoreState {
    fn from_snapshot(snapshot: StoreSnapshot, history_limit: usize) -> Self {
        let mut state = Self {
            records: snapshot.records.into_iter().collect(),
            log: ActionLog::from_entries(snapshot.history, history_limit),
            next_local_seq: 1,
            forwarded: HashMap::new(),
        };
        state.reset_local_seq();
        state
    }

    /// Records that the record formerly keyed `old` now lives under `new`.
    pub(crate) fn forward(&mut self, old: RecordId, new: RecordId) {
        self.forwarded.insert(old, new);
    }

    /// Returns the id `id` currently lives under, following replay re-keys.
    pub(crate) fn resolve_id(&self, id: &RecordId) -> RecordId {
        let mut current = id;
        // Bounded walk; a chain never revisits an id unless the map is corrupt.
        for _ in 0..=self.forwarded.len() {
            match self.forwarded.get(current) {
                Some(next) => current = next,
                None => break,
            }
        }
        current.clone()
    }

    /// Moves the local id counter past every local id still referenced by a
    /// record or a history entry.
    pub(crate) fn reset_local_seq(&mut self) {
        let highest = self
            .records
            .keys()
            .chain(self.log.record_ids())
            .filter_map(RecordId::local_seq)
            .max()
            .unwrap_or(0);
        self.next_local_seq = self.next_local_seq.max(highest + 1);
    }

    fn allocate_local_id(&mut self) -> RecordId {
        let id = RecordId::local(self.next_local_seq);
        self.next_local_seq += 1;
        id
    }

    pub(crate) fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot::new(
            self.records
                .iter()
                .map(|(id, r)| (id.clone(), r.clone()))
                .collect(),
            self.log.to_vec(),
        )
    }

    pub(crate) fn record_list(&self) -> Vec<Record> {
        self.records.values().cloned().collect()
    }
}

/// Canonical local store of concession records.
pub struct LocalRecordStore {
    pub(crate) config: StoreConfig,
    pub(crate) adapter: Arc<dyn RemoteSyncAdapter>,
    persistence: Arc<dyn KeyValueStore>,
    pub(crate) state: RwLock<StoreState>,
    notifier: Notifier,
    persistence_failures: AtomicU64,
}

impl LocalRecordStore {
    /// Opens the store, loading whatever snapshot `persistence` holds under
    /// the configured key. A missing snapshot starts an empty store; an
    /// unreadable one is an error.
    pub async fn open(
        config: StoreConfig,
        adapter: Arc<dyn RemoteSyncAdapter>,
        persistence: Arc<dyn KeyValueStore>,
    ) -> StoreResult<Self> {
        let snapshot = persistence
            .load_snapshot(&config.storage_key)?
            .unwrap_or_default();
        let state = StoreState::from_snapshot(snapshot, config.history_limit);
        info!(
            "Opened record store with {} records and {} history entries ({} pending)",
            state.records.len(),
            state.log.len(),
            state.log.pending_count()
        );

        Ok(Self {
            config,
            adapter,
            persistence,
            state: RwLock::new(state),
            notifier: Notifier::new(),
            persistence_failures: AtomicU64::new(0),
        })
    }

    /// Returns the store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // ── Reads ────────────────────────────────────────────────────

    /// Returns every record, in insertion order.
    pub async fn get_all_records(&self) -> Vec<Record> {
        self.state.read().await.record_list()
    }

    pub async fn get_record(&self, id: &RecordId) -> Option<Record> {
        self.state.read().await.records.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.records.is_empty()
    }

    /// Returns the history, newest first.
    pub async fn get_history(&self) -> Vec<Action> {
        self.state.read().await.log.history()
    }

    /// Returns history entries not yet propagated remotely, oldest first.
    pub async fn pending_actions(&self) -> Vec<Action> {
        self.state.read().await.log.pending()
    }

    /// Returns which writes the remote target accepts.
    pub async fn remote_capabilities(&self) -> RemoteCapabilities {
        self.adapter.capabilities().await
    }

    /// Returns true if the remote target accepts at least one kind of write.
    pub async fn can_edit_remote(&self) -> bool {
        self.remote_capabilities().await.can_edit()
    }

    /// Number of snapshot writes that have failed since the store was opened.
    pub fn persistence_failures(&self) -> u64 {
        self.persistence_failures.load(Ordering::Relaxed)
    }

    // ── Mutations ────────────────────────────────────────────────

    /// Creates a record from form data.
    ///
    /// The record keeps its local id unless the remote create succeeds, in
    /// which case the remote-assigned id is used instead.
    pub async fn create(&self, draft: RecordDraft, actor: &ActorId) -> StoreResult<Record> {
        draft.validate()?;
        let local_id = self.state.write().await.allocate_local_id();
        let record = draft.into_record(local_id);

        let outcome = self.adapter.create(&record).await;
        let synced = outcome.assigned_id().is_some();
        let record = match outcome.assigned_id() {
            Some(remote_id) => record.with_id(remote_id.clone()),
            None if outcome.success => {
                warn!("Remote create of {} reported no id, kept locally", record.id);
                record
            }
            None => {
                info!(
                    "Remote create failed for {}, kept locally: {}",
                    record.id,
                    outcome.error.as_deref().unwrap_or("unknown error")
                );
                record
            }
        };

        let records = {
            let mut state = self.state.write().await;
            if state.records.contains_key(&record.id) {
                warn!("Create replaced an existing record with id {}", record.id);
            }
            state.records.insert(record.id.clone(), record.clone());
            state
                .log
                .push(Action::create(&record, actor.clone(), synced));
            self.persist(&state);
            state.record_list()
        };
        self.notifier.notify(&records);

        debug!("Created record {} (synced: {})", record.id, synced);
        Ok(record)
    }

    /// Replaces the editable fields of an existing record.
    ///
    /// The local change is applied whether or not the remote update succeeds.
    /// If replay moved the record to a remote id while the remote call was in
    /// flight, the change lands on the moved record and stays pending.
    pub async fn update(
        &self,
        id: &RecordId,
        draft: RecordDraft,
        actor: &ActorId,
    ) -> StoreResult<Record> {
        let previous = self
            .get_record(id)
            .await
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        draft.validate()?;
        let updated = draft.into_record(id.clone());

        let outcome = self.adapter.update(&updated).await;
        if !outcome.success {
            info!(
                "Remote update failed for {}, applied locally: {}",
                id,
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }

        let (updated, synced, records) = {
            let mut state = self.state.write().await;
            let current = state.resolve_id(id);
            let synced = outcome.success && current == *id;
            let previous = state.records.get(&current).cloned().unwrap_or(previous);
            let updated = updated.with_id(current.clone());
            if current != *id {
                debug!("Record {} moved to {} during update", id, current);
            }
            state.records.insert(current, updated.clone());
            state
                .log
                .push(Action::update(&previous, &updated, actor.clone(), synced));
            self.persist(&state);
            (updated, synced, state.record_list())
        };
        self.notifier.notify(&records);

        debug!("Updated record {} (synced: {})", updated.id, synced);
        Ok(updated)
    }

    /// Deletes a record.
    ///
    /// The record is removed locally even if the remote delete fails; the
    /// unsynced history entry is what later propagates the deletion. If replay
    /// moved the record to a remote id meanwhile, the moved record is removed
    /// and the entry is logged against its new id.
    pub async fn delete(&self, id: &RecordId, actor: &ActorId) -> StoreResult<()> {
        let existing = self
            .get_record(id)
            .await
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        let outcome = self.adapter.delete(id).await;
        if !outcome.success {
            info!(
                "Remote delete failed for {}, removed locally: {}",
                id,
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }

        let (removed, synced, records) = {
            let mut state = self.state.write().await;
            let current = state.resolve_id(id);
            let synced = outcome.success && current == *id;
            let removed = match state.records.shift_remove(&current) {
                Some(record) => record,
                None => existing.with_id(current),
            };
            if removed.id != *id {
                debug!("Record {} moved to {} during delete", id, removed.id);
            }
            state
                .log
                .push(Action::delete(&removed, actor.clone(), synced));
            self.persist(&state);
            (removed, synced, state.record_list())
        };
        self.notifier.notify(&records);

        debug!("Deleted record {} (synced: {})", removed.id, synced);
        Ok(())
    }

    // ── Bulk operations ──────────────────────────────────────────

    /// Returns the full state as it would be persisted.
    pub async fn export_data(&self) -> StoreSnapshot {
        self.state.read().await.snapshot()
    }

    /// Replaces the whole store with `snapshot`.
    pub async fn import_data(&self, snapshot: StoreSnapshot) {
        let records = {
            let mut state = self.state.write().await;
            let mut imported = StoreState::from_snapshot(snapshot, self.config.history_limit);
            imported.next_local_seq = imported.next_local_seq.max(state.next_local_seq);
            *state = imported;
            info!(
                "Imported {} records and {} history entries",
                state.records.len(),
                state.log.len()
            );
            self.persist(&state);
            state.record_list()
        };
        self.notifier.notify(&records);
    }

    /// Removes every record and history entry.
    pub async fn clear(&self) {
        {
            let mut state = self.state.write().await;
            state.records.clear();
            state.log.clear();
            state.forwarded.clear();
            self.persist(&state);
        }
        warn!("Record store cleared");
        self.notifier.notify(&[]);
    }

    // ── Reconciliation ───────────────────────────────────────────

    /// Returns the reconciler bound to this store.
    pub fn reconciler(&self) -> Reconciler<'_> {
        Reconciler::new(self)
    }

    /// Merges `remote_snapshot` into local state. See [`Reconciler::initialize`].
    pub async fn initialize(&self, remote_snapshot: Vec<Record>) -> InitializeReport {
        self.reconciler().initialize(remote_snapshot).await
    }

    /// Fetches the remote snapshot through the adapter and merges it.
    pub async fn reconcile_with_remote(&self) -> StoreResult<InitializeReport> {
        let remote_snapshot = self.adapter.fetch_snapshot().await?;
        Ok(self.initialize(remote_snapshot).await)
    }

    /// Replays unsynced history entries. See [`Reconciler::sync_pending_changes`].
    pub async fn sync_pending_changes(&self) -> SyncReport {
        self.reconciler().sync_pending_changes().await
    }

    /// Removes duplicate records. See [`Reconciler::remove_duplicates`].
    pub async fn remove_duplicates(&self) -> usize {
        self.reconciler().remove_duplicates().await
    }

    // ── Observers & lifecycle ────────────────────────────────────

    /// Subscribes to record-set changes.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[Record]) + Send + Sync + 'static,
    {
        self.notifier.subscribe(callback)
    }

    /// Persists a final snapshot and drops every listener.
    pub async fn dispose(&self) {
        let state = self.state.read().await;
        self.persist(&state);
        self.notifier.clear();
        info!("Record store disposed");
    }

    // ── Internals ────────────────────────────────────────────────

    /// Writes the full snapshot. Failures are logged and counted, never
    /// returned: memory stays authoritative until the next successful write.
    pub(crate) fn persist(&self, state: &StoreState) {
        if let Err(e) = self
            .persistence
            .save_snapshot(&self.config.storage_key, &state.snapshot())
        {
            self.persistence_failures.fetch_add(1, Ordering::Relaxed);
            error!("Failed to persist record store snapshot: {}", e);
        }
    }

    pub(crate) fn notify(&self, records: &[Record]) {
        self.notifier.notify(records);
    }
}
