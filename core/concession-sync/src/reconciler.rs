//! Startup merge, replay of unsynced writes, and duplicate removal.

use crate::store::LocalRecordStore;
use concession_remote::SyncOutcome;
use concession_types::{Action, ActionType, ActorId, Record, RecordId};
use indexmap::IndexMap;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Outcome of merging a remote snapshot into local state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitializeReport {
    /// Records taken from the remote snapshot.
    pub remote: usize,
    /// Local records that also existed remotely and were overwritten.
    pub replaced: usize,
    /// Local-only records kept alongside the snapshot.
    pub preserved: usize,
    /// Records removed by the optional post-merge dedupe.
    pub duplicates_removed: usize,
}

/// Outcome of one replay pass over unsynced history entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// True when no replayed action failed.
    pub success: bool,
    /// Actions successfully propagated to the remote.
    pub synced: usize,
    /// Actions still pending after this pass.
    pub failed: usize,
    /// Actions resolved without a remote call because a later change made
    /// them moot.
    pub superseded: usize,
}

/// What replaying one action requires.
enum ReplayStep {
    Create(Record),
    Update(Record),
    Delete(RecordId),
    /// Mark synced without contacting the remote.
    Resolve(&'static str),
    /// Leave pending; the action cannot be sent yet.
    Defer(&'static str),
}

/// Reconciliation operations bound to a store.
pub struct Reconciler<'a> {
    store: &'a LocalRecordStore,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a LocalRecordStore) -> Self {
        Self { store }
    }

    /// Merges a freshly fetched remote snapshot into local state.
    ///
    /// The remote side is authoritative for every id it knows: those records
    /// replace their local versions. Local records whose id the remote does
    /// not know, typically unsynced creates, are kept after the remote ones.
    pub async fn initialize(&self, remote_snapshot: Vec<Record>) -> InitializeReport {
        let mut report = InitializeReport::default();

        let records = {
            let mut state = self.store.state.write().await;

            let mut merged: IndexMap<RecordId, Record> =
                IndexMap::with_capacity(remote_snapshot.len() + state.records.len());
            for record in remote_snapshot {
                if merged.contains_key(&record.id) {
                    warn!("Remote snapshot lists {} more than once", record.id);
                }
                merged.insert(record.id.clone(), record);
            }
            report.remote = merged.len();

            for (id, record) in state.records.drain(..) {
                if merged.contains_key(&id) {
                    report.replaced += 1;
                } else {
                    merged.insert(id, record);
                    report.preserved += 1;
                }
            }

            state.records = merged;
            state.reset_local_seq();
            self.store.persist(&state);
            state.record_list()
        };
        self.store.notify(&records);

        info!(
            "Merged remote snapshot: {} remote, {} replaced, {} local-only preserved",
            report.remote, report.replaced, report.preserved
        );

        if self.store.config.dedupe_on_initialize {
            report.duplicates_removed = self.remove_duplicates().await;
        }
        report
    }

    /// Replays every unsynced history entry, oldest first.
    ///
    /// A successful remote create re-keys the local record to the remote id
    /// and rewrites the still-pending entries that reference it, so later
    /// updates and deletes in the same pass address the remote record.
    pub async fn sync_pending_changes(&self) -> SyncReport {
        let pending: Vec<_> = {
            let state = self.store.state.read().await;
            state.log.pending().into_iter().map(|a| a.id).collect()
        };
        if pending.is_empty() {
            debug!("No pending actions to replay");
            return SyncReport {
                success: true,
                ..SyncReport::default()
            };
        }

        info!("Replaying {} pending actions", pending.len());
        let mut report = SyncReport::default();
        let mut rekeyed = false;

        for action_id in pending {
            // Re-read the entry: an earlier replay in this pass may have
            // rewritten its record id.
            let step = {
                let state = self.store.state.read().await;
                let Some(action) = state.log.get(&action_id) else {
                    continue;
                };
                if action.synced_to_remote {
                    continue;
                }
                plan(action, state.records.get(&action.record_id))
            };

            let synced = match step {
                ReplayStep::Resolve(reason) => {
                    debug!("Resolved action {} without a remote call: {}", action_id, reason);
                    let mut state = self.store.state.write().await;
                    state.log.mark_synced(&action_id);
                    report.superseded += 1;
                    continue;
                }
                ReplayStep::Defer(reason) => {
                    debug!("Deferred action {}: {}", action_id, reason);
                    false
                }
                ReplayStep::Create(record) => match self.replay_create(&record).await {
                    Some(remote_id) => {
                        let mut state = self.store.state.write().await;
                        if remote_id != record.id {
                            rekey(&mut state.records, &record.id, &remote_id);
                            state.forward(record.id.clone(), remote_id.clone());
                            let rewritten = state.log.rekey_pending(&record.id, &remote_id);
                            debug!(
                                "Re-keyed {} to {} ({} pending actions rewritten)",
                                record.id, remote_id, rewritten
                            );
                            state.reset_local_seq();
                            rekeyed = true;
                        }
                        true
                    }
                    None => false,
                },
                ReplayStep::Update(record) => {
                    self.with_retries(|| self.store.adapter.update(&record)).await
                }
                ReplayStep::Delete(id) => {
                    self.with_retries(|| self.store.adapter.delete(&id)).await
                }
            };

            if synced {
                let mut state = self.store.state.write().await;
                state.log.mark_synced(&action_id);
                report.synced += 1;
            } else {
                report.failed += 1;
            }
        }

        report.success = report.failed == 0;

        let records = {
            let state = self.store.state.read().await;
            self.store.persist(&state);
            rekeyed.then(|| state.record_list())
        };
        if let Some(records) = records {
            self.store.notify(&records);
        }

        if report.success {
            info!(
                "Replay complete: {} synced, {} superseded",
                report.synced, report.superseded
            );
        } else {
            warn!(
                "Replay incomplete: {} synced, {} failed, {} superseded",
                report.synced, report.failed, report.superseded
            );
        }
        report
    }

    /// Removes records sharing the same name, owner and boundary, keeping
    /// the first one seen. Returns the number removed.
    pub async fn remove_duplicates(&self) -> usize {
        let (removed, records) = {
            let mut state = self.store.state.write().await;

            let mut seen = HashSet::new();
            let duplicates: Vec<RecordId> = state
                .records
                .values()
                .filter(|r| !seen.insert(duplicate_key(r)))
                .map(|r| r.id.clone())
                .collect();

            if duplicates.is_empty() {
                return 0;
            }

            for id in &duplicates {
                if let Some(record) = state.records.shift_remove(id) {
                    // A local-only duplicate never reached the remote.
                    let synced = id.is_local();
                    state
                        .log
                        .push(Action::delete(&record, ActorId::system(), synced));
                }
            }
            self.store.persist(&state);
            (duplicates.len(), state.record_list())
        };
        self.store.notify(&records);

        info!("Removed {} duplicate records", removed);
        removed
    }

    /// Attempts a remote create, returning the remote-assigned id.
    async fn replay_create(&self, record: &Record) -> Option<RecordId> {
        let replay = &self.store.config.replay;
        let attempts = replay.max_attempts.max(1);
        for attempt in 1..=attempts {
            let outcome = self.store.adapter.create(record).await;
            if let Some(remote_id) = outcome.assigned_id() {
                return Some(remote_id.clone());
            }
            if outcome.success {
                warn!("Replayed create of {} reported no id", record.id);
                return None;
            }
            debug!(
                "Replayed create of {} failed (attempt {}/{}): {}",
                record.id,
                attempt,
                attempts,
                outcome.error.as_deref().unwrap_or("unknown error")
            );
            if attempt < attempts {
                tokio::time::sleep(replay.backoff_after(attempt)).await;
            }
        }
        None
    }

    async fn with_retries<F, Fut>(&self, mut call: F) -> bool
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = SyncOutcome>,
    {
        let replay = &self.store.config.replay;
        let attempts = replay.max_attempts.max(1);
        for attempt in 1..=attempts {
            let outcome = call().await;
            if outcome.success {
                return true;
            }
            debug!(
                "Replay attempt {}/{} failed: {}",
                attempt,
                attempts,
                outcome.error.as_deref().unwrap_or("unknown error")
            );
            if attempt < attempts {
                tokio::time::sleep(replay.backoff_after(attempt)).await;
            }
        }
        false
    }
}

fn plan(action: &Action, current: Option<&Record>) -> ReplayStep {
    match action.action_type {
        ActionType::Create => match current {
            None => ReplayStep::Resolve("record deleted since creation"),
            Some(record) if !record.id.is_local() => {
                ReplayStep::Resolve("record already carries a remote id")
            }
            Some(record) => ReplayStep::Create(record.clone()),
        },
        ActionType::Update => match current {
            None => ReplayStep::Resolve("record deleted since update"),
            Some(record) if record.id.is_local() => {
                ReplayStep::Defer("record has not been created remotely yet")
            }
            Some(record) => ReplayStep::Update(record.clone()),
        },
        ActionType::Delete if action.record_id.is_local() => {
            ReplayStep::Resolve("record never reached the remote")
        }
        ActionType::Delete => ReplayStep::Delete(action.record_id.clone()),
    }
}

/// Moves the entry for `old` to `new`, keeping its position.
fn rekey(records: &mut IndexMap<RecordId, Record>, old: &RecordId, new: &RecordId) {
    let Some((index, _, record)) = records.shift_remove_full(old) else {
        return;
    };
    let record = record.with_id(new.clone());
    let (inserted, _) = records.insert_full(new.clone(), record);
    if inserted != index && index < records.len() {
        records.move_index(inserted, index);
    }
}

fn duplicate_key(record: &Record) -> (String, String, String) {
    (
        record.name.clone(),
        record.owner.clone(),
        serde_json::to_string(&record.boundary).unwrap_or_default(),
    )
}
