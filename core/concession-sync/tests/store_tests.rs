use concession_remote::mock::{MockCall, MockRemoteAdapter};
use concession_remote::RemoteCapabilities;
use concession_storage::{KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore, StoreSnapshot};
use concession_sync::{LocalRecordStore, StoreConfig, StoreError, MAX_HISTORY};
use concession_types::{ActionType, ActorId, Record, RecordDraft, RecordId};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};

fn jane() -> ActorId {
    ActorId::from("jane")
}

fn acme() -> RecordDraft {
    let mut draft = RecordDraft::new("Acme Pit", "Jane Doe", 12.0);
    draft.region = "Ashanti".into();
    draft.boundary = vec![[-1.62, 6.69], [-1.61, 6.69], [-1.61, 6.70]];
    draft
}

async fn open_store(adapter: &MockRemoteAdapter, kv: &MemoryKeyValueStore) -> LocalRecordStore {
    LocalRecordStore::open(
        StoreConfig::default(),
        Arc::new(adapter.clone()),
        Arc::new(kv.clone()),
    )
    .await
    .unwrap()
}

async fn online_store() -> (LocalRecordStore, MockRemoteAdapter) {
    let adapter = MockRemoteAdapter::new();
    let store = open_store(&adapter, &MemoryKeyValueStore::new()).await;
    (store, adapter)
}

async fn offline_store() -> (LocalRecordStore, MockRemoteAdapter) {
    let adapter = MockRemoteAdapter::offline();
    let store = open_store(&adapter, &MemoryKeyValueStore::new()).await;
    (store, adapter)
}

// ── Reads ────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_store() {
    let (store, _) = online_store().await;
    assert!(store.is_empty().await);
    assert!(store.get_history().await.is_empty());
    assert!(store.pending_actions().await.is_empty());
}

#[tokio::test]
async fn get_all_records_is_idempotent() {
    let (store, _) = offline_store().await;
    store.create(acme(), &jane()).await.unwrap();
    store
        .create(RecordDraft::new("Bono Quarry", "Kofi Mensah", 3.5), &jane())
        .await
        .unwrap();

    let first = store.get_all_records().await;
    let second = store.get_all_records().await;
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
}

#[tokio::test]
async fn get_record_unknown_is_none() {
    let (store, _) = online_store().await;
    assert!(store.get_record(&RecordId::remote(42)).await.is_none());
}

// ── Create ───────────────────────────────────────────────────────

#[tokio::test]
async fn create_online_uses_remote_id() {
    let (store, adapter) = online_store().await;
    adapter.set_next_object_id(501);

    let record = store.create(acme(), &jane()).await.unwrap();

    assert_eq!(record.id, RecordId::remote(501));
    assert_eq!(store.get_record(&record.id).await, Some(record.clone()));
    assert_eq!(adapter.remote_records(), vec![record.clone()]);

    let history = store.get_history().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].action_type, ActionType::Create);
    assert_eq!(history[0].record_id, record.id);
    assert_eq!(history[0].actor_id, jane());
    assert!(history[0].synced_to_remote);
    assert_eq!(history[0].changes.as_ref(), Some(&record));
}

#[tokio::test]
async fn create_id_absent_before_and_present_after() {
    let (store, _) = offline_store().await;
    store.create(acme(), &jane()).await.unwrap();

    let before: Vec<RecordId> = store.get_all_records().await.into_iter().map(|r| r.id).collect();
    let record = store.create(acme(), &jane()).await.unwrap();

    assert!(!before.contains(&record.id));
    assert!(store.get_record(&record.id).await.is_some());
}

#[tokio::test]
async fn create_with_failing_remote_keeps_local_id() {
    let (store, adapter) = offline_store().await;

    let record = store.create(acme(), &jane()).await.unwrap();

    assert!(record.id.is_local());
    assert_eq!(record.name, "Acme Pit");
    assert_eq!(adapter.calls(), vec![MockCall::Create(record.id.clone())]);

    let history = store.get_history().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].record_id, record.id);
    assert!(!history[0].synced_to_remote);
}

#[tokio::test]
async fn create_on_read_only_remote_is_local() {
    let (store, adapter) = online_store().await;
    adapter.set_capabilities(RemoteCapabilities::read_only());

    let record = store.create(acme(), &jane()).await.unwrap();

    assert!(record.id.is_local());
    assert_eq!(store.remote_capabilities().await, RemoteCapabilities::read_only());
    assert!(!store.can_edit_remote().await);
    assert_eq!(store.pending_actions().await.len(), 1);
}

#[tokio::test]
async fn local_ids_are_unique() {
    let (store, _) = offline_store().await;
    let a = store.create(acme(), &jane()).await.unwrap();
    let b = store.create(acme(), &jane()).await.unwrap();
    assert_ne!(a.id, b.id);
    assert_eq!(a.id, RecordId::local(1));
    assert_eq!(b.id, RecordId::local(2));
}

#[tokio::test]
async fn create_rejects_invalid_draft_without_side_effects() {
    let (store, adapter) = online_store().await;
    let before = store.export_data().await;

    let err = store
        .create(RecordDraft::new("  ", "Jane Doe", 12.0), &jane())
        .await
        .unwrap_err();
    assert!(err.is_validation());

    let err = store
        .create(RecordDraft::new("Acme Pit", "Jane Doe", 0.0), &jane())
        .await
        .unwrap_err();
    assert!(err.is_validation());

    assert_eq!(store.export_data().await, before);
    assert!(adapter.calls().is_empty());
}

// ── Update ───────────────────────────────────────────────────────

#[tokio::test]
async fn update_online_records_previous_data() {
    let (store, adapter) = online_store().await;
    let original = store.create(acme(), &jane()).await.unwrap();

    let mut draft = original.to_draft();
    draft.size = 20.0;
    let updated = store.update(&original.id, draft, &jane()).await.unwrap();

    assert_eq!(updated.id, original.id);
    assert_eq!(updated.size, 20.0);
    assert_eq!(adapter.remote_records(), vec![updated.clone()]);

    let history = store.get_history().await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].action_type, ActionType::Update);
    assert_eq!(history[0].record_id, original.id);
    assert_eq!(history[0].previous_data.as_ref(), Some(&original));
    assert_eq!(history[0].changes.as_ref(), Some(&updated));
    assert!(history[0].synced_to_remote);
}

#[tokio::test]
async fn update_applies_locally_when_remote_fails() {
    let (store, adapter) = online_store().await;
    let original = store.create(acme(), &jane()).await.unwrap();
    adapter.set_online(false);

    let mut draft = original.to_draft();
    draft.owner = "Ama Owusu".into();
    store.update(&original.id, draft, &jane()).await.unwrap();

    let current = store.get_record(&original.id).await.unwrap();
    assert_eq!(current.owner, "Ama Owusu");
    assert_eq!(adapter.remote_records()[0].owner, "Jane Doe");
    assert_eq!(store.pending_actions().await.len(), 1);
}

#[tokio::test]
async fn update_unknown_id_is_not_found_and_changes_nothing() {
    let (store, adapter) = online_store().await;
    store.create(acme(), &jane()).await.unwrap();
    adapter.clear_calls();
    let before = store.export_data().await;

    let err = store
        .update(&RecordId::remote(999), acme(), &jane())
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::NotFound(ref id) if *id == RecordId::remote(999)));
    assert_eq!(store.export_data().await, before);
    assert!(adapter.calls().is_empty());
}

#[tokio::test]
async fn update_rejects_invalid_draft() {
    let (store, adapter) = online_store().await;
    let record = store.create(acme(), &jane()).await.unwrap();
    adapter.clear_calls();

    let err = store
        .update(&record.id, RecordDraft::new("Acme Pit", "", 1.0), &jane())
        .await
        .unwrap_err();

    assert!(err.is_validation());
    assert_eq!(store.get_history().await.len(), 1);
    assert!(adapter.calls().is_empty());
}

// ── Delete ───────────────────────────────────────────────────────

#[tokio::test]
async fn delete_with_successful_remote() {
    let (store, adapter) = online_store().await;
    let record = store.create(acme(), &jane()).await.unwrap();

    store.delete(&record.id, &jane()).await.unwrap();

    assert!(store.get_record(&record.id).await.is_none());
    assert!(adapter.remote_records().is_empty());

    let history = store.get_history().await;
    assert_eq!(history[0].action_type, ActionType::Delete);
    assert_eq!(history[0].record_id, record.id);
    assert_eq!(history[0].previous_data.as_ref(), Some(&record));
    assert!(history[0].changes.is_none());
    assert!(history[0].synced_to_remote);
}

#[tokio::test]
async fn delete_with_failing_remote_still_removes_locally() {
    let (store, adapter) = online_store().await;
    let record = store.create(acme(), &jane()).await.unwrap();
    adapter.set_online(false);

    store.delete(&record.id, &jane()).await.unwrap();

    assert!(store.get_record(&record.id).await.is_none());
    assert_eq!(adapter.remote_records().len(), 1);
    let pending = store.pending_actions().await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].action_type, ActionType::Delete);
}

#[tokio::test]
async fn delete_unknown_id_is_not_found() {
    let (store, _) = online_store().await;
    let err = store
        .delete(&RecordId::local(5), &jane())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(store.get_history().await.is_empty());
}

// ── History ──────────────────────────────────────────────────────

#[tokio::test]
async fn each_mutation_appends_one_matching_action() {
    let (store, _) = online_store().await;

    let record = store.create(acme(), &jane()).await.unwrap();
    assert_eq!(store.get_history().await.len(), 1);

    store
        .update(&record.id, record.to_draft(), &jane())
        .await
        .unwrap();
    assert_eq!(store.get_history().await.len(), 2);

    store.delete(&record.id, &jane()).await.unwrap();
    let history = store.get_history().await;
    assert_eq!(history.len(), 3);

    let types: Vec<ActionType> = history.iter().map(|a| a.action_type).collect();
    assert_eq!(
        types,
        vec![ActionType::Delete, ActionType::Update, ActionType::Create]
    );
    assert!(history.iter().all(|a| a.record_id == record.id));
}

#[tokio::test]
async fn history_is_capped_and_evicts_oldest() {
    let (store, _) = offline_store().await;

    let first = store.create(acme(), &jane()).await.unwrap();
    let first_action = store.get_history().await[0].id;
    for i in 0..MAX_HISTORY {
        let mut draft = first.to_draft();
        draft.size = 1.0 + i as f64;
        store.update(&first.id, draft, &jane()).await.unwrap();
    }

    let history = store.get_history().await;
    assert_eq!(history.len(), MAX_HISTORY);
    assert!(history.iter().all(|a| a.id != first_action));
    assert!(history.iter().all(|a| a.action_type == ActionType::Update));
}

#[tokio::test]
async fn history_limit_is_configurable() {
    let adapter = MockRemoteAdapter::offline();
    let config = StoreConfig {
        history_limit: 3,
        ..StoreConfig::default()
    };
    let store = LocalRecordStore::open(
        config,
        Arc::new(adapter),
        Arc::new(MemoryKeyValueStore::new()),
    )
    .await
    .unwrap();

    for _ in 0..5 {
        store.create(acme(), &jane()).await.unwrap();
    }

    let history = store.get_history().await;
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].record_id, RecordId::local(5));
    assert_eq!(history[2].record_id, RecordId::local(3));
}

// ── Bulk operations ──────────────────────────────────────────────

#[tokio::test]
async fn import_of_export_is_noop() {
    let (store, adapter) = online_store().await;
    let a = store.create(acme(), &jane()).await.unwrap();
    adapter.set_online(false);
    store
        .create(RecordDraft::new("Bono Quarry", "Kofi Mensah", 3.5), &jane())
        .await
        .unwrap();
    store.delete(&a.id, &jane()).await.unwrap();

    let exported = store.export_data().await;
    store.import_data(exported.clone()).await;

    assert_eq!(store.export_data().await, exported);
    assert_eq!(store.get_all_records().await.len(), 1);
    assert_eq!(store.get_history().await.len(), 3);
}

#[tokio::test]
async fn import_replaces_everything() {
    let (store, _) = offline_store().await;
    store.create(acme(), &jane()).await.unwrap();

    let imported = RecordDraft::new("Imported", "Someone", 1.0).into_record(RecordId::remote(7));
    store
        .import_data(StoreSnapshot::new(
            vec![(imported.id.clone(), imported.clone())],
            Vec::new(),
        ))
        .await;

    assert_eq!(store.get_all_records().await, vec![imported]);
    assert!(store.get_history().await.is_empty());
}

#[tokio::test]
async fn import_does_not_reuse_local_ids() {
    let (store, _) = offline_store().await;
    store.create(acme(), &jane()).await.unwrap();
    store.create(acme(), &jane()).await.unwrap();

    store.import_data(StoreSnapshot::default()).await;
    let record = store.create(acme(), &jane()).await.unwrap();

    assert_eq!(record.id, RecordId::local(3));
}

#[tokio::test]
async fn clear_removes_records_and_history() {
    let (store, _) = offline_store().await;
    store.create(acme(), &jane()).await.unwrap();

    store.clear().await;

    assert!(store.is_empty().await);
    assert!(store.get_history().await.is_empty());
    assert!(store.export_data().await.is_empty());
}

// ── Notification ─────────────────────────────────────────────────

fn recorder() -> (Arc<Mutex<Vec<usize>>>, impl Fn(&[Record]) + Send + Sync + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |records: &[Record]| {
        sink.lock().unwrap().push(records.len());
    })
}

#[tokio::test]
async fn listeners_receive_full_record_set() {
    let (store, _) = offline_store().await;
    let (seen, callback) = recorder();
    let _subscription = store.subscribe(callback);

    let a = store.create(acme(), &jane()).await.unwrap();
    store.create(acme(), &jane()).await.unwrap();
    store.update(&a.id, a.to_draft(), &jane()).await.unwrap();
    store.delete(&a.id, &jane()).await.unwrap();
    store.clear().await;

    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 2, 1, 0]);
}

#[tokio::test]
async fn failed_mutation_does_not_notify() {
    let (store, _) = offline_store().await;
    let (seen, callback) = recorder();
    let _subscription = store.subscribe(callback);

    let _ = store.update(&RecordId::local(1), acme(), &jane()).await;
    let _ = store.create(RecordDraft::default(), &jane()).await;

    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unsubscribe_stops_notifications() {
    let (store, _) = offline_store().await;
    let (seen, callback) = recorder();
    let subscription = store.subscribe(callback);

    store.create(acme(), &jane()).await.unwrap();
    assert!(subscription.unsubscribe());
    store.create(acme(), &jane()).await.unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![1]);
}

#[tokio::test]
async fn dispose_drops_listeners_and_persists() {
    let adapter = MockRemoteAdapter::offline();
    let kv = MemoryKeyValueStore::new();
    let store = open_store(&adapter, &kv).await;
    let (seen, callback) = recorder();
    let _subscription = store.subscribe(callback);

    store.create(acme(), &jane()).await.unwrap();
    store.dispose().await;
    store.create(acme(), &jane()).await.unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![1]);
    let saved = kv
        .load_snapshot(&store.config().storage_key)
        .unwrap()
        .unwrap();
    assert_eq!(saved.records.len(), 2);
}

// ── Persistence ──────────────────────────────────────────────────

#[tokio::test]
async fn mutations_persist_snapshot() {
    let adapter = MockRemoteAdapter::offline();
    let kv = MemoryKeyValueStore::new();
    let store = open_store(&adapter, &kv).await;

    let record = store.create(acme(), &jane()).await.unwrap();

    let saved = kv
        .load_snapshot(&store.config().storage_key)
        .unwrap()
        .unwrap();
    assert_eq!(saved, store.export_data().await);
    assert_eq!(saved.records[0].0, record.id);
}

#[tokio::test]
async fn persistence_failure_is_counted_not_returned() {
    let adapter = MockRemoteAdapter::offline();
    let kv = MemoryKeyValueStore::new();
    let store = open_store(&adapter, &kv).await;
    kv.set_fail_writes(true);

    let record = store.create(acme(), &jane()).await.unwrap();

    assert_eq!(store.persistence_failures(), 1);
    assert!(store.get_record(&record.id).await.is_some());
    assert!(kv.is_empty());

    kv.set_fail_writes(false);
    store.delete(&record.id, &jane()).await.unwrap();
    assert_eq!(store.persistence_failures(), 1);
    assert!(!kv.is_empty());
}

#[tokio::test]
async fn corrupt_snapshot_fails_open() {
    let kv = MemoryKeyValueStore::new();
    kv.put(concession_storage::DEFAULT_STORAGE_KEY, "{not json")
        .unwrap();

    let result = LocalRecordStore::open(
        StoreConfig::default(),
        Arc::new(MockRemoteAdapter::new()),
        Arc::new(kv),
    )
    .await;

    assert!(matches!(result, Err(StoreError::Persistence(_))));
}

#[tokio::test]
async fn sqlite_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("concessions.db");
    let adapter = MockRemoteAdapter::offline();

    let exported = {
        let kv = SqliteKeyValueStore::open(&path).unwrap();
        let store = LocalRecordStore::open(
            StoreConfig::default(),
            Arc::new(adapter.clone()),
            Arc::new(kv),
        )
        .await
        .unwrap();
        store.create(acme(), &jane()).await.unwrap();
        store
            .create(RecordDraft::new("Bono Quarry", "Kofi Mensah", 3.5), &jane())
            .await
            .unwrap();
        store.dispose().await;
        store.export_data().await
    };

    let kv = SqliteKeyValueStore::open(&path).unwrap();
    let store = LocalRecordStore::open(StoreConfig::default(), Arc::new(adapter), Arc::new(kv))
        .await
        .unwrap();

    assert_eq!(store.export_data().await, exported);
    assert_eq!(store.pending_actions().await.len(), 2);

    let next = store.create(acme(), &jane()).await.unwrap();
    assert_eq!(next.id, RecordId::local(3));
}

// ── Concurrency ──────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_get_distinct_ids() {
    let (store, _) = offline_store().await;
    let store = Arc::new(store);

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .create(RecordDraft::new(format!("Pit {i}"), "Jane Doe", 1.0), &jane())
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().id);
    }
    ids.sort();
    ids.dedup();

    assert_eq!(ids.len(), 20);
    assert_eq!(store.len().await, 20);
    assert_eq!(store.get_history().await.len(), 20);
}
