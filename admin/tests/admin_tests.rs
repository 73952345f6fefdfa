use concession_admin::{
    build_adapter, export_snapshot, format_action, import_snapshot, open_store, open_store_with,
    AdminConfig, DetachedRemote,
};
use concession_remote::{FeatureServiceConfig, RemoteCapabilities, RemoteSyncAdapter};
use concession_types::{ActorId, RecordDraft, RecordId};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LAYER_PATH: &str = "/arcgis/rest/services/Concessions/FeatureServer/0";

fn config_in(dir: &tempfile::TempDir) -> AdminConfig {
    AdminConfig {
        database: dir.path().join("concessions.db"),
        ..AdminConfig::default()
    }
}

// ── Configuration ───────────────────────────────────────────────

#[test]
fn config_defaults() {
    let config = AdminConfig::default();
    assert_eq!(config.database.to_str(), Some("concessions.db"));
    assert_eq!(config.actor, "admin");
    assert!(!config.has_remote());
    assert_eq!(config.store.history_limit, 100);
}

#[test]
fn config_from_partial_toml() {
    let config = AdminConfig::from_toml(
        r#"
        database = "/var/lib/concessions/store.db"

        [remote]
        layer_url = "https://gis.example.com/arcgis/rest/services/Concessions/FeatureServer/0"

        [store]
        dedupe_on_initialize = true

        [store.replay]
        max_attempts = 3
        "#,
    )
    .unwrap();

    assert_eq!(config.database.to_str(), Some("/var/lib/concessions/store.db"));
    assert!(config.has_remote());
    assert_eq!(config.remote.timeout_secs, 30);
    assert!(config.store.dedupe_on_initialize);
    assert_eq!(config.store.replay.max_attempts, 3);
    assert_eq!(config.store.replay.backoff_ms, 0);
    assert_eq!(config.actor, "admin");
}

#[test]
fn config_rejects_bad_toml() {
    assert!(AdminConfig::from_toml("database = [").is_err());
}

#[test]
fn config_load_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = AdminConfig::load(&dir.path().join("missing.toml")).unwrap_err();
    assert!(format!("{:#}", err).contains("missing.toml"));
}

// ── Detached mode ───────────────────────────────────────────────

#[tokio::test]
async fn detached_remote_is_read_only_and_fails() {
    let remote = DetachedRemote;
    assert_eq!(remote.capabilities().await, RemoteCapabilities::read_only());
    assert!(!remote.delete(&RecordId::remote(1)).await.success);
    assert!(remote.fetch_snapshot().await.is_err());
}

#[tokio::test]
async fn detached_store_keeps_mutations_pending() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&config_in(&dir)).await.unwrap();

    let record = store
        .create(RecordDraft::new("Acme Pit", "Jane Doe", 12.0), &ActorId::from("admin"))
        .await
        .unwrap();

    assert!(record.id.is_local());
    assert!(!store.can_edit_remote().await);
    assert_eq!(store.pending_actions().await.len(), 1);
    assert!(store.reconcile_with_remote().await.is_err());
}

#[test]
fn invalid_layer_url_fails_to_build() {
    let config = AdminConfig {
        remote: FeatureServiceConfig {
            layer_url: "not a url".into(),
            ..FeatureServiceConfig::default()
        },
        ..AdminConfig::default()
    };
    assert!(build_adapter(&config).is_err());
}

// ── Export / import ─────────────────────────────────────────────

#[tokio::test]
async fn export_then_import_into_fresh_database() {
    let source_dir = tempfile::tempdir().unwrap();
    let source = open_store(&config_in(&source_dir)).await.unwrap();
    source
        .create(RecordDraft::new("Acme Pit", "Jane Doe", 12.0), &ActorId::from("admin"))
        .await
        .unwrap();
    source
        .create(RecordDraft::new("Bono Quarry", "Kofi Mensah", 3.5), &ActorId::from("admin"))
        .await
        .unwrap();

    let file = source_dir.path().join("export.json");
    let json = export_snapshot(&source, Some(&file)).await.unwrap();
    assert_eq!(std::fs::read_to_string(&file).unwrap(), json);

    let target_dir = tempfile::tempdir().unwrap();
    let target = open_store(&config_in(&target_dir)).await.unwrap();
    let count = import_snapshot(&target, &file).await.unwrap();

    assert_eq!(count, 2);
    assert_eq!(target.export_data().await, source.export_data().await);
}

#[tokio::test]
async fn import_rejects_garbage() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&config_in(&dir)).await.unwrap();
    let file = dir.path().join("bad.json");
    std::fs::write(&file, "not json").unwrap();

    assert!(import_snapshot(&store, &file).await.is_err());
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn format_action_shows_pending_status() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&config_in(&dir)).await.unwrap();
    store
        .create(RecordDraft::new("Acme Pit", "Jane Doe", 12.0), &ActorId::from("jane"))
        .await
        .unwrap();

    let line = format_action(&store.get_history().await[0]);
    assert!(line.contains("create"));
    assert!(line.contains("local-1"));
    assert!(line.contains("jane"));
    assert!(line.ends_with("pending"));
}

// ── Feature service ─────────────────────────────────────────────

#[tokio::test]
async fn reconcile_against_feature_service() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/query", LAYER_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "features": [
                {
                    "attributes": {
                        "OBJECTID": 11,
                        "NAME": "Remote Pit",
                        "OWNER": "Ama Owusu",
                        "SIZE_HA": 40.5
                    }
                }
            ]
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = config_in(&dir);
    config.remote.layer_url = format!("{}{}", server.uri(), LAYER_PATH);

    let store = open_store(&config).await.unwrap();
    let report = store.reconcile_with_remote().await.unwrap();

    assert_eq!(report.remote, 1);
    let record = store.get_record(&RecordId::remote(11)).await.unwrap();
    assert_eq!(record.name, "Remote Pit");
    assert_eq!(record.size, 40.5);
}

#[tokio::test]
async fn state_persists_across_cli_runs() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir);

    {
        let store = open_store_with(&config, Arc::new(DetachedRemote)).await.unwrap();
        store
            .create(RecordDraft::new("Acme Pit", "Jane Doe", 12.0), &ActorId::from("admin"))
            .await
            .unwrap();
        store.dispose().await;
    }

    let store = open_store(&config).await.unwrap();
    assert_eq!(store.len().await, 1);
    assert_eq!(store.pending_actions().await.len(), 1);
}
