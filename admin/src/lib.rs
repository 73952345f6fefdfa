//! Shared configuration and commands for the concession admin CLI.

use anyhow::{Context, Result};
use async_trait::async_trait;
use concession_remote::{
    CreateOutcome, FeatureServiceAdapter, FeatureServiceConfig, RemoteCapabilities, RemoteError,
    RemoteResult, RemoteSyncAdapter, SyncOutcome,
};
use concession_storage::{SqliteKeyValueStore, StoreSnapshot};
use concession_sync::{LocalRecordStore, StoreConfig};
use concession_types::{Action, Record, RecordId};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Contents of the optional `--config` TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// SQLite file holding the store snapshot.
    pub database: PathBuf,
    /// Actor id recorded on history entries written by the CLI.
    pub actor: String,
    pub remote: FeatureServiceConfig,
    pub store: StoreConfig,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("concessions.db"),
            actor: "admin".to_string(),
            remote: FeatureServiceConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl AdminConfig {
    /// Reads a TOML config file. Missing sections take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// True if a feature layer URL has been configured.
    pub fn has_remote(&self) -> bool {
        !self.remote.layer_url.trim().is_empty()
    }
}

/// Stand-in remote used when no feature layer is configured. Reports no
/// write capabilities and fails every call, so mutations stay pending.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedRemote;

const DETACHED: &str = "no feature layer configured";

#[async_trait]
impl RemoteSyncAdapter for DetachedRemote {
    async fn capabilities(&self) -> RemoteCapabilities {
        RemoteCapabilities::read_only()
    }

    async fn create(&self, _record: &Record) -> CreateOutcome {
        CreateOutcome::failed(DETACHED)
    }

    async fn update(&self, _record: &Record) -> SyncOutcome {
        SyncOutcome::failed(DETACHED)
    }

    async fn delete(&self, _id: &RecordId) -> SyncOutcome {
        SyncOutcome::failed(DETACHED)
    }

    async fn fetch_snapshot(&self) -> RemoteResult<Vec<Record>> {
        Err(RemoteError::Config(DETACHED.to_string()))
    }
}

/// Builds the remote adapter for `config`, falling back to
/// [`DetachedRemote`] when no layer URL is set.
pub fn build_adapter(config: &AdminConfig) -> Result<Arc<dyn RemoteSyncAdapter>> {
    if !config.has_remote() {
        warn!("No feature layer configured, running detached");
        return Ok(Arc::new(DetachedRemote));
    }
    let adapter = FeatureServiceAdapter::new(config.remote.clone())
        .context("configuring feature service adapter")?;
    info!("Using feature layer {}", config.remote.layer_url);
    Ok(Arc::new(adapter))
}

/// Opens the SQLite-backed store described by `config`.
pub async fn open_store(config: &AdminConfig) -> Result<LocalRecordStore> {
    let adapter = build_adapter(config)?;
    open_store_with(config, adapter).await
}

/// Opens the store with an explicit adapter.
pub async fn open_store_with(
    config: &AdminConfig,
    adapter: Arc<dyn RemoteSyncAdapter>,
) -> Result<LocalRecordStore> {
    let kv = SqliteKeyValueStore::open(&config.database)
        .with_context(|| format!("opening database {}", config.database.display()))?;
    LocalRecordStore::open(config.store.clone(), adapter, Arc::new(kv))
        .await
        .context("loading record store")
}

/// Serializes the store as pretty JSON, writing it to `output` if given.
pub async fn export_snapshot(store: &LocalRecordStore, output: Option<&Path>) -> Result<String> {
    let json = store
        .export_data()
        .await
        .to_json_pretty()
        .context("encoding snapshot")?;
    if let Some(path) = output {
        std::fs::write(path, &json)
            .with_context(|| format!("writing export to {}", path.display()))?;
        info!("Exported snapshot to {}", path.display());
    }
    Ok(json)
}

/// Replaces the store contents with the snapshot in `path`. Returns the
/// number of records imported.
pub async fn import_snapshot(store: &LocalRecordStore, path: &Path) -> Result<usize> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading import file {}", path.display()))?;
    let snapshot = StoreSnapshot::from_json(&raw)
        .with_context(|| format!("decoding snapshot in {}", path.display()))?;
    let count = snapshot.records.len();
    store.import_data(snapshot).await;
    Ok(count)
}

/// One line per history entry: `timestamp type record actor [pending]`.
pub fn format_action(action: &Action) -> String {
    let status = if action.synced_to_remote {
        "synced"
    } else {
        "pending"
    };
    format!(
        "{} {:<6} {:<12} {:<12} {}",
        action.timestamp.format("%Y-%m-%d %H:%M:%S"),
        action.action_type,
        action.record_id,
        action.actor_id,
        status
    )
}

/// One line per record: `id name owner size`.
pub fn format_record(record: &Record) -> String {
    format!(
        "{:<12} {:<32} {:<24} {:>10.2} ha",
        record.id, record.name, record.owner, record.size
    )
}
