//! HTTP adapter for an ArcGIS-style feature layer.
//!
//! Writes go through the layer's `addFeatures`, `updateFeatures` and
//! `deleteFeatures` endpoints as form posts with `f=json`. The service
//! reports most failures inside a 200 response, either as a top-level
//! `error` object or as `success: false` on the per-feature result, so both
//! are checked.

use crate::adapter::{CreateOutcome, RemoteCapabilities, RemoteSyncAdapter, SyncOutcome};
use crate::error::{RemoteError, RemoteResult};
use crate::mapping::{feature_from_record, record_from_feature, Feature, WGS84_WKID};
use async_trait::async_trait;
use concession_types::{Record, RecordId};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration for the feature layer adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureServiceConfig {
    /// Feature layer URL, e.g. `https://host/arcgis/rest/services/Concessions/FeatureServer/0`.
    /// Empty means the remote is not configured.
    pub layer_url: String,
    /// Request timeout enforced by the HTTP client.
    pub timeout_secs: u64,
    /// Page size for snapshot queries.
    pub page_size: u32,
}

impl Default for FeatureServiceConfig {
    fn default() -> Self {
        Self {
            layer_url: String::new(),
            timeout_secs: 30,
            page_size: 1000,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    code: Option<i64>,
    message: Option<String>,
    #[serde(default)]
    details: Vec<String>,
}

impl ServiceError {
    fn describe(&self) -> String {
        let mut msg = format!(
            "service error {}: {}",
            self.code.unwrap_or_default(),
            self.message.as_deref().unwrap_or("unknown error")
        );
        if !self.details.is_empty() {
            msg.push_str(&format!(" ({})", self.details.join("; ")));
        }
        msg
    }
}

#[derive(Debug, Deserialize)]
struct LayerInfo {
    capabilities: Option<String>,
    error: Option<ServiceError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EditResponse {
    #[serde(default)]
    add_results: Vec<EditResult>,
    #[serde(default)]
    update_results: Vec<EditResult>,
    #[serde(default)]
    delete_results: Vec<EditResult>,
    error: Option<ServiceError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EditResult {
    object_id: Option<i64>,
    #[serde(default)]
    success: bool,
    error: Option<EditError>,
}

#[derive(Debug, Deserialize)]
struct EditError {
    code: Option<i64>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    features: Vec<Feature>,
    #[serde(default)]
    exceeded_transfer_limit: bool,
    error: Option<ServiceError>,
}

/// Adapter over a single feature layer. Owns one HTTP client for its
/// whole lifetime.
pub struct FeatureServiceAdapter {
    config: FeatureServiceConfig,
    layer_url: Url,
    client: Client,
}

impl FeatureServiceAdapter {
    /// Creates the adapter.
    ///
    /// Fails with [`RemoteError::Config`] when no layer URL is configured or
    /// the URL does not parse.
    pub fn new(config: FeatureServiceConfig) -> RemoteResult<Self> {
        let trimmed = config.layer_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(RemoteError::Config("no feature layer URL configured".into()));
        }
        let layer_url = Url::parse(trimmed)
            .map_err(|e| RemoteError::Config(format!("invalid layer URL {trimmed:?}: {e}")))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RemoteError::Config(format!("failed to create HTTP client: {e}")))?;

        info!("Feature service adapter targeting {}", layer_url);
        Ok(Self {
            config,
            layer_url,
            client,
        })
    }

    /// Returns the configuration the adapter was built with.
    pub fn config(&self) -> &FeatureServiceConfig {
        &self.config
    }

    fn endpoint(&self, operation: &str) -> String {
        format!("{}/{}", self.layer_url.as_str().trim_end_matches('/'), operation)
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> RemoteResult<T> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(RemoteError::Network(format!("HTTP {status}: {body}")));
        }
        serde_json::from_str(&body)
            .map_err(|e| RemoteError::Protocol(format!("unexpected response body: {e}")))
    }

    async fn post_edits(&self, operation: &str, form: &[(&str, String)]) -> RemoteResult<EditResponse> {
        debug!("POST {}", operation);
        let response = self
            .client
            .post(self.endpoint(operation))
            .form(form)
            .send()
            .await?;
        let edits: EditResponse = Self::read_json(response).await?;
        if let Some(err) = &edits.error {
            return Err(RemoteError::Protocol(err.describe()));
        }
        Ok(edits)
    }

    fn first_result(results: Vec<EditResult>, operation: &str) -> RemoteResult<EditResult> {
        let result = results
            .into_iter()
            .next()
            .ok_or_else(|| RemoteError::Protocol(format!("{operation} returned no results")))?;
        if !result.success {
            let (code, description) = result
                .error
                .as_ref()
                .map(|e| (e.code.unwrap_or_default(), e.description.clone()))
                .unwrap_or_default();
            return Err(RemoteError::Protocol(format!(
                "{operation} rejected ({code}): {}",
                description.unwrap_or_else(|| "no description".into())
            )));
        }
        Ok(result)
    }

    fn features_param(record: &Record, with_object_id: bool) -> RemoteResult<String> {
        Ok(serde_json::to_string(&[feature_from_record(record, with_object_id)])?)
    }

    async fn try_capabilities(&self) -> RemoteResult<RemoteCapabilities> {
        let response = self
            .client
            .get(self.layer_url.clone())
            .query(&[("f", "json")])
            .send()
            .await?;
        let info: LayerInfo = Self::read_json(response).await?;
        if let Some(err) = &info.error {
            return Err(RemoteError::Protocol(err.describe()));
        }
        Ok(parse_capabilities(info.capabilities.as_deref().unwrap_or_default()))
    }

    async fn try_create(&self, record: &Record) -> RemoteResult<RecordId> {
        let features = Self::features_param(record, false)?;
        let edits = self
            .post_edits("addFeatures", &[("f", "json".into()), ("features", features)])
            .await?;
        let result = Self::first_result(edits.add_results, "addFeatures")?;
        result
            .object_id
            .map(RecordId::remote)
            .ok_or_else(|| RemoteError::Protocol("addFeatures returned no objectId".into()))
    }

    async fn try_update(&self, record: &Record) -> RemoteResult<()> {
        if record.id.object_id().is_none() {
            return Err(RemoteError::Protocol(format!(
                "record {} has no remote object id",
                record.id
            )));
        }
        let features = Self::features_param(record, true)?;
        let edits = self
            .post_edits("updateFeatures", &[("f", "json".into()), ("features", features)])
            .await?;
        Self::first_result(edits.update_results, "updateFeatures")?;
        Ok(())
    }

    async fn try_delete(&self, id: &RecordId) -> RemoteResult<()> {
        let object_id = id
            .object_id()
            .ok_or_else(|| RemoteError::Protocol(format!("record {id} has no remote object id")))?;
        let edits = self
            .post_edits(
                "deleteFeatures",
                &[("f", "json".into()), ("objectIds", object_id.to_string())],
            )
            .await?;
        Self::first_result(edits.delete_results, "deleteFeatures")?;
        Ok(())
    }
}

/// Parses the layer's comma separated capability list. `Editing` grants all
/// three write operations.
pub fn parse_capabilities(raw: &str) -> RemoteCapabilities {
    let mut caps = RemoteCapabilities::read_only();
    for cap in raw.split(',').map(|c| c.trim().to_ascii_lowercase()) {
        match cap.as_str() {
            "create" => caps.supports_create = true,
            "update" => caps.supports_update = true,
            "delete" => caps.supports_delete = true,
            "editing" => caps = RemoteCapabilities::full(),
            _ => {}
        }
    }
    caps
}

#[async_trait]
impl RemoteSyncAdapter for FeatureServiceAdapter {
    async fn capabilities(&self) -> RemoteCapabilities {
        match self.try_capabilities().await {
            Ok(caps) => caps,
            Err(e) => {
                warn!("Capability probe failed, treating layer as read-only: {}", e);
                RemoteCapabilities::read_only()
            }
        }
    }

    async fn create(&self, record: &Record) -> CreateOutcome {
        match self.try_create(record).await {
            Ok(remote_id) => {
                debug!("Created remote feature {} for {}", remote_id, record.id);
                CreateOutcome::created(remote_id)
            }
            Err(e) => {
                warn!("Remote create failed for {}: {}", record.id, e);
                CreateOutcome::failed(e.to_string())
            }
        }
    }

    async fn update(&self, record: &Record) -> SyncOutcome {
        match self.try_update(record).await {
            Ok(()) => SyncOutcome::ok(),
            Err(e) => {
                warn!("Remote update failed for {}: {}", record.id, e);
                SyncOutcome::failed(e.to_string())
            }
        }
    }

    async fn delete(&self, id: &RecordId) -> SyncOutcome {
        match self.try_delete(id).await {
            Ok(()) => SyncOutcome::ok(),
            Err(e) => {
                warn!("Remote delete failed for {}: {}", id, e);
                SyncOutcome::failed(e.to_string())
            }
        }
    }

    async fn fetch_snapshot(&self) -> RemoteResult<Vec<Record>> {
        let page_size = self.config.page_size.max(1);
        let out_sr = WGS84_WKID.to_string();
        let mut records = Vec::new();
        let mut offset: u32 = 0;

        loop {
            let response = self
                .client
                .get(self.endpoint("query"))
                .query(&[
                    ("where", "1=1"),
                    ("outFields", "*"),
                    ("returnGeometry", "true"),
                    ("outSR", out_sr.as_str()),
                    ("f", "json"),
                ])
                .query(&[("resultOffset", offset), ("resultRecordCount", page_size)])
                .send()
                .await?;
            let page: QueryResponse = Self::read_json(response).await?;
            if let Some(err) = &page.error {
                return Err(RemoteError::Protocol(err.describe()));
            }

            let count = page.features.len() as u32;
            records.extend(page.features.into_iter().filter_map(record_from_feature));

            if !page.exceeded_transfer_limit || count == 0 {
                break;
            }
            offset += count;
        }

        info!("Fetched {} records from feature service", records.len());
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_parse_individual_flags() {
        let caps = parse_capabilities("Query,Create, Update");
        assert!(caps.supports_create);
        assert!(caps.supports_update);
        assert!(!caps.supports_delete);
    }

    #[test]
    fn editing_implies_all_writes() {
        assert_eq!(parse_capabilities("Query,Editing"), RemoteCapabilities::full());
    }

    #[test]
    fn query_only_is_read_only() {
        assert!(!parse_capabilities("Query").can_edit());
        assert!(!parse_capabilities("").can_edit());
    }
}
