//! SABnzbd download client adapter.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::config::DownloadClientConfig;
use crate::gateway::HttpGateway;

use super::types::{
    AddJobRequest, DownloadClient, DownloadClientError, HistoryItem, Job, JobStatus,
};

/// SABnzbd client, dispatching through the HTTP gateway under
/// `sabnzbd:<id>` provider keys.
pub struct SabnzbdClient {
    gateway: Arc<HttpGateway>,
    config: DownloadClientConfig,
}

// SABnzbd API DTOs. Numeric fields arrive as strings.

#[derive(Debug, Deserialize)]
struct QueueResponse {
    queue: QueueData,
}

#[derive(Debug, Deserialize)]
struct QueueData {
    #[serde(default)]
    slots: Vec<QueueSlot>,
}

#[derive(Debug, Deserialize)]
struct QueueSlot {
    nzo_id: String,
    filename: String,
    #[serde(default)]
    percentage: String,
    #[serde(default)]
    mb: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    history: HistoryData,
}

#[derive(Debug, Deserialize)]
struct HistoryData {
    #[serde(default)]
    slots: Vec<HistorySlot>,
}

#[derive(Debug, Deserialize)]
struct HistorySlot {
    nzo_id: String,
    name: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    storage: Option<String>,
    status: String,
    #[serde(default)]
    fail_message: String,
    #[serde(default)]
    completed: Option<i64>,
    #[serde(default)]
    bytes: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct AddUrlResponse {
    status: bool,
    #[serde(default)]
    nzo_ids: Vec<String>,
    #[serde(default)]
    error: Option<String>,
}

impl SabnzbdClient {
    pub fn new(gateway: Arc<HttpGateway>, config: DownloadClientConfig) -> Self {
        Self { gateway, config }
    }

    fn provider_key(&self) -> String {
        format!("sabnzbd:{}", self.config.id)
    }

    fn api_url(&self, params: &[(&str, &str)]) -> String {
        let mut url = format!(
            "{}/api?output=json&apikey={}",
            self.config.base_url(),
            urlencoding::encode(&self.config.api_key)
        );
        for (key, value) in params {
            url.push_str(&format!("&{}={}", key, urlencoding::encode(value)));
        }
        url
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        params: &[(&str, &str)],
    ) -> Result<T, DownloadClientError> {
        let url = self.api_url(params);
        let response = self.gateway.get(&self.provider_key(), &url).await?;
        serde_json::from_str(&response.body)
            .map_err(|e| DownloadClientError::Protocol(format!("bad SABnzbd response: {}", e)))
    }

    /// Apply the configured remote → local prefix substitution.
    fn map_path(&self, path: &str) -> String {
        if let (Some(remote), Some(local)) = (&self.config.remote_path, &self.config.local_path) {
            if let Some(rest) = path.strip_prefix(remote.as_str()) {
                return format!("{}{}", local, rest);
            }
        }
        path.to_string()
    }

    fn normalize_status(status: &str) -> JobStatus {
        match status {
            "Queued" | "Grabbing" | "Propagating" => JobStatus::Queued,
            "Paused" => JobStatus::Paused,
            "Completed" => JobStatus::Completed,
            "Failed" => JobStatus::Failed,
            // Extracting, Verifying, Repairing, Moving, Running, Fetching...
            _ => JobStatus::Downloading,
        }
    }

    fn queue_slot_to_job(slot: QueueSlot) -> Job {
        let progress = slot.percentage.parse::<f64>().unwrap_or(0.0);
        let size_bytes = slot
            .mb
            .parse::<f64>()
            .map(|mb| (mb * 1024.0 * 1024.0) as i64)
            .unwrap_or(0);
        Job {
            external_id: slot.nzo_id,
            title: slot.filename,
            progress: progress.clamp(0.0, 100.0),
            status: Self::normalize_status(&slot.status),
            size_bytes,
            output_path: None,
        }
    }

    fn history_slot_to_item(&self, slot: HistorySlot) -> HistoryItem {
        HistoryItem {
            external_id: slot.nzo_id,
            name: slot.name,
            category: slot.category,
            storage_path: slot.storage.map(|p| self.map_path(&p)),
            status: Self::normalize_status(&slot.status),
            fail_message: if slot.fail_message.is_empty() {
                None
            } else {
                Some(slot.fail_message)
            },
            completed_at: slot
                .completed
                .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)),
        }
    }
}

#[async_trait]
impl DownloadClient for SabnzbdClient {
    fn id(&self) -> &str {
        &self.config.id
    }

    fn remove_completed(&self) -> bool {
        self.config.remove_completed
    }

    fn remove_failed(&self) -> bool {
        self.config.remove_failed
    }

    async fn add_job(&self, request: &AddJobRequest) -> Result<String, DownloadClientError> {
        let category = request
            .category
            .clone()
            .or_else(|| self.config.category.clone())
            .unwrap_or_else(|| "misc".to_string());

        let response: AddUrlResponse = self
            .call(&[
                ("mode", "addurl"),
                ("name", &request.download_url),
                ("nzbname", &request.title),
                ("cat", &category),
            ])
            .await?;

        if !response.status {
            return Err(DownloadClientError::Rejected(
                response.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        let nzo_id = response
            .nzo_ids
            .into_iter()
            .next()
            .ok_or_else(|| DownloadClientError::Protocol("addurl returned no nzo_id".into()))?;

        debug!(client = %self.config.id, nzo_id = %nzo_id, "Job enqueued");
        Ok(nzo_id)
    }

    async fn get_jobs(&self) -> Result<Vec<Job>, DownloadClientError> {
        let response: QueueResponse = self.call(&[("mode", "queue")]).await?;
        let mut jobs: Vec<Job> = response
            .queue
            .slots
            .into_iter()
            .map(Self::queue_slot_to_job)
            .collect();

        // SABnzbd moves finished jobs straight to history; fold the recent
        // slots in so the monitor observes completion and the output path.
        let history: HistoryResponse = self
            .call(&[("mode", "history"), ("limit", "50")])
            .await?;
        for slot in history.history.slots {
            if jobs.iter().any(|j| j.external_id == slot.nzo_id) {
                continue;
            }
            let size_bytes = slot.bytes.unwrap_or(0);
            let item = self.history_slot_to_item(slot);
            jobs.push(Job {
                external_id: item.external_id,
                title: item.name,
                progress: if item.status == JobStatus::Completed {
                    100.0
                } else {
                    0.0
                },
                status: item.status,
                size_bytes,
                output_path: item.storage_path,
            });
        }

        Ok(jobs)
    }

    async fn get_history(&self, limit: u32) -> Result<Vec<HistoryItem>, DownloadClientError> {
        let limit = limit.to_string();
        let response: HistoryResponse = self
            .call(&[("mode", "history"), ("limit", &limit)])
            .await?;
        Ok(response
            .history
            .slots
            .into_iter()
            .map(|slot| self.history_slot_to_item(slot))
            .collect())
    }

    async fn cancel(
        &self,
        external_id: &str,
        delete_data: bool,
    ) -> Result<(), DownloadClientError> {
        let del_files = if delete_data { "1" } else { "0" };
        // The job may be in the queue or already in history; clear both.
        let _: serde_json::Value = self
            .call(&[
                ("mode", "queue"),
                ("name", "delete"),
                ("value", external_id),
                ("del_files", del_files),
            ])
            .await?;
        let _: serde_json::Value = self
            .call(&[
                ("mode", "history"),
                ("name", "delete"),
                ("value", external_id),
                ("del_files", del_files),
            ])
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DownloadClientKind;
    use crate::gateway::ProviderLimits;
    use std::collections::HashMap;

    fn client(remote: Option<&str>, local: Option<&str>) -> SabnzbdClient {
        let gateway = Arc::new(HttpGateway::new(ProviderLimits::default(), HashMap::new()));
        SabnzbdClient::new(
            gateway,
            DownloadClientConfig {
                id: "sab".to_string(),
                name: "SABnzbd".to_string(),
                kind: DownloadClientKind::Sabnzbd,
                host: "localhost".to_string(),
                port: 8080,
                api_key: "key".to_string(),
                use_ssl: false,
                enabled: true,
                priority: 1,
                remove_completed: true,
                remove_failed: false,
                remote_path: remote.map(|s| s.to_string()),
                local_path: local.map(|s| s.to_string()),
                category: Some("movies".to_string()),
            },
        )
    }

    #[test]
    fn test_map_path_substitutes_prefix() {
        let client = client(Some("/remote/dl"), Some("/mnt/dl"));
        assert_eq!(
            client.map_path("/remote/dl/Fight.Club.1999"),
            "/mnt/dl/Fight.Club.1999"
        );
        // Paths outside the prefix pass through untouched.
        assert_eq!(client.map_path("/other/place"), "/other/place");
    }

    #[test]
    fn test_map_path_without_mapping_is_identity() {
        let client = client(None, None);
        assert_eq!(client.map_path("/remote/dl/x"), "/remote/dl/x");
    }

    #[test]
    fn test_status_normalization() {
        assert_eq!(SabnzbdClient::normalize_status("Queued"), JobStatus::Queued);
        assert_eq!(
            SabnzbdClient::normalize_status("Downloading"),
            JobStatus::Downloading
        );
        assert_eq!(
            SabnzbdClient::normalize_status("Extracting"),
            JobStatus::Downloading
        );
        assert_eq!(
            SabnzbdClient::normalize_status("Completed"),
            JobStatus::Completed
        );
        assert_eq!(SabnzbdClient::normalize_status("Failed"), JobStatus::Failed);
        assert_eq!(SabnzbdClient::normalize_status("Paused"), JobStatus::Paused);
    }

    #[test]
    fn test_queue_slot_parsing() {
        let slot: QueueSlot = serde_json::from_str(
            r#"{"nzo_id":"SABnzbd_nzo_1","filename":"The.Matrix.1999","percentage":"75","mb":"8192.00","status":"Downloading"}"#,
        )
        .unwrap();
        let job = SabnzbdClient::queue_slot_to_job(slot);
        assert_eq!(job.external_id, "SABnzbd_nzo_1");
        assert_eq!(job.progress, 75.0);
        assert_eq!(job.size_bytes, 8192 * 1024 * 1024);
        assert_eq!(job.status, JobStatus::Downloading);
        assert!(job.output_path.is_none());
    }

    #[test]
    fn test_history_slot_maps_storage_path() {
        let client = client(Some("/remote/dl"), Some("/mnt/dl"));
        let slot: HistorySlot = serde_json::from_str(
            r#"{"nzo_id":"X","name":"Fight.Club.1999.BluRay.1080p","storage":"/remote/dl/Fight.Club.1999","status":"Completed","fail_message":"","completed":1752500000}"#,
        )
        .unwrap();
        let item = client.history_slot_to_item(slot);
        assert_eq!(item.storage_path.as_deref(), Some("/mnt/dl/Fight.Club.1999"));
        assert_eq!(item.status, JobStatus::Completed);
        assert!(item.fail_message.is_none());
        assert!(item.completed_at.is_some());
    }

    #[test]
    fn test_api_url_shape() {
        let client = client(None, None);
        let url = client.api_url(&[("mode", "queue")]);
        assert_eq!(
            url,
            "http://localhost:8080/api?output=json&apikey=key&mode=queue"
        );
    }
}
