//! Download client types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::download::DownloadStatus;
use crate::gateway::GatewayError;

/// Normalized job state across client backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Downloading,
    Paused,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn to_download_status(self) -> DownloadStatus {
        match self {
            JobStatus::Queued => DownloadStatus::Queued,
            JobStatus::Downloading => DownloadStatus::Downloading,
            JobStatus::Paused => DownloadStatus::Paused,
            JobStatus::Completed => DownloadStatus::Completed,
            JobStatus::Failed => DownloadStatus::Failed,
        }
    }
}

/// An entry in the client's active queue (or just-finished history, for
/// backends that move completed jobs out of the queue).
#[derive(Debug, Clone)]
pub struct Job {
    pub external_id: String,
    pub title: String,
    /// Percent complete, 0..=100.
    pub progress: f64,
    pub status: JobStatus,
    pub size_bytes: i64,
    /// Local (mapped) output path, once the client reports one.
    pub output_path: Option<String>,
}

/// A completed or failed job from the client's history.
#[derive(Debug, Clone)]
pub struct HistoryItem {
    pub external_id: String,
    pub name: String,
    pub category: Option<String>,
    /// Local (mapped) storage path.
    pub storage_path: Option<String>,
    pub status: JobStatus,
    pub fail_message: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Request to enqueue a grab.
#[derive(Debug, Clone)]
pub struct AddJobRequest {
    pub download_url: String,
    pub title: String,
    pub category: Option<String>,
}

/// Errors from download client requests.
#[derive(Debug, Error)]
pub enum DownloadClientError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Client rejected job: {0}")]
    Rejected(String),
}

impl DownloadClientError {
    /// Transport-level failures that must not flip a download to failed.
    pub fn is_transient(&self) -> bool {
        matches!(self, DownloadClientError::Gateway(e) if e.is_transient())
    }
}

/// Uniform contract over heterogeneous download client backends.
#[async_trait]
pub trait DownloadClient: Send + Sync {
    /// Stable client id (matches `Download.client_id`).
    fn id(&self) -> &str;

    /// Remove finished jobs from the client after a successful import.
    fn remove_completed(&self) -> bool {
        false
    }

    /// Remove failed jobs from the client.
    fn remove_failed(&self) -> bool {
        false
    }

    /// Enqueue a grab; returns the id the client assigned.
    async fn add_job(&self, request: &AddJobRequest) -> Result<String, DownloadClientError>;

    /// Active queue, including just-finished jobs for backends that move them
    /// straight to history.
    async fn get_jobs(&self) -> Result<Vec<Job>, DownloadClientError>;

    /// Recent completed/failed jobs.
    async fn get_history(&self, limit: u32) -> Result<Vec<HistoryItem>, DownloadClientError>;

    /// Remove a job, optionally deleting downloaded data.
    async fn cancel(&self, external_id: &str, delete_data: bool)
        -> Result<(), DownloadClientError>;
}
