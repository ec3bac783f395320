//! Download storage trait and request types.

use chrono::{DateTime, Utc};

use crate::store::StoreError;

use super::types::{Download, DownloadStatus, DownloadTarget};

/// Request to persist a new download record.
#[derive(Debug, Clone)]
pub struct NewDownload {
    pub external_id: Option<String>,
    pub client_id: String,
    pub indexer_id: Option<String>,
    pub indexer_name: Option<String>,
    pub title: String,
    pub size_bytes: i64,
    pub download_url: String,
    pub guid: String,
    pub status: DownloadStatus,
    pub output_path: Option<String>,
    pub target: DownloadTarget,
}

/// Filter for listing downloads.
#[derive(Debug, Clone, Default)]
pub struct DownloadFilter {
    pub status: Option<DownloadStatus>,
    pub limit: Option<i64>,
}

impl DownloadFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: DownloadStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// The persistence port for download records. The `Download` table is the
/// single source of truth for in-flight state; writers update narrow column
/// sets.
pub trait DownloadStore: Send + Sync {
    fn create(&self, new: NewDownload) -> Result<Download, StoreError>;

    fn get(&self, id: i64) -> Result<Option<Download>, StoreError>;

    fn get_by_external_id(
        &self,
        client_id: &str,
        external_id: &str,
    ) -> Result<Option<Download>, StoreError>;

    fn list(&self, filter: &DownloadFilter) -> Result<Vec<Download>, StoreError>;

    /// All downloads in a non-terminal state.
    fn list_non_terminal(&self) -> Result<Vec<Download>, StoreError>;

    /// Whether a non-terminal download already exists for the target.
    fn has_active_for_target(&self, target: &DownloadTarget) -> Result<bool, StoreError>;

    /// Update observed client state: status, progress, and output path when
    /// known.
    fn update_progress(
        &self,
        id: i64,
        status: DownloadStatus,
        progress: f64,
        output_path: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Record the external id assigned by the client after enqueueing.
    fn set_external_id(&self, id: i64, external_id: &str) -> Result<(), StoreError>;

    /// Transition to `importing`, recording the output path and completion
    /// time.
    fn mark_importing(
        &self,
        id: i64,
        output_path: &str,
        completed_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Terminal success.
    fn mark_completed(&self, id: i64) -> Result<(), StoreError>;

    /// Terminal failure with a user-visible message.
    fn mark_failed(&self, id: i64, error: &str) -> Result<(), StoreError>;
}
