//! Download manager: owns the `Download` state machine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::blacklist::BlacklistStore;
use crate::downloadclient::{AddJobRequest, DownloadClient, DownloadClientError, JobStatus};
use crate::import::ImporterSet;
use crate::indexer::Release;
use crate::library::LibraryStore;
use crate::metrics;
use crate::store::StoreError;

use super::store::{DownloadStore, NewDownload};
use super::types::{Download, DownloadStatus, DownloadTarget};

/// Request to grab a matched release for a library target.
#[derive(Debug, Clone)]
pub struct GrabRequest {
    pub release: Release,
    pub target: DownloadTarget,
}

/// Typed grab failures; no unwinding for control flow.
#[derive(Debug, Error)]
pub enum GrabError {
    #[error("Invalid grab request: {0}")]
    Validation(String),

    #[error("{0}")]
    State(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Release is blacklisted: {0}")]
    Blacklisted(String),

    #[error("No enabled download client")]
    NoClient,

    #[error(transparent)]
    Client(#[from] DownloadClientError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of one monitor tick.
#[derive(Debug, Clone, Default)]
pub struct MonitorResult {
    pub checked: usize,
    pub imported: usize,
    pub skipped: bool,
    pub errors: Vec<String>,
}

/// Drives grab → monitor → import on persistent download records.
pub struct DownloadManager {
    downloads: Arc<dyn DownloadStore>,
    library: Arc<dyn LibraryStore>,
    blacklist: Arc<dyn BlacklistStore>,
    /// Enabled clients, ordered by priority.
    clients: Vec<Arc<dyn DownloadClient>>,
    importers: Arc<ImporterSet>,
    monitor_running: AtomicBool,
}

impl DownloadManager {
    pub fn new(
        downloads: Arc<dyn DownloadStore>,
        library: Arc<dyn LibraryStore>,
        blacklist: Arc<dyn BlacklistStore>,
        clients: Vec<Arc<dyn DownloadClient>>,
        importers: Arc<ImporterSet>,
    ) -> Self {
        Self {
            downloads,
            library,
            blacklist,
            clients,
            importers,
            monitor_running: AtomicBool::new(false),
        }
    }

    /// Whether a monitor tick is currently in flight.
    pub fn is_monitoring(&self) -> bool {
        self.monitor_running.load(Ordering::Relaxed)
    }

    fn client_by_id(&self, id: &str) -> Option<&Arc<dyn DownloadClient>> {
        self.clients.iter().find(|c| c.id() == id)
    }

    fn target_exists(&self, target: &DownloadTarget) -> Result<bool, StoreError> {
        Ok(match *target {
            DownloadTarget::Movie { movie_id } => self.library.get_movie(movie_id)?.is_some(),
            DownloadTarget::Episode {
                tv_show_id,
                episode_id,
            } => {
                self.library.get_tv_show(tv_show_id)?.is_some()
                    && self.library.get_episode(episode_id)?.is_some()
            }
            DownloadTarget::Album { album_id } => self.library.get_album(album_id)?.is_some(),
            DownloadTarget::Book { book_id } => self.library.get_book(book_id)?.is_some(),
        })
    }

    /// Validate preconditions, enqueue on the highest-priority client and
    /// persist the download record. A client rejection persists a `failed`
    /// record before the error surfaces.
    pub async fn grab(&self, request: GrabRequest) -> Result<Download, GrabError> {
        let release = &request.release;

        if release.title.trim().is_empty() {
            return Err(GrabError::Validation("release has no title".to_string()));
        }
        if release.download_url.trim().is_empty() {
            return Err(GrabError::Validation(
                "release has no download url".to_string(),
            ));
        }

        if !self.target_exists(&request.target)? {
            metrics::GRABS.with_label_values(&["rejected"]).inc();
            return Err(GrabError::NotFound(format!("{:?}", request.target)));
        }

        if self.downloads.has_active_for_target(&request.target)? {
            metrics::GRABS.with_label_values(&["rejected"]).inc();
            return Err(GrabError::State(
                "an active download already exists for this item".to_string(),
            ));
        }

        if self.blacklist.contains(&release.guid, &release.title)? {
            metrics::GRABS.with_label_values(&["rejected"]).inc();
            return Err(GrabError::Blacklisted(release.title.clone()));
        }

        let client = self.clients.first().ok_or(GrabError::NoClient)?;

        let add_request = AddJobRequest {
            download_url: release.download_url.clone(),
            title: release.title.clone(),
            category: Some(request.target.media_kind().as_str().to_string()),
        };

        match client.add_job(&add_request).await {
            Ok(external_id) => {
                let download = self.downloads.create(NewDownload {
                    external_id: Some(external_id),
                    client_id: client.id().to_string(),
                    indexer_id: Some(release.indexer_id.clone()),
                    indexer_name: Some(release.indexer_name.clone()),
                    title: release.title.clone(),
                    size_bytes: release.size_bytes,
                    download_url: release.download_url.clone(),
                    guid: release.guid.clone(),
                    status: DownloadStatus::Queued,
                    output_path: None,
                    target: request.target,
                })?;
                metrics::GRABS.with_label_values(&["success"]).inc();
                info!(
                    title = %download.title,
                    client = %download.client_id,
                    "Release grabbed"
                );
                Ok(download)
            }
            Err(e) => {
                // Grab failure transitions straight to failed.
                let download = self.downloads.create(NewDownload {
                    external_id: None,
                    client_id: client.id().to_string(),
                    indexer_id: Some(release.indexer_id.clone()),
                    indexer_name: Some(release.indexer_name.clone()),
                    title: release.title.clone(),
                    size_bytes: release.size_bytes,
                    download_url: release.download_url.clone(),
                    guid: release.guid.clone(),
                    status: DownloadStatus::Failed,
                    output_path: None,
                    target: request.target,
                })?;
                self.downloads.mark_failed(download.id, &e.to_string())?;
                metrics::GRABS.with_label_values(&["failed"]).inc();
                warn!(title = %release.title, "Grab failed: {}", e);
                Err(e.into())
            }
        }
    }

    /// One reconciliation tick: observe client queues, advance download
    /// records, import completed jobs. At most one tick runs per process.
    pub async fn monitor(&self) -> MonitorResult {
        if self.monitor_running.swap(true, Ordering::SeqCst) {
            return MonitorResult {
                skipped: true,
                errors: vec!["Already running".to_string()],
                ..Default::default()
            };
        }
        let result = self.monitor_tick().await;
        self.monitor_running.store(false, Ordering::SeqCst);
        result
    }

    async fn monitor_tick(&self) -> MonitorResult {
        let mut result = MonitorResult::default();

        let active = match self.downloads.list_non_terminal() {
            Ok(active) => active,
            Err(e) => {
                result.errors.push(e.to_string());
                return result;
            }
        };
        if active.is_empty() {
            return result;
        }

        for client in &self.clients {
            let mine: Vec<&Download> = active
                .iter()
                .filter(|d| d.client_id == client.id() && d.status != DownloadStatus::Importing)
                .collect();
            if mine.is_empty() {
                continue;
            }

            let jobs = match client.get_jobs().await {
                Ok(jobs) => jobs,
                Err(e) => {
                    // Transient client errors never flip downloads to failed.
                    warn!(client = %client.id(), "Failed to query client: {}", e);
                    result.errors.push(format!("{}: {}", client.id(), e));
                    continue;
                }
            };

            for download in mine {
                result.checked += 1;
                let Some(external_id) = download.external_id.as_deref() else {
                    continue;
                };
                let Some(job) = jobs.iter().find(|j| j.external_id == external_id) else {
                    // Unknown to the client right now; the completed-downloads
                    // scanner reconciles it from history.
                    debug!(download_id = download.id, "Job not visible on client");
                    continue;
                };

                match job.status {
                    JobStatus::Completed => {
                        let output_path = job
                            .output_path
                            .clone()
                            .or_else(|| download.output_path.clone());
                        let Some(output_path) = output_path else {
                            result.errors.push(format!(
                                "download {} completed without an output path",
                                download.id
                            ));
                            continue;
                        };
                        if let Err(e) =
                            self.downloads
                                .mark_importing(download.id, &output_path, Utc::now())
                        {
                            result.errors.push(e.to_string());
                            continue;
                        }
                        if self.import_download(download.id).await {
                            result.imported += 1;
                        }
                    }
                    JobStatus::Failed => {
                        if let Err(e) = self
                            .downloads
                            .mark_failed(download.id, "download failed on client")
                        {
                            result.errors.push(e.to_string());
                        }
                        if client.remove_failed() {
                            if let Err(e) = client.cancel(external_id, true).await {
                                warn!(client = %client.id(), "Failed to remove job: {}", e);
                            }
                        }
                    }
                    status => {
                        if let Err(e) = self.downloads.update_progress(
                            download.id,
                            status.to_download_status(),
                            job.progress,
                            job.output_path.as_deref(),
                        ) {
                            result.errors.push(e.to_string());
                        }
                    }
                }
            }
        }

        result
    }

    /// Run the importer for a download already in `importing` state. Flips the
    /// record to `completed` or `failed`; import errors never propagate.
    pub async fn import_download(&self, download_id: i64) -> bool {
        let download = match self.downloads.get(download_id) {
            Ok(Some(download)) => download,
            Ok(None) => {
                warn!(download_id, "Import requested for unknown download");
                return false;
            }
            Err(e) => {
                warn!(download_id, "Import lookup failed: {}", e);
                return false;
            }
        };

        let kind = download.target.media_kind().as_str();
        let result = self.importers.import(&download).await;

        if result.success {
            metrics::IMPORTS.with_label_values(&[kind, "success"]).inc();
            if let Err(e) = self.downloads.mark_completed(download.id) {
                warn!(download_id, "Failed to mark download completed: {}", e);
            }
            if let Some(client) = self.client_by_id(&download.client_id) {
                if client.remove_completed() {
                    if let Some(external_id) = download.external_id.as_deref() {
                        if let Err(e) = client.cancel(external_id, false).await {
                            warn!(client = %client.id(), "Failed to remove finished job: {}", e);
                        }
                    }
                }
            }
            info!(
                download_id,
                files = result.files_imported,
                "Import complete"
            );
            true
        } else {
            metrics::IMPORTS.with_label_values(&[kind, "failed"]).inc();
            let message = result.errors.join("; ");
            if let Err(e) = self.downloads.mark_failed(download.id, &message) {
                warn!(download_id, "Failed to mark download failed: {}", e);
            }
            if let Err(e) =
                self.blacklist
                    .add(Some(&download.guid), Some(&download.title), "import failed")
            {
                warn!(download_id, "Failed to blacklist release: {}", e);
            }
            warn!(download_id, "Import failed: {}", message);
            false
        }
    }

    /// Cancel a non-terminal download: remove the client job and mark the
    /// record failed with reason `cancelled`.
    pub async fn cancel(&self, download_id: i64, delete_data: bool) -> Result<(), GrabError> {
        let download = self
            .downloads
            .get(download_id)?
            .ok_or_else(|| GrabError::NotFound(format!("download {}", download_id)))?;

        if download.status.is_terminal() {
            return Err(GrabError::State(format!(
                "download {} is already {}",
                download_id,
                download.status.as_str()
            )));
        }

        if let (Some(external_id), Some(client)) = (
            download.external_id.as_deref(),
            self.client_by_id(&download.client_id),
        ) {
            if let Err(e) = client.cancel(external_id, delete_data).await {
                // The record is still cancelled locally.
                warn!(download_id, "Client-side cancel failed: {}", e);
            }
        }

        self.downloads.mark_failed(download_id, "cancelled")?;
        Ok(())
    }
}
