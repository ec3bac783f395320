//! The completed-downloads scan cycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info, warn};

use crate::config::ScannerConfig;
use crate::download::{DownloadManager, DownloadStatus, DownloadStore, NewDownload};
use crate::downloadclient::{DownloadClient, HistoryItem, JobStatus};
use crate::library::LibraryStore;
use crate::metrics;
use crate::rss::WantedSets;
use crate::store::StoreError;

use super::folder_matcher::match_folder;
use super::types::ScanResult;

/// Cap on wanted episodes loaded for orphan matching, mirroring the RSS sync
/// bound.
const WANTED_EPISODE_LIMIT: i64 = 50;

/// Reconciles completed download-client history against download records,
/// recovering stuck imports and adopting orphaned jobs via fuzzy folder
/// matching.
pub struct CompletedScanner {
    clients: Vec<Arc<dyn DownloadClient>>,
    downloads: Arc<dyn DownloadStore>,
    library: Arc<dyn LibraryStore>,
    manager: Arc<DownloadManager>,
    config: ScannerConfig,
    running: AtomicBool,
}

impl CompletedScanner {
    pub fn new(
        clients: Vec<Arc<dyn DownloadClient>>,
        downloads: Arc<dyn DownloadStore>,
        library: Arc<dyn LibraryStore>,
        manager: Arc<DownloadManager>,
        config: ScannerConfig,
    ) -> Self {
        Self {
            clients,
            downloads,
            library,
            manager,
            config,
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// One scan cycle. A second call while a cycle is in progress returns
    /// immediately.
    pub async fn run(&self) -> ScanResult {
        if self.running.swap(true, Ordering::SeqCst) {
            return ScanResult {
                errors: vec!["Already running".to_string()],
                ..Default::default()
            };
        }
        let result = self.scan().await;
        self.running.store(false, Ordering::SeqCst);
        result
    }

    fn load_wanted(&self) -> Result<WantedSets, StoreError> {
        Ok(WantedSets {
            movies: self.library.wanted_movies()?,
            episodes: self.library.wanted_episodes(WANTED_EPISODE_LIMIT)?,
            albums: self.library.wanted_albums()?,
            books: self.library.wanted_books()?,
        })
    }

    async fn scan(&self) -> ScanResult {
        let mut result = ScanResult::default();

        let wanted = match self.load_wanted() {
            Ok(wanted) => wanted,
            Err(e) => {
                result.errors.push(e.to_string());
                return result;
            }
        };

        for client in &self.clients {
            result.clients_checked += 1;
            let history = match client.get_history(self.config.history_limit).await {
                Ok(history) => history,
                Err(e) => {
                    warn!(client = %client.id(), "History fetch failed: {}", e);
                    result.errors.push(format!("{}: {}", client.id(), e));
                    continue;
                }
            };

            for slot in history {
                if slot.status != JobStatus::Completed {
                    continue;
                }
                result.slots_seen += 1;
                if let Err(e) = self
                    .reconcile_slot(client.as_ref(), &slot, &wanted, &mut result)
                    .await
                {
                    result.errors.push(format!("{}: {}", slot.name, e));
                }
            }
        }

        info!(
            clients = result.clients_checked,
            slots = result.slots_seen,
            imports = result.imports_started,
            orphans = result.orphans_matched,
            "Completed-downloads scan finished"
        );
        result
    }

    async fn reconcile_slot(
        &self,
        client: &dyn DownloadClient,
        slot: &HistoryItem,
        wanted: &WantedSets,
        result: &mut ScanResult,
    ) -> Result<(), StoreError> {
        match self
            .downloads
            .get_by_external_id(client.id(), &slot.external_id)?
        {
            Some(download) => {
                // Terminal records are settled; failed imports are not
                // auto-retried.
                if download.status.is_terminal() {
                    return Ok(());
                }

                if download.status == DownloadStatus::Importing {
                    let stuck_after = Duration::minutes(self.config.stuck_import_minutes);
                    let stuck = download
                        .completed_at
                        .map(|at| Utc::now() - at > stuck_after)
                        .unwrap_or(true);
                    if !stuck {
                        return Ok(());
                    }
                    debug!(download_id = download.id, "Recovering stuck import");
                    metrics::SCAN_RECONCILED.with_label_values(&["stuck"]).inc();
                    if self.manager.import_download(download.id).await {
                        result.imports_started += 1;
                    }
                    return Ok(());
                }

                let Some(output_path) = slot
                    .storage_path
                    .clone()
                    .or_else(|| download.output_path.clone())
                else {
                    warn!(download_id = download.id, "Completed slot has no path");
                    return Ok(());
                };
                let completed_at = slot.completed_at.unwrap_or_else(Utc::now);
                self.downloads
                    .mark_importing(download.id, &output_path, completed_at)?;
                metrics::SCAN_RECONCILED
                    .with_label_values(&["existing"])
                    .inc();
                if self.manager.import_download(download.id).await {
                    result.imports_started += 1;
                }
                Ok(())
            }
            None => {
                // Orphan: match the job's folder name against the library.
                let folder_name = slot
                    .storage_path
                    .as_deref()
                    .and_then(|p| std::path::Path::new(p).file_name())
                    .and_then(|n| n.to_str())
                    .unwrap_or(&slot.name);

                let Some(target) = match_folder(folder_name, wanted) else {
                    debug!(slot = %slot.name, "No library match for orphaned job");
                    return Ok(());
                };
                if self.downloads.has_active_for_target(&target)? {
                    return Ok(());
                }
                let Some(output_path) = slot.storage_path.clone() else {
                    warn!(slot = %slot.name, "Matched orphan has no storage path");
                    return Ok(());
                };

                let download = self.downloads.create(NewDownload {
                    external_id: Some(slot.external_id.clone()),
                    client_id: client.id().to_string(),
                    indexer_id: None,
                    indexer_name: None,
                    title: slot.name.clone(),
                    size_bytes: 0,
                    download_url: String::new(),
                    guid: format!("{}:{}", client.id(), slot.external_id),
                    status: DownloadStatus::Importing,
                    output_path: Some(output_path.clone()),
                    target,
                })?;
                let completed_at = slot.completed_at.unwrap_or_else(Utc::now);
                self.downloads
                    .mark_importing(download.id, &output_path, completed_at)?;

                info!(
                    slot = %slot.name,
                    download_id = download.id,
                    "Adopted orphaned completed job"
                );
                metrics::SCAN_RECONCILED.with_label_values(&["orphan"]).inc();
                result.orphans_matched += 1;
                if self.manager.import_download(download.id).await {
                    result.imports_started += 1;
                }
                Ok(())
            }
        }
    }
}
