//! The RSS sync cycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::blacklist::BlacklistFilter;
use crate::config::{IndexerConfig, RssConfig};
use crate::download::{DownloadManager, DownloadStore, DownloadTarget, GrabError, GrabRequest};
use crate::indexer::{IndexerClient, SearchOptions};
use crate::library::{LibraryStore, MediaKind};
use crate::metrics;
use crate::store::StoreError;

use super::matcher::{match_release, WantedSets};
use super::types::RssSyncResult;

/// Periodic RSS sync over all enabled, RSS-capable indexers.
pub struct RssSync {
    indexers: Vec<IndexerConfig>,
    client: Arc<dyn IndexerClient>,
    library: Arc<dyn LibraryStore>,
    downloads: Arc<dyn DownloadStore>,
    blacklist: BlacklistFilter,
    manager: Arc<DownloadManager>,
    config: RssConfig,
    running: AtomicBool,
}

impl RssSync {
    pub fn new(
        indexers: Vec<IndexerConfig>,
        client: Arc<dyn IndexerClient>,
        library: Arc<dyn LibraryStore>,
        downloads: Arc<dyn DownloadStore>,
        blacklist: BlacklistFilter,
        manager: Arc<DownloadManager>,
        config: RssConfig,
    ) -> Self {
        Self {
            indexers,
            client,
            library,
            downloads,
            blacklist,
            manager,
            config,
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// One sync cycle. A second call while a cycle is in progress returns
    /// immediately.
    pub async fn run(&self) -> RssSyncResult {
        if self.running.swap(true, Ordering::SeqCst) {
            metrics::RSS_CYCLES.with_label_values(&["skipped"]).inc();
            return RssSyncResult {
                errors: vec!["Already running".to_string()],
                ..Default::default()
            };
        }
        let result = self.cycle().await;
        self.running.store(false, Ordering::SeqCst);
        result
    }

    /// Load the four wanted sets, excluding items that already have an active
    /// download.
    fn load_wanted(&self) -> Result<WantedSets, StoreError> {
        let mut wanted = WantedSets {
            movies: self.library.wanted_movies()?,
            episodes: self.library.wanted_episodes(self.config.episode_limit)?,
            albums: self.library.wanted_albums()?,
            books: self.library.wanted_books()?,
        };

        for download in self.downloads.list_non_terminal()? {
            wanted.remove_target(&download.target);
        }

        Ok(wanted)
    }

    fn feed_options(&self, indexer: &IndexerConfig) -> SearchOptions {
        let categories = if indexer.categories.is_empty() {
            MediaKind::all_categories().to_vec()
        } else {
            indexer.categories.clone()
        };
        SearchOptions::new(categories, self.config.limit)
    }

    async fn cycle(&self) -> RssSyncResult {
        let mut result = RssSyncResult::default();

        let mut enabled: Vec<&IndexerConfig> = self
            .indexers
            .iter()
            .filter(|i| i.enabled && i.supports_rss)
            .collect();
        enabled.sort_by_key(|i| i.priority);
        if enabled.is_empty() {
            debug!("RSS sync: no enabled RSS-capable indexers");
            metrics::RSS_CYCLES.with_label_values(&["empty"]).inc();
            return result;
        }

        let mut wanted = match self.load_wanted() {
            Ok(wanted) => wanted,
            Err(e) => {
                result.errors.push(e.to_string());
                return result;
            }
        };
        if wanted.is_empty() {
            debug!("RSS sync: nothing wanted");
            metrics::RSS_CYCLES.with_label_values(&["empty"]).inc();
            return result;
        }
        info!(wanted = wanted.total(), indexers = enabled.len(), "RSS sync started");

        // Fan the feed fetches out concurrently; matching stays sequential so
        // the first match wins deterministically.
        let fetches = enabled.iter().map(|&indexer| {
            let options = self.feed_options(indexer);
            async move { (indexer, self.client.rss(indexer, &options).await) }
        });
        let feeds = join_all(fetches).await;

        for (indexer, feed) in feeds {
            result.indexers_checked += 1;
            let releases = match feed {
                Ok(releases) => releases,
                Err(e) => {
                    warn!(indexer = %indexer.id, "RSS fetch failed: {}", e);
                    result.errors.push(format!("{}: {}", indexer.name, e));
                    continue;
                }
            };
            result.releases_found += releases.len();

            let releases = self.blacklist.filter(releases);
            for release in releases {
                if wanted.is_empty() {
                    break;
                }
                let Some(target) = match_release(&release.title, &wanted) else {
                    continue;
                };

                match self
                    .manager
                    .grab(GrabRequest {
                        release: release.clone(),
                        target,
                    })
                    .await
                {
                    Ok(_) => {
                        result.grabbed += 1;
                        wanted.remove_target(&target);
                        self.pause_after_grab().await;
                    }
                    // Raced with another grabber or stale wanted data; drop
                    // the item and keep going.
                    Err(GrabError::State(_)) | Err(GrabError::Blacklisted(_)) => {
                        wanted.remove_target(&target);
                    }
                    Err(e) => {
                        result.errors.push(format!("{}: {}", release.title, e));
                        remove_if_unusable(&mut wanted, &target, &e);
                    }
                }
            }
        }

        metrics::RSS_CYCLES.with_label_values(&["completed"]).inc();
        metrics::RSS_RELEASES
            .with_label_values(&[])
            .observe(result.releases_found as f64);
        info!(
            indexers = result.indexers_checked,
            releases = result.releases_found,
            grabbed = result.grabbed,
            errors = result.errors.len(),
            "RSS sync finished"
        );
        result
    }

    /// Rate-limit successive grabs to avoid overwhelming the download client.
    async fn pause_after_grab(&self) {
        if self.config.grab_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.grab_delay_ms)).await;
        }
    }
}

/// A target whose library entity vanished mid-cycle will fail every release;
/// stop matching it.
fn remove_if_unusable(wanted: &mut WantedSets, target: &DownloadTarget, error: &GrabError) {
    if matches!(error, GrabError::NotFound(_) | GrabError::Validation(_)) {
        wanted.remove_target(target);
    }
}
