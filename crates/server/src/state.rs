use std::sync::Arc;

use chrono::{DateTime, Utc};
use prometheus::Registry;

use magpie_core::{Config, DownloadManager, DownloadStore, LibraryStore, Scheduler};

/// Shared application state for the management API.
pub struct AppState {
    pub config: Config,
    pub scheduler: Arc<Scheduler>,
    pub manager: Arc<DownloadManager>,
    pub downloads: Arc<dyn DownloadStore>,
    pub library: Arc<dyn LibraryStore>,
    pub registry: Registry,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        config: Config,
        scheduler: Arc<Scheduler>,
        manager: Arc<DownloadManager>,
        downloads: Arc<dyn DownloadStore>,
        library: Arc<dyn LibraryStore>,
        registry: Registry,
    ) -> Self {
        Self {
            config,
            scheduler,
            manager,
            downloads,
            library,
            registry,
            started_at: Utc::now(),
        }
    }
}
