//! TaskRunner adapters over the engine components, plus the two
//! maintenance-only runners (backup, blacklist cleanup).

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::fs;
use tracing::info;

use crate::blacklist::BlacklistStore;
use crate::download::DownloadManager;
use crate::rss::RssSync;
use crate::scanner::CompletedScanner;
use crate::search_task::SearchTask;

use super::runner::TaskRunner;
use super::types::TaskType;

fn errors_to_result(errors: Vec<String>) -> Result<(), String> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join("; "))
    }
}

/// Download monitor tick (1 min default).
pub struct DownloadMonitorRunner {
    manager: Arc<DownloadManager>,
}

impl DownloadMonitorRunner {
    pub fn new(manager: Arc<DownloadManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl TaskRunner for DownloadMonitorRunner {
    fn task_type(&self) -> TaskType {
        TaskType::DownloadMonitor
    }

    fn is_running(&self) -> bool {
        self.manager.is_monitoring()
    }

    async fn run(&self) -> Result<(), String> {
        let result = self.manager.monitor().await;
        errors_to_result(result.errors)
    }
}

/// Completed-downloads scan (5 min default).
pub struct CompletedScanRunner {
    scanner: Arc<CompletedScanner>,
}

impl CompletedScanRunner {
    pub fn new(scanner: Arc<CompletedScanner>) -> Self {
        Self { scanner }
    }
}

#[async_trait]
impl TaskRunner for CompletedScanRunner {
    fn task_type(&self) -> TaskType {
        TaskType::CompletedScan
    }

    fn is_running(&self) -> bool {
        self.scanner.is_running()
    }

    async fn run(&self) -> Result<(), String> {
        let result = self.scanner.run().await;
        errors_to_result(result.errors)
    }
}

/// RSS sync (15 min default).
pub struct RssSyncRunner {
    sync: Arc<RssSync>,
}

impl RssSyncRunner {
    pub fn new(sync: Arc<RssSync>) -> Self {
        Self { sync }
    }
}

#[async_trait]
impl TaskRunner for RssSyncRunner {
    fn task_type(&self) -> TaskType {
        TaskType::RssSync
    }

    fn is_running(&self) -> bool {
        self.sync.is_running()
    }

    async fn run(&self) -> Result<(), String> {
        let result = self.sync.run().await;
        errors_to_result(result.errors)
    }
}

/// Wanted-items search (60 min default).
pub struct WantedSearchRunner {
    search: Arc<SearchTask>,
}

impl WantedSearchRunner {
    pub fn new(search: Arc<SearchTask>) -> Self {
        Self { search }
    }
}

#[async_trait]
impl TaskRunner for WantedSearchRunner {
    fn task_type(&self) -> TaskType {
        TaskType::WantedSearch
    }

    fn is_running(&self) -> bool {
        self.search.is_running()
    }

    async fn run(&self) -> Result<(), String> {
        let result = self.search.run().await;
        errors_to_result(result.errors)
    }
}

/// Daily copy of the database file, pruned to the newest `keep` copies.
pub struct BackupRunner {
    database_path: PathBuf,
    backup_dir: PathBuf,
    keep: usize,
    running: AtomicBool,
}

impl BackupRunner {
    pub fn new(database_path: PathBuf, backup_dir: PathBuf, keep: usize) -> Self {
        Self {
            database_path,
            backup_dir,
            keep: keep.max(1),
            running: AtomicBool::new(false),
        }
    }

    async fn backup(&self) -> Result<(), String> {
        fs::create_dir_all(&self.backup_dir)
            .await
            .map_err(|e| e.to_string())?;

        let stamp = Utc::now().format("%Y%m%d-%H%M%S");
        let target = self.backup_dir.join(format!("magpie-{}.db", stamp));
        fs::copy(&self.database_path, &target)
            .await
            .map_err(|e| format!("backup copy failed: {}", e))?;
        info!(target = %target.display(), "Database backed up");

        // Prune oldest copies beyond the retention count.
        let mut backups = Vec::new();
        let mut entries = fs::read_dir(&self.backup_dir)
            .await
            .map_err(|e| e.to_string())?;
        while let Some(entry) = entries.next_entry().await.map_err(|e| e.to_string())? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with("magpie-") && name.ends_with(".db") {
                backups.push(entry.path());
            }
        }
        backups.sort();
        while backups.len() > self.keep {
            let oldest = backups.remove(0);
            let _ = fs::remove_file(&oldest).await;
        }
        Ok(())
    }
}

#[async_trait]
impl TaskRunner for BackupRunner {
    fn task_type(&self) -> TaskType {
        TaskType::Backup
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    async fn run(&self) -> Result<(), String> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err("Already running".to_string());
        }
        let result = self.backup().await;
        self.running.store(false, Ordering::SeqCst);
        result
    }
}

/// Daily purge of blacklist entries past the retention window.
pub struct BlacklistCleanupRunner {
    store: Arc<dyn BlacklistStore>,
    retention_days: i64,
    running: AtomicBool,
}

impl BlacklistCleanupRunner {
    pub fn new(store: Arc<dyn BlacklistStore>, retention_days: i64) -> Self {
        Self {
            store,
            retention_days: retention_days.max(1),
            running: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl TaskRunner for BlacklistCleanupRunner {
    fn task_type(&self) -> TaskType {
        TaskType::BlacklistCleanup
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    async fn run(&self) -> Result<(), String> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err("Already running".to_string());
        }
        let cutoff = Utc::now() - Duration::days(self.retention_days);
        let result = match self.store.purge_older_than(cutoff) {
            Ok(purged) => {
                if purged > 0 {
                    info!(purged, "Blacklist cleanup complete");
                }
                Ok(())
            }
            Err(e) => Err(e.to_string()),
        };
        self.running.store(false, Ordering::SeqCst);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_backup_creates_and_prunes() {
        let data = TempDir::new().unwrap();
        let db_path = data.path().join("magpie.db");
        tokio::fs::write(&db_path, b"database bytes").await.unwrap();
        let backup_dir = data.path().join("backups");

        let runner = BackupRunner::new(db_path.clone(), backup_dir.clone(), 2);

        for _ in 0..3 {
            runner.run().await.unwrap();
            // Distinct timestamps for distinct file names.
            tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
        }

        let mut count = 0;
        let mut entries = tokio::fs::read_dir(&backup_dir).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            let name = entry.file_name().to_string_lossy().into_owned();
            assert!(name.starts_with("magpie-") && name.ends_with(".db"));
            count += 1;
        }
        assert_eq!(count, 2);
    }
}
