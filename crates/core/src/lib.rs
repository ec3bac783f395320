// Allow some clippy lints that are too noisy for this codebase
#![allow(clippy::type_complexity)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::collapsible_if)]

pub mod blacklist;
pub mod config;
pub mod download;
pub mod downloadclient;
pub mod gateway;
pub mod import;
pub mod indexer;
pub mod library;
pub mod metrics;
pub mod rss;
pub mod scanner;
pub mod scheduler;
pub mod search_task;
pub mod store;
pub mod title;

/// Testing utilities and mock implementations for E2E tests.
///
/// This module provides mock implementations of the external service traits,
/// allowing comprehensive E2E testing without real infrastructure.
pub mod testing;

pub use blacklist::{BlacklistEntry, BlacklistFilter, BlacklistStore, SqliteBlacklistStore};
pub use config::{
    load_config, load_config_from_str, validate_config, BackupConfig, BlacklistConfig, Config,
    ConfigError, DatabaseConfig, DownloadClientConfig, DownloadClientKind, IndexerConfig,
    LibraryConfig, ProviderLimitsConfig, RateLimitsConfig, RootFolderConfig, RssConfig,
    SanitizedConfig, ScannerConfig, SearchConfig, ServerConfig, TaskOverrideConfig,
};
pub use download::{
    Download, DownloadFilter, DownloadManager, DownloadStatus, DownloadStore, DownloadTarget,
    GrabError, GrabRequest, MonitorResult, NewDownload, SqliteDownloadStore,
};
pub use downloadclient::{
    AddJobRequest, DownloadClient, DownloadClientError, HistoryItem, Job, JobStatus, SabnzbdClient,
};
pub use gateway::{GatewayError, GatewayResponse, HttpGateway, ProviderLimits, ProviderQueue};
pub use import::{
    AlbumImporter, BookImporter, EpisodeImporter, Importer, ImporterSet, ImportError, ImportResult,
    MovieImporter,
};
pub use indexer::{IndexerClient, IndexerError, NewznabClient, Release, SearchOptions};
pub use library::{
    Album, Artist, Author, Book, Episode, LibraryStore, MediaFile, MediaFileOwner, MediaKind,
    Movie, RootFolder, SqliteLibraryStore, Track, TvShow, WantedAlbum, WantedBook, WantedEpisode,
};
pub use rss::{match_release, RssSync, RssSyncResult, WantedSets};
pub use scanner::{match_folder, parse_folder_name, CompletedScanner, ParsedFolder, ScanResult};
pub use scheduler::{
    BackupRunner, BlacklistCleanupRunner, CompletedScanRunner, DownloadMonitorRunner,
    RssSyncRunner, ScheduledTask, Scheduler, SchedulerError, SqliteTaskStore, TaskRunner,
    TaskStatus, TaskStore, TaskType, WantedSearchRunner,
};
pub use search_task::{SearchTask, SearchTaskResult};
pub use store::StoreError;
