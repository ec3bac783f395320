mod api;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use magpie_core::{
    load_config, validate_config, AlbumImporter, BackupRunner, BlacklistCleanupRunner,
    BlacklistFilter, BlacklistStore, BookImporter, CompletedScanRunner, CompletedScanner,
    DownloadClient, DownloadClientKind, DownloadManager, DownloadMonitorRunner, DownloadStore,
    EpisodeImporter, HttpGateway, Importer, ImporterSet, IndexerClient, LibraryStore,
    MovieImporter, NewznabClient, ProviderLimits, RssSync, RssSyncRunner, SabnzbdClient,
    ScheduledTask, Scheduler, SearchTask, SqliteBlacklistStore, SqliteDownloadStore,
    SqliteLibraryStore, SqliteTaskStore, TaskRunner, TaskStore, TaskType, WantedSearchRunner,
};

use api::create_router;
use state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("MAGPIE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    validate_config(&config).context("Configuration validation failed")?;

    info!(version = VERSION, "Configuration loaded");
    info!("Database path: {:?}", config.database.path);

    // Log a config fingerprint without leaking secrets
    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(config_hash = &config_hash[..16], "Starting magpie");

    if let Some(parent) = config.database.path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create data dir {:?}", parent))?;
        }
    }

    // Stores share the database file, one connection each
    let library: Arc<dyn LibraryStore> = Arc::new(
        SqliteLibraryStore::new(&config.database.path).context("Failed to open library store")?,
    );
    let downloads: Arc<dyn DownloadStore> = Arc::new(
        SqliteDownloadStore::new(&config.database.path)
            .context("Failed to open download store")?,
    );
    let blacklist: Arc<dyn BlacklistStore> = Arc::new(
        SqliteBlacklistStore::new(&config.database.path)
            .context("Failed to open blacklist store")?,
    );
    let task_store: Arc<dyn TaskStore> = Arc::new(
        SqliteTaskStore::new(&config.database.path).context("Failed to open task store")?,
    );
    info!("Stores initialized");

    // Reconcile configured root folders into the library
    for folder in &config.library.root_folders {
        if !folder.path.exists() {
            if config.library.create_missing_root_folders {
                tokio::fs::create_dir_all(&folder.path)
                    .await
                    .with_context(|| format!("Failed to create root folder {:?}", folder.path))?;
                info!(path = %folder.path.display(), "Created root folder");
            } else {
                bail!("Root folder does not exist: {}", folder.path.display());
            }
        }
        if library.root_folder(folder.media_type)?.is_none() {
            library.add_root_folder(&folder.path.to_string_lossy(), folder.media_type)?;
            info!(
                path = %folder.path.display(),
                kind = folder.media_type.as_str(),
                "Registered root folder"
            );
        }
    }

    // One outbound gateway for every third-party integration
    let provider_limits = config
        .rate_limits
        .providers
        .iter()
        .map(|(key, limits)| (key.clone(), ProviderLimits::from(limits)))
        .collect();
    let gateway = Arc::new(HttpGateway::new(
        ProviderLimits::from(&config.rate_limits.default),
        provider_limits,
    ));

    let indexer_client: Arc<dyn IndexerClient> = Arc::new(NewznabClient::new(Arc::clone(&gateway)));
    info!(indexers = config.indexers.len(), "Indexer client initialized");

    // Download clients, highest priority first
    let mut client_configs: Vec<_> = config
        .download_clients
        .iter()
        .filter(|c| c.enabled)
        .cloned()
        .collect();
    client_configs.sort_by_key(|c| c.priority);
    let clients: Vec<Arc<dyn DownloadClient>> = client_configs
        .into_iter()
        .map(|c| match c.kind {
            DownloadClientKind::Sabnzbd => {
                info!(client = %c.id, url = %c.base_url(), "Initializing SABnzbd client");
                Arc::new(SabnzbdClient::new(Arc::clone(&gateway), c)) as Arc<dyn DownloadClient>
            }
        })
        .collect();
    if clients.is_empty() {
        warn!("No enabled download clients configured; grabs will fail");
    }

    // Importers and the download manager
    let importers = Arc::new(ImporterSet::new(vec![
        Arc::new(MovieImporter::new(Arc::clone(&library))) as Arc<dyn Importer>,
        Arc::new(EpisodeImporter::new(Arc::clone(&library))),
        Arc::new(AlbumImporter::new(Arc::clone(&library))),
        Arc::new(BookImporter::new(Arc::clone(&library))),
    ]));
    let manager = Arc::new(DownloadManager::new(
        Arc::clone(&downloads),
        Arc::clone(&library),
        Arc::clone(&blacklist),
        clients.clone(),
        importers,
    ));

    // Periodic engine components
    let rss_sync = Arc::new(RssSync::new(
        config.indexers.clone(),
        Arc::clone(&indexer_client),
        Arc::clone(&library),
        Arc::clone(&downloads),
        BlacklistFilter::new(Arc::clone(&blacklist)),
        Arc::clone(&manager),
        config.rss.clone(),
    ));
    let scanner = Arc::new(CompletedScanner::new(
        clients.clone(),
        Arc::clone(&downloads),
        Arc::clone(&library),
        Arc::clone(&manager),
        config.scanner.clone(),
    ));
    let search = Arc::new(SearchTask::new(
        config.indexers.clone(),
        Arc::clone(&indexer_client),
        Arc::clone(&library),
        Arc::clone(&downloads),
        BlacklistFilter::new(Arc::clone(&blacklist)),
        Arc::clone(&manager),
        config.rss.clone(),
        config.search.clone(),
    ));

    let backup_dir = config.backup.dir.clone().unwrap_or_else(|| {
        config
            .database
            .path
            .parent()
            .map(|p| p.join("backups"))
            .unwrap_or_else(|| PathBuf::from("backups"))
    });

    // Scheduler with the default task set
    let mut scheduler = Scheduler::new(Arc::clone(&task_store));
    scheduler.register(Arc::new(DownloadMonitorRunner::new(Arc::clone(&manager)))
        as Arc<dyn TaskRunner>);
    scheduler.register(Arc::new(CompletedScanRunner::new(Arc::clone(&scanner))));
    scheduler.register(Arc::new(RssSyncRunner::new(Arc::clone(&rss_sync))));
    scheduler.register(Arc::new(WantedSearchRunner::new(Arc::clone(&search))));
    scheduler.register(Arc::new(BackupRunner::new(
        config.database.path.clone(),
        backup_dir,
        config.backup.keep,
    )));
    scheduler.register(Arc::new(BlacklistCleanupRunner::new(
        Arc::clone(&blacklist),
        config.blacklist.retention_days,
    )));
    let scheduler = Arc::new(scheduler);

    let defaults = task_defaults(&config);
    scheduler
        .start(&defaults)
        .await
        .context("Failed to start scheduler")?;
    info!("Scheduler started");

    // Metrics registry
    let registry = prometheus::Registry::new();
    for metric in magpie_core::metrics::all_metrics() {
        registry
            .register(metric)
            .context("Failed to register metric")?;
    }

    // Create app state and router
    let state = Arc::new(AppState::new(
        config.clone(),
        Arc::clone(&scheduler),
        Arc::clone(&manager),
        downloads,
        library,
        registry,
    ));
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    scheduler.stop();
    info!("Scheduler stopped");

    Ok(())
}

/// Merge config overrides into the default task rows.
fn task_defaults(config: &magpie_core::Config) -> Vec<ScheduledTask> {
    TaskType::all()
        .iter()
        .map(|task_type| {
            let mut task = ScheduledTask::with_defaults(*task_type);
            if let Some(over) = config
                .tasks
                .iter()
                .find(|o| TaskType::from_str(&o.task) == Some(*task_type))
            {
                if let Some(interval) = over.interval_minutes {
                    task.interval_minutes = interval;
                }
                if let Some(enabled) = over.enabled {
                    task.enabled = enabled;
                }
            }
            task
        })
        .collect()
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
