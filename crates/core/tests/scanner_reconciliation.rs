//! Completed-downloads scanner reconciliation tests.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tempfile::TempDir;

use magpie_core::testing::{fixtures, MockDownloadClient};
use magpie_core::{
    AlbumImporter, BookImporter, CompletedScanner, DownloadClient, DownloadManager, DownloadStatus,
    DownloadStore, DownloadTarget, EpisodeImporter, Importer, ImporterSet, LibraryStore,
    MediaKind, MovieImporter, NewDownload, ScannerConfig, SqliteBlacklistStore,
    SqliteDownloadStore, SqliteLibraryStore,
};

struct Harness {
    library: Arc<SqliteLibraryStore>,
    downloads: Arc<SqliteDownloadStore>,
    client: Arc<MockDownloadClient>,
    scanner: CompletedScanner,
}

fn harness() -> Harness {
    let library = Arc::new(SqliteLibraryStore::in_memory().unwrap());
    let downloads = Arc::new(SqliteDownloadStore::in_memory().unwrap());
    let blacklist = Arc::new(SqliteBlacklistStore::in_memory().unwrap());
    let client = Arc::new(MockDownloadClient::new("sab"));

    let library_dyn: Arc<dyn LibraryStore> = library.clone();
    let importers = Arc::new(ImporterSet::new(vec![
        Arc::new(MovieImporter::new(library_dyn.clone())) as Arc<dyn Importer>,
        Arc::new(EpisodeImporter::new(library_dyn.clone())),
        Arc::new(AlbumImporter::new(library_dyn.clone())),
        Arc::new(BookImporter::new(library_dyn.clone())),
    ]));

    let manager = Arc::new(DownloadManager::new(
        downloads.clone(),
        library_dyn,
        blacklist,
        vec![client.clone() as Arc<dyn DownloadClient>],
        importers,
    ));

    let scanner = CompletedScanner::new(
        vec![client.clone() as Arc<dyn DownloadClient>],
        downloads.clone(),
        library.clone(),
        manager,
        ScannerConfig {
            history_limit: 50,
            stuck_import_minutes: 5,
        },
    );

    Harness {
        library,
        downloads,
        client,
        scanner,
    }
}

/// Build a completed job folder containing one movie file; returns its path.
async fn movie_job_dir(base: &TempDir, name: &str) -> String {
    let dir = base.path().join(name);
    tokio::fs::create_dir(&dir).await.unwrap();
    tokio::fs::write(dir.join("movie.mkv"), vec![0u8; 1024])
        .await
        .unwrap();
    dir.to_string_lossy().into_owned()
}

#[tokio::test]
async fn orphaned_completed_job_is_adopted_and_imported() {
    let harness = harness();
    let movie = harness
        .library
        .add_movie("Fight Club", Some(1999), None)
        .unwrap();

    let downloads_dir = TempDir::new().unwrap();
    let library_dir = TempDir::new().unwrap();
    harness
        .library
        .add_root_folder(&library_dir.path().to_string_lossy(), MediaKind::Movie)
        .unwrap();
    let storage = movie_job_dir(&downloads_dir, "Fight.Club.1999").await;

    // History knows a completed job the engine has no record of.
    harness.client.set_history(vec![fixtures::completed_slot(
        "X",
        "Fight.Club.1999.BluRay.1080p",
        Some(&storage),
    )]);

    let result = harness.scanner.run().await;
    assert_eq!(result.slots_seen, 1);
    assert_eq!(result.orphans_matched, 1);
    assert_eq!(result.imports_started, 1);

    let download = harness
        .downloads
        .get_by_external_id("sab", "X")
        .unwrap()
        .unwrap();
    assert_eq!(download.target, DownloadTarget::Movie { movie_id: movie.id });
    assert_eq!(download.status, DownloadStatus::Completed);
    assert!(harness.library.get_movie(movie.id).unwrap().unwrap().has_file);
    assert!(library_dir
        .path()
        .join("Fight Club (1999)/Fight Club (1999).mkv")
        .exists());
}

#[tokio::test]
async fn unmatched_orphan_is_skipped_silently() {
    let harness = harness();
    harness
        .library
        .add_movie("Fight Club", Some(1999), None)
        .unwrap();

    harness.client.set_history(vec![fixtures::completed_slot(
        "Y",
        "Totally.Unrelated.Show.S01E01",
        Some("/downloads/unrelated"),
    )]);

    let result = harness.scanner.run().await;
    assert_eq!(result.slots_seen, 1);
    assert_eq!(result.orphans_matched, 0);
    assert!(result.errors.is_empty());
    assert!(harness
        .downloads
        .get_by_external_id("sab", "Y")
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn stuck_import_is_recovered() {
    let harness = harness();
    let movie = harness
        .library
        .add_movie("Fight Club", Some(1999), None)
        .unwrap();

    let downloads_dir = TempDir::new().unwrap();
    let library_dir = TempDir::new().unwrap();
    harness
        .library
        .add_root_folder(&library_dir.path().to_string_lossy(), MediaKind::Movie)
        .unwrap();
    let storage = movie_job_dir(&downloads_dir, "Fight.Club.1999").await;

    // A download that has been stuck in importing for ten minutes.
    let download = harness
        .downloads
        .create(NewDownload {
            external_id: Some("Y".to_string()),
            client_id: "sab".to_string(),
            indexer_id: None,
            indexer_name: None,
            title: "Fight.Club.1999.BluRay.1080p".to_string(),
            size_bytes: 0,
            download_url: String::new(),
            guid: "y".to_string(),
            status: DownloadStatus::Queued,
            output_path: None,
            target: DownloadTarget::Movie { movie_id: movie.id },
        })
        .unwrap();
    harness
        .downloads
        .mark_importing(download.id, &storage, Utc::now() - Duration::minutes(10))
        .unwrap();

    harness.client.set_history(vec![fixtures::completed_slot(
        "Y",
        "Fight.Club.1999.BluRay.1080p",
        Some(&storage),
    )]);

    let result = harness.scanner.run().await;
    assert_eq!(result.imports_started, 1);

    let reloaded = harness.downloads.get(download.id).unwrap().unwrap();
    assert_eq!(reloaded.status, DownloadStatus::Completed);
}

#[tokio::test]
async fn fresh_importing_download_is_left_alone() {
    let harness = harness();
    let movie = harness
        .library
        .add_movie("Fight Club", Some(1999), None)
        .unwrap();

    let download = harness
        .downloads
        .create(NewDownload {
            external_id: Some("Z".to_string()),
            client_id: "sab".to_string(),
            indexer_id: None,
            indexer_name: None,
            title: "Fight.Club.1999".to_string(),
            size_bytes: 0,
            download_url: String::new(),
            guid: "z".to_string(),
            status: DownloadStatus::Queued,
            output_path: None,
            target: DownloadTarget::Movie { movie_id: movie.id },
        })
        .unwrap();
    harness
        .downloads
        .mark_importing(download.id, "/downloads/Fight.Club.1999", Utc::now())
        .unwrap();

    harness.client.set_history(vec![fixtures::completed_slot(
        "Z",
        "Fight.Club.1999",
        Some("/downloads/Fight.Club.1999"),
    )]);

    let result = harness.scanner.run().await;
    // Another import is presumed in flight; nothing is re-invoked.
    assert_eq!(result.imports_started, 0);
    let reloaded = harness.downloads.get(download.id).unwrap().unwrap();
    assert_eq!(reloaded.status, DownloadStatus::Importing);
}

#[tokio::test]
async fn terminal_downloads_are_not_retried() {
    let harness = harness();
    let movie = harness
        .library
        .add_movie("Fight Club", Some(1999), None)
        .unwrap();

    let download = harness
        .downloads
        .create(NewDownload {
            external_id: Some("F".to_string()),
            client_id: "sab".to_string(),
            indexer_id: None,
            indexer_name: None,
            title: "Fight.Club.1999".to_string(),
            size_bytes: 0,
            download_url: String::new(),
            guid: "f".to_string(),
            status: DownloadStatus::Queued,
            output_path: None,
            target: DownloadTarget::Movie { movie_id: movie.id },
        })
        .unwrap();
    harness
        .downloads
        .mark_failed(download.id, "import failed")
        .unwrap();

    harness.client.set_history(vec![fixtures::completed_slot(
        "F",
        "Fight.Club.1999",
        Some("/downloads/Fight.Club.1999"),
    )]);

    let result = harness.scanner.run().await;
    assert_eq!(result.imports_started, 0);
    let reloaded = harness.downloads.get(download.id).unwrap().unwrap();
    assert_eq!(reloaded.status, DownloadStatus::Failed);
    assert_eq!(reloaded.error_message.as_deref(), Some("import failed"));
}

#[tokio::test]
async fn failing_client_is_reported_and_skipped() {
    let harness = harness();
    harness.client.fail_queries(true);

    let result = harness.scanner.run().await;
    assert_eq!(result.clients_checked, 1);
    assert_eq!(result.slots_seen, 0);
    assert_eq!(result.errors.len(), 1);
}
