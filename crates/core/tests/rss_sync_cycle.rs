//! End-to-end RSS sync cycle tests against mock indexers and a mock download
//! client.

use std::sync::Arc;
use std::time::Duration;

use magpie_core::testing::{fixtures, MockDownloadClient, MockIndexerClient};
use magpie_core::{
    AlbumImporter, BlacklistFilter, BlacklistStore, BookImporter, DownloadClient, DownloadManager,
    DownloadStatus, DownloadStore, DownloadTarget, EpisodeImporter, Importer, ImporterSet,
    IndexerConfig, LibraryStore, MovieImporter, RssConfig, RssSync, SqliteBlacklistStore,
    SqliteDownloadStore, SqliteLibraryStore,
};

struct Harness {
    library: Arc<SqliteLibraryStore>,
    downloads: Arc<SqliteDownloadStore>,
    blacklist: Arc<SqliteBlacklistStore>,
    download_client: Arc<MockDownloadClient>,
    indexer_client: Arc<MockIndexerClient>,
    manager: Arc<DownloadManager>,
}

fn harness() -> Harness {
    let library = Arc::new(SqliteLibraryStore::in_memory().unwrap());
    let downloads = Arc::new(SqliteDownloadStore::in_memory().unwrap());
    let blacklist = Arc::new(SqliteBlacklistStore::in_memory().unwrap());
    let download_client = Arc::new(MockDownloadClient::new("sab"));
    let indexer_client = Arc::new(MockIndexerClient::new());

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
        blacklist.clone(),
        vec![download_client.clone() as Arc<dyn DownloadClient>],
        importers,
    ));

    Harness {
        library,
        downloads,
        blacklist,
        download_client,
        indexer_client,
        manager,
    }
}

fn rss_config() -> RssConfig {
    RssConfig {
        limit: 100,
        episode_limit: 50,
        grab_delay_ms: 0,
    }
}

fn sync_with(harness: &Harness, indexers: Vec<IndexerConfig>) -> Arc<RssSync> {
    Arc::new(RssSync::new(
        indexers,
        harness.indexer_client.clone(),
        harness.library.clone(),
        harness.downloads.clone(),
        BlacklistFilter::new(harness.blacklist.clone()),
        harness.manager.clone(),
        rss_config(),
    ))
}

#[tokio::test]
async fn movie_release_is_matched_and_grabbed() {
    let harness = harness();
    let movie = harness
        .library
        .add_movie("The Matrix", Some(1999), None)
        .unwrap();

    harness.indexer_client.set_rss(
        "mock-indexer",
        vec![fixtures::release(
            "abc",
            "The.Matrix.1999.1080p.BluRay.x264-GROUP",
        )],
    );

    let sync = sync_with(&harness, vec![fixtures::indexer("mock-indexer")]);
    let result = sync.run().await;

    assert_eq!(result.indexers_checked, 1);
    assert_eq!(result.releases_found, 1);
    assert_eq!(result.grabbed, 1);
    assert!(result.errors.is_empty());

    let rows = harness
        .downloads
        .list(&magpie_core::DownloadFilter::new())
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, DownloadStatus::Queued);
    assert_eq!(rows[0].target, DownloadTarget::Movie { movie_id: movie.id });
    assert_eq!(rows[0].indexer_id.as_deref(), Some("mock-indexer"));

    assert_eq!(harness.download_client.added_jobs().len(), 1);
}

#[tokio::test]
async fn partial_title_is_rejected() {
    let harness = harness();
    harness
        .library
        .add_movie("The Matrix", Some(1999), None)
        .unwrap();

    harness.indexer_client.set_rss(
        "mock-indexer",
        vec![fixtures::release(
            "abc",
            "The.Matrix.Resurrections.2021.1080p.WEB-DL",
        )],
    );

    let sync = sync_with(&harness, vec![fixtures::indexer("mock-indexer")]);
    let result = sync.run().await;

    assert_eq!(result.releases_found, 1);
    assert_eq!(result.grabbed, 0);
    assert!(harness.download_client.added_jobs().is_empty());
}

#[tokio::test]
async fn episode_release_is_matched_and_grabbed() {
    let harness = harness();
    let show = harness.library.add_tv_show("Breaking Bad", None).unwrap();
    let episode = harness.library.add_episode(show.id, 5, 7, None).unwrap();

    harness.indexer_client.set_rss(
        "mock-indexer",
        vec![fixtures::release("ep", "Breaking.Bad.S05E07.720p.HDTV.x264")],
    );

    let sync = sync_with(&harness, vec![fixtures::indexer("mock-indexer")]);
    let result = sync.run().await;

    assert_eq!(result.grabbed, 1);
    let rows = harness
        .downloads
        .list(&magpie_core::DownloadFilter::new())
        .unwrap();
    assert_eq!(
        rows[0].target,
        DownloadTarget::Episode {
            tv_show_id: show.id,
            episode_id: episode.id,
        }
    );
}

#[tokio::test]
async fn empty_wanted_sets_skip_indexers_entirely() {
    let harness = harness();
    harness.indexer_client.set_rss(
        "mock-indexer",
        vec![fixtures::release("abc", "Some.Release.1080p")],
    );

    let sync = sync_with(&harness, vec![fixtures::indexer("mock-indexer")]);
    let result = sync.run().await;

    assert_eq!(result.indexers_checked, 0);
    assert_eq!(result.releases_found, 0);
    assert_eq!(result.grabbed, 0);
    assert_eq!(harness.indexer_client.rss_call_count(), 0);
}

#[tokio::test]
async fn zero_enabled_indexers_short_circuits() {
    let harness = harness();
    harness
        .library
        .add_movie("The Matrix", Some(1999), None)
        .unwrap();

    let mut disabled = fixtures::indexer("mock-indexer");
    disabled.enabled = false;
    let mut no_rss = fixtures::indexer("other");
    no_rss.supports_rss = false;

    let sync = sync_with(&harness, vec![disabled, no_rss]);
    let result = sync.run().await;

    assert_eq!(result.indexers_checked, 0);
    assert_eq!(harness.indexer_client.rss_call_count(), 0);
}

#[tokio::test]
async fn second_run_while_in_progress_returns_immediately() {
    let harness = harness();
    harness
        .library
        .add_movie("The Matrix", Some(1999), None)
        .unwrap();
    harness.indexer_client.set_delay(Duration::from_millis(200));
    harness.indexer_client.set_rss(
        "mock-indexer",
        vec![fixtures::release("abc", "The.Matrix.1999.1080p.BluRay")],
    );

    let sync = sync_with(&harness, vec![fixtures::indexer("mock-indexer")]);

    let background = {
        let sync = sync.clone();
        tokio::spawn(async move { sync.run().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let second = sync.run().await;
    assert_eq!(second.errors, vec!["Already running".to_string()]);
    assert_eq!(second.grabbed, 0);

    let first = background.await.unwrap();
    assert_eq!(first.grabbed, 1);
}

#[tokio::test]
async fn blacklisted_release_is_filtered_out() {
    let harness = harness();
    harness
        .library
        .add_movie("The Matrix", Some(1999), None)
        .unwrap();

    let release = fixtures::release("abc", "The.Matrix.1999.1080p.BluRay");
    harness
        .blacklist
        .add(Some("abc"), Some(&release.title), "import failed")
        .unwrap();
    harness.indexer_client.set_rss("mock-indexer", vec![release]);

    let sync = sync_with(&harness, vec![fixtures::indexer("mock-indexer")]);
    let result = sync.run().await;

    assert_eq!(result.releases_found, 1);
    assert_eq!(result.grabbed, 0);
}

#[tokio::test]
async fn failing_indexer_does_not_abort_cycle() {
    let harness = harness();
    harness
        .library
        .add_movie("The Matrix", Some(1999), None)
        .unwrap();

    harness.indexer_client.fail_indexer("broken");
    harness.indexer_client.set_rss(
        "working",
        vec![fixtures::release("abc", "The.Matrix.1999.1080p.BluRay")],
    );

    let sync = sync_with(
        &harness,
        vec![fixtures::indexer("broken"), fixtures::indexer("working")],
    );
    let result = sync.run().await;

    assert_eq!(result.indexers_checked, 2);
    assert_eq!(result.grabbed, 1);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("broken") || result.errors[0].contains("Indexer broken"));
}

#[tokio::test]
async fn one_release_satisfies_one_wanted_item_only() {
    let harness = harness();
    harness
        .library
        .add_movie("The Matrix", Some(1999), None)
        .unwrap();

    // Two copies of the same movie from two indexers; second grab must not
    // happen because the item leaves the wanted set.
    harness.indexer_client.set_rss(
        "a",
        vec![fixtures::release("guid-a", "The.Matrix.1999.1080p.BluRay")],
    );
    harness.indexer_client.set_rss(
        "b",
        vec![fixtures::release("guid-b", "The.Matrix.1999.720p.WEB")],
    );

    let sync = sync_with(&harness, vec![fixtures::indexer("a"), fixtures::indexer("b")]);
    let result = sync.run().await;

    assert_eq!(result.grabbed, 1);
    assert!(result.grabbed <= result.releases_found);
    assert_eq!(harness.download_client.added_jobs().len(), 1);
}

#[tokio::test]
async fn items_with_active_downloads_are_excluded() {
    let harness = harness();
    let movie = harness
        .library
        .add_movie("The Matrix", Some(1999), None)
        .unwrap();

    harness
        .downloads
        .create(magpie_core::NewDownload {
            external_id: Some("nzo_existing".to_string()),
            client_id: "sab".to_string(),
            indexer_id: None,
            indexer_name: None,
            title: "The.Matrix.1999.720p".to_string(),
            size_bytes: 0,
            download_url: "https://indexer.example/get/x".to_string(),
            guid: "x".to_string(),
            status: DownloadStatus::Downloading,
            output_path: None,
            target: DownloadTarget::Movie { movie_id: movie.id },
        })
        .unwrap();

    harness.indexer_client.set_rss(
        "mock-indexer",
        vec![fixtures::release("abc", "The.Matrix.1999.1080p.BluRay")],
    );

    let sync = sync_with(&harness, vec![fixtures::indexer("mock-indexer")]);
    let result = sync.run().await;

    // The only wanted item already had an active download, so the cycle had
    // nothing to look for.
    assert_eq!(result.indexers_checked, 0);
    assert_eq!(result.grabbed, 0);
}
