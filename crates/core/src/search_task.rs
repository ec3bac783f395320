//! Periodic search for wanted items.
//!
//! Where RSS sync matches whatever the indexers happened to publish, this
//! task actively queries them per wanted item. Same wanted sets, same
//! blacklist filter, same matcher, same grab path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::blacklist::BlacklistFilter;
use crate::config::{IndexerConfig, RssConfig, SearchConfig};
use crate::download::{DownloadManager, DownloadStore, GrabError, GrabRequest};
use crate::indexer::{IndexerClient, SearchOptions};
use crate::library::{LibraryStore, MediaKind};
use crate::rss::{match_release, WantedSets};
use crate::store::StoreError;

/// Accumulated outcome of one wanted-items search cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchTaskResult {
    pub items_searched: usize,
    pub releases_found: usize,
    pub grabbed: usize,
    pub errors: Vec<String>,
}

/// One wanted item, with its search query and the singleton wanted set the
/// matcher runs against.
struct PendingSearch {
    query: String,
    kind: MediaKind,
    wanted: WantedSets,
}

/// Actively searches indexers for wanted items on a slow cadence.
pub struct SearchTask {
    indexers: Vec<IndexerConfig>,
    client: Arc<dyn IndexerClient>,
    library: Arc<dyn LibraryStore>,
    downloads: Arc<dyn DownloadStore>,
    blacklist: BlacklistFilter,
    manager: Arc<DownloadManager>,
    rss_config: RssConfig,
    config: SearchConfig,
    running: AtomicBool,
}

impl SearchTask {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        indexers: Vec<IndexerConfig>,
        client: Arc<dyn IndexerClient>,
        library: Arc<dyn LibraryStore>,
        downloads: Arc<dyn DownloadStore>,
        blacklist: BlacklistFilter,
        manager: Arc<DownloadManager>,
        rss_config: RssConfig,
        config: SearchConfig,
    ) -> Self {
        Self {
            indexers,
            client,
            library,
            downloads,
            blacklist,
            manager,
            rss_config,
            config,
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub async fn run(&self) -> SearchTaskResult {
        if self.running.swap(true, Ordering::SeqCst) {
            return SearchTaskResult {
                errors: vec!["Already running".to_string()],
                ..Default::default()
            };
        }
        let result = self.cycle().await;
        self.running.store(false, Ordering::SeqCst);
        result
    }

    fn pending_searches(&self) -> Result<Vec<PendingSearch>, StoreError> {
        let mut wanted = WantedSets {
            movies: self.library.wanted_movies()?,
            episodes: self.library.wanted_episodes(self.rss_config.episode_limit)?,
            albums: self.library.wanted_albums()?,
            books: self.library.wanted_books()?,
        };
        for download in self.downloads.list_non_terminal()? {
            wanted.remove_target(&download.target);
        }

        let mut pending = Vec::new();
        for movie in wanted.movies {
            let query = match movie.year {
                Some(year) => format!("{} {}", movie.title, year),
                None => movie.title.clone(),
            };
            pending.push(PendingSearch {
                query,
                kind: MediaKind::Movie,
                wanted: WantedSets {
                    movies: vec![movie],
                    ..Default::default()
                },
            });
        }
        for episode in wanted.episodes {
            pending.push(PendingSearch {
                query: format!(
                    "{} S{:02}E{:02}",
                    episode.show_title, episode.episode.season, episode.episode.episode
                ),
                kind: MediaKind::Tv,
                wanted: WantedSets {
                    episodes: vec![episode],
                    ..Default::default()
                },
            });
        }
        for album in wanted.albums {
            pending.push(PendingSearch {
                query: format!("{} {}", album.artist_name, album.album.title),
                kind: MediaKind::Music,
                wanted: WantedSets {
                    albums: vec![album],
                    ..Default::default()
                },
            });
        }
        for book in wanted.books {
            pending.push(PendingSearch {
                query: format!("{} {}", book.author_name, book.book.title),
                kind: MediaKind::Book,
                wanted: WantedSets {
                    books: vec![book],
                    ..Default::default()
                },
            });
        }

        pending.truncate(self.config.items_per_cycle);
        Ok(pending)
    }

    async fn cycle(&self) -> SearchTaskResult {
        let mut result = SearchTaskResult::default();

        let mut enabled: Vec<&IndexerConfig> =
            self.indexers.iter().filter(|i| i.enabled).collect();
        enabled.sort_by_key(|i| i.priority);
        if enabled.is_empty() {
            debug!("Wanted search: no enabled indexers");
            return result;
        }

        let pending = match self.pending_searches() {
            Ok(pending) => pending,
            Err(e) => {
                result.errors.push(e.to_string());
                return result;
            }
        };
        if pending.is_empty() {
            debug!("Wanted search: nothing wanted");
            return result;
        }
        info!(items = pending.len(), "Wanted search started");

        'items: for item in &pending {
            result.items_searched += 1;
            let options = SearchOptions::new(
                item.kind.default_categories().to_vec(),
                self.rss_config.limit,
            );

            for indexer in &enabled {
                let releases = match self.client.search(indexer, &item.query, &options).await {
                    Ok(releases) => releases,
                    Err(e) => {
                        warn!(indexer = %indexer.id, query = %item.query, "Search failed: {}", e);
                        result.errors.push(format!("{}: {}", indexer.name, e));
                        continue;
                    }
                };
                result.releases_found += releases.len();

                let releases = self.blacklist.filter(releases);
                for release in releases {
                    let Some(target) = match_release(&release.title, &item.wanted) else {
                        continue;
                    };
                    match self.manager.grab(GrabRequest { release, target }).await {
                        Ok(_) => {
                            result.grabbed += 1;
                            if self.rss_config.grab_delay_ms > 0 {
                                tokio::time::sleep(Duration::from_millis(
                                    self.rss_config.grab_delay_ms,
                                ))
                                .await;
                            }
                            continue 'items;
                        }
                        Err(GrabError::State(_)) | Err(GrabError::Blacklisted(_)) => {
                            continue 'items;
                        }
                        Err(e) => {
                            result.errors.push(format!("{}: {}", item.query, e));
                        }
                    }
                }
            }
        }

        info!(
            items = result.items_searched,
            grabbed = result.grabbed,
            errors = result.errors.len(),
            "Wanted search finished"
        );
        result
    }
}
