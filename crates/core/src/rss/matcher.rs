//! Release-to-wanted-item matching rules.

use crate::download::DownloadTarget;
use crate::library::{Movie, WantedAlbum, WantedBook, WantedEpisode};
use crate::title::{is_quality_token, is_year_token, normalize};

/// The wanted sets loaded at the start of a sync cycle. Items are removed as
/// they are grabbed so one cycle never grabs twice for the same item.
#[derive(Debug, Default)]
pub struct WantedSets {
    pub movies: Vec<Movie>,
    pub episodes: Vec<WantedEpisode>,
    pub albums: Vec<WantedAlbum>,
    pub books: Vec<WantedBook>,
}

impl WantedSets {
    pub fn total(&self) -> usize {
        self.movies.len() + self.episodes.len() + self.albums.len() + self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Drop the item a grab just satisfied.
    pub fn remove_target(&mut self, target: &DownloadTarget) {
        match *target {
            DownloadTarget::Movie { movie_id } => self.movies.retain(|m| m.id != movie_id),
            DownloadTarget::Episode { episode_id, .. } => {
                self.episodes.retain(|e| e.episode.id != episode_id)
            }
            DownloadTarget::Album { album_id } => {
                self.albums.retain(|a| a.album.id != album_id)
            }
            DownloadTarget::Book { book_id } => self.books.retain(|b| b.book.id != book_id),
        }
    }
}

/// Match a release title against the wanted sets in fixed order: movies,
/// episodes, albums, books. First match wins.
pub fn match_release(release_title: &str, wanted: &WantedSets) -> Option<DownloadTarget> {
    let norm = normalize(release_title);

    for movie in &wanted.movies {
        if movie_matches(&norm, movie) {
            return Some(DownloadTarget::Movie { movie_id: movie.id });
        }
    }
    for episode in &wanted.episodes {
        if episode_matches(&norm, episode) {
            return Some(DownloadTarget::Episode {
                tv_show_id: episode.episode.tv_show_id,
                episode_id: episode.episode.id,
            });
        }
    }
    for album in &wanted.albums {
        if contains_both(&norm, &album.artist_name, &album.album.title) {
            return Some(DownloadTarget::Album {
                album_id: album.album.id,
            });
        }
    }
    for book in &wanted.books {
        if contains_both(&norm, &book.author_name, &book.book.title) {
            return Some(DownloadTarget::Book {
                book_id: book.book.id,
            });
        }
    }

    None
}

/// Movie rule: the normalized release contains the wanted title, the wanted
/// year (when known) appears somewhere, and the text immediately after the
/// matched title is empty, a year, or a recognized quality token. Anything
/// else is a likely partial match ("The Matrix" vs "The Matrix Resurrections")
/// and is rejected.
fn movie_matches(norm_release: &str, movie: &Movie) -> bool {
    let norm_title = normalize(&movie.title);
    if norm_title.is_empty() {
        return false;
    }
    let Some(pos) = norm_release.find(&norm_title) else {
        return false;
    };

    if let Some(year) = movie.year {
        let year = year.to_string();
        if !norm_release.split_whitespace().any(|w| w == year) {
            return false;
        }
    }

    let after = norm_release[pos + norm_title.len()..].trim_start();
    match after.split_whitespace().next() {
        None => true,
        Some(word) => is_year_token(word) || is_quality_token(word),
    }
}

/// Episode rule: show title plus the literal zero-padded `sNNeMM` tag.
fn episode_matches(norm_release: &str, wanted: &WantedEpisode) -> bool {
    let show = normalize(&wanted.show_title);
    if show.is_empty() || !norm_release.contains(&show) {
        return false;
    }
    let tag = format!(
        "s{:02}e{:02}",
        wanted.episode.season, wanted.episode.episode
    );
    norm_release.contains(&tag)
}

fn contains_both(norm_release: &str, first: &str, second: &str) -> bool {
    let first = normalize(first);
    let second = normalize(second);
    !first.is_empty()
        && !second.is_empty()
        && norm_release.contains(&first)
        && norm_release.contains(&second)
}
