//! Library storage trait.

use crate::store::StoreError;

use super::types::{
    Album, Artist, Author, Book, Episode, MediaFile, MediaFileOwner, MediaKind, Movie, RootFolder,
    Track, TvShow, WantedAlbum, WantedBook, WantedEpisode,
};

/// The persistence port for library entities.
///
/// Implementations are transactional per call. All wanted-set queries exclude
/// nothing download-related; callers cross-check against active downloads.
pub trait LibraryStore: Send + Sync {
    // Movies
    fn add_movie(
        &self,
        title: &str,
        year: Option<i32>,
        tmdb_id: Option<i64>,
    ) -> Result<Movie, StoreError>;
    fn get_movie(&self, id: i64) -> Result<Option<Movie>, StoreError>;
    /// Movies with `requested` and no file.
    fn wanted_movies(&self) -> Result<Vec<Movie>, StoreError>;
    fn set_movie_has_file(&self, id: i64, has_file: bool) -> Result<(), StoreError>;
    /// Clears `requested`; deletes the row when it has no file.
    fn unrequest_movie(&self, id: i64) -> Result<(), StoreError>;

    // TV
    fn add_tv_show(&self, title: &str, tvdb_id: Option<i64>) -> Result<TvShow, StoreError>;
    fn get_tv_show(&self, id: i64) -> Result<Option<TvShow>, StoreError>;
    /// Deleting a show cascades to its episodes.
    fn delete_tv_show(&self, id: i64) -> Result<(), StoreError>;
    fn add_episode(
        &self,
        tv_show_id: i64,
        season: i32,
        episode: i32,
        title: Option<&str>,
    ) -> Result<Episode, StoreError>;
    fn get_episode(&self, id: i64) -> Result<Option<Episode>, StoreError>;
    /// Requested episodes without a file, bounded to cap match cost.
    fn wanted_episodes(&self, limit: i64) -> Result<Vec<WantedEpisode>, StoreError>;
    fn set_episode_has_file(&self, id: i64, has_file: bool) -> Result<(), StoreError>;
    fn unrequest_episode(&self, id: i64) -> Result<(), StoreError>;

    // Music
    fn add_artist(&self, name: &str, musicbrainz_id: Option<&str>) -> Result<Artist, StoreError>;
    fn get_artist(&self, id: i64) -> Result<Option<Artist>, StoreError>;
    /// Deleting an artist cascades to albums and tracks.
    fn delete_artist(&self, id: i64) -> Result<(), StoreError>;
    fn add_album(&self, artist_id: i64, title: &str, year: Option<i32>)
        -> Result<Album, StoreError>;
    fn get_album(&self, id: i64) -> Result<Option<Album>, StoreError>;
    fn add_track(&self, album_id: i64, position: i32, title: &str) -> Result<Track, StoreError>;
    fn album_tracks(&self, album_id: i64) -> Result<Vec<Track>, StoreError>;
    /// Requested albums with no tracks yet or at least one unlinked track.
    fn wanted_albums(&self) -> Result<Vec<WantedAlbum>, StoreError>;
    fn link_track_file(&self, track_id: i64, media_file_id: i64) -> Result<(), StoreError>;
    /// True when the album has tracks and every track has a linked file.
    fn album_complete(&self, album_id: i64) -> Result<bool, StoreError>;
    fn unrequest_album(&self, id: i64) -> Result<(), StoreError>;

    // Books
    fn add_author(&self, name: &str) -> Result<Author, StoreError>;
    fn get_author(&self, id: i64) -> Result<Option<Author>, StoreError>;
    /// Deleting an author cascades to their books.
    fn delete_author(&self, id: i64) -> Result<(), StoreError>;
    fn add_book(
        &self,
        author_id: i64,
        title: &str,
        openlibrary_id: Option<&str>,
    ) -> Result<Book, StoreError>;
    fn get_book(&self, id: i64) -> Result<Option<Book>, StoreError>;
    fn wanted_books(&self) -> Result<Vec<WantedBook>, StoreError>;
    fn set_book_has_file(&self, id: i64, has_file: bool) -> Result<(), StoreError>;
    fn unrequest_book(&self, id: i64) -> Result<(), StoreError>;

    // Media files
    fn add_media_file(
        &self,
        path: &str,
        size_bytes: i64,
        owner: MediaFileOwner,
    ) -> Result<MediaFile, StoreError>;

    // Root folders
    fn add_root_folder(&self, path: &str, media_type: MediaKind) -> Result<RootFolder, StoreError>;
    fn root_folder(&self, media_type: MediaKind) -> Result<Option<RootFolder>, StoreError>;
    fn list_root_folders(&self) -> Result<Vec<RootFolder>, StoreError>;
}
