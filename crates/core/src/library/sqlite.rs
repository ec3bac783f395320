//! SQLite-backed library store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection};

use crate::store::StoreError;

use super::store::LibraryStore;
use super::types::{
    Album, Artist, Author, Book, Episode, MediaFile, MediaFileOwner, MediaKind, Movie, RootFolder,
    Track, TvShow, WantedAlbum, WantedBook, WantedEpisode,
};

/// SQLite-backed library store.
pub struct SqliteLibraryStore {
    conn: Mutex<Connection>,
}

impl SqliteLibraryStore {
    /// Open the library store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory library store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn =
            Connection::open_in_memory().map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS movies (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                year INTEGER,
                tmdb_id INTEGER,
                requested INTEGER NOT NULL DEFAULT 1,
                has_file INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS tv_shows (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                tvdb_id INTEGER
            );

            CREATE TABLE IF NOT EXISTS episodes (
                id INTEGER PRIMARY KEY,
                tv_show_id INTEGER NOT NULL REFERENCES tv_shows(id) ON DELETE CASCADE,
                season INTEGER NOT NULL,
                episode INTEGER NOT NULL,
                title TEXT,
                requested INTEGER NOT NULL DEFAULT 1,
                has_file INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_episodes_show ON episodes(tv_show_id);

            CREATE TABLE IF NOT EXISTS artists (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                musicbrainz_id TEXT
            );

            CREATE TABLE IF NOT EXISTS albums (
                id INTEGER PRIMARY KEY,
                artist_id INTEGER NOT NULL REFERENCES artists(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                year INTEGER,
                requested INTEGER NOT NULL DEFAULT 1
            );
            CREATE INDEX IF NOT EXISTS idx_albums_artist ON albums(artist_id);

            CREATE TABLE IF NOT EXISTS media_files (
                id INTEGER PRIMARY KEY,
                path TEXT NOT NULL,
                size_bytes INTEGER NOT NULL,
                added_at TEXT NOT NULL,
                movie_id INTEGER REFERENCES movies(id) ON DELETE CASCADE,
                episode_id INTEGER REFERENCES episodes(id) ON DELETE CASCADE,
                book_id INTEGER REFERENCES books(id) ON DELETE CASCADE,
                CHECK (
                    (movie_id IS NOT NULL) + (episode_id IS NOT NULL) + (book_id IS NOT NULL) <= 1
                )
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_media_files_movie
                ON media_files(movie_id) WHERE movie_id IS NOT NULL;
            CREATE UNIQUE INDEX IF NOT EXISTS idx_media_files_episode
                ON media_files(episode_id) WHERE episode_id IS NOT NULL;
            CREATE UNIQUE INDEX IF NOT EXISTS idx_media_files_book
                ON media_files(book_id) WHERE book_id IS NOT NULL;

            CREATE TABLE IF NOT EXISTS tracks (
                id INTEGER PRIMARY KEY,
                album_id INTEGER NOT NULL REFERENCES albums(id) ON DELETE CASCADE,
                position INTEGER NOT NULL,
                title TEXT NOT NULL,
                media_file_id INTEGER REFERENCES media_files(id)
            );
            CREATE INDEX IF NOT EXISTS idx_tracks_album ON tracks(album_id);

            CREATE TABLE IF NOT EXISTS authors (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS books (
                id INTEGER PRIMARY KEY,
                author_id INTEGER NOT NULL REFERENCES authors(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                openlibrary_id TEXT,
                requested INTEGER NOT NULL DEFAULT 1,
                has_file INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_books_author ON books(author_id);

            CREATE TABLE IF NOT EXISTS root_folders (
                id INTEGER PRIMARY KEY,
                path TEXT NOT NULL,
                media_type TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_root_folders_type ON root_folders(media_type);
            "#,
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn row_to_movie(row: &rusqlite::Row) -> rusqlite::Result<Movie> {
        Ok(Movie {
            id: row.get(0)?,
            title: row.get(1)?,
            year: row.get(2)?,
            tmdb_id: row.get(3)?,
            requested: row.get::<_, i64>(4)? != 0,
            has_file: row.get::<_, i64>(5)? != 0,
        })
    }

    fn row_to_episode(row: &rusqlite::Row) -> rusqlite::Result<Episode> {
        Ok(Episode {
            id: row.get(0)?,
            tv_show_id: row.get(1)?,
            season: row.get(2)?,
            episode: row.get(3)?,
            title: row.get(4)?,
            requested: row.get::<_, i64>(5)? != 0,
            has_file: row.get::<_, i64>(6)? != 0,
        })
    }

    fn row_to_album(row: &rusqlite::Row) -> rusqlite::Result<Album> {
        Ok(Album {
            id: row.get(0)?,
            artist_id: row.get(1)?,
            title: row.get(2)?,
            year: row.get(3)?,
            requested: row.get::<_, i64>(4)? != 0,
        })
    }

    fn row_to_book(row: &rusqlite::Row) -> rusqlite::Result<Book> {
        Ok(Book {
            id: row.get(0)?,
            author_id: row.get(1)?,
            title: row.get(2)?,
            openlibrary_id: row.get(3)?,
            requested: row.get::<_, i64>(4)? != 0,
            has_file: row.get::<_, i64>(5)? != 0,
        })
    }

    fn row_to_track(row: &rusqlite::Row) -> rusqlite::Result<Track> {
        Ok(Track {
            id: row.get(0)?,
            album_id: row.get(1)?,
            position: row.get(2)?,
            title: row.get(3)?,
            media_file_id: row.get(4)?,
        })
    }
}

impl LibraryStore for SqliteLibraryStore {
    fn add_movie(
        &self,
        title: &str,
        year: Option<i32>,
        tmdb_id: Option<i64>,
    ) -> Result<Movie, StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO movies (title, year, tmdb_id) VALUES (?, ?, ?)",
            params![title, year, tmdb_id],
        )?;
        Ok(Movie {
            id: conn.last_insert_rowid(),
            title: title.to_string(),
            year,
            tmdb_id,
            requested: true,
            has_file: false,
        })
    }

    fn get_movie(&self, id: i64) -> Result<Option<Movie>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let result = conn.query_row(
            "SELECT id, title, year, tmdb_id, requested, has_file FROM movies WHERE id = ?",
            params![id],
            Self::row_to_movie,
        );
        match result {
            Ok(movie) => Ok(Some(movie)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn wanted_movies(&self) -> Result<Vec<Movie>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, title, year, tmdb_id, requested, has_file FROM movies
             WHERE requested = 1 AND has_file = 0 ORDER BY id",
        )?;
        let rows = stmt.query_map([], Self::row_to_movie)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    fn set_movie_has_file(&self, id: i64, has_file: bool) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE movies SET has_file = ? WHERE id = ?",
            params![has_file as i64, id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("movie {}", id)));
        }
        Ok(())
    }

    fn unrequest_movie(&self, id: i64) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM movies WHERE id = ? AND has_file = 0",
            params![id],
        )?;
        if deleted == 0 {
            conn.execute("UPDATE movies SET requested = 0 WHERE id = ?", params![id])?;
        }
        Ok(())
    }

    fn add_tv_show(&self, title: &str, tvdb_id: Option<i64>) -> Result<TvShow, StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO tv_shows (title, tvdb_id) VALUES (?, ?)",
            params![title, tvdb_id],
        )?;
        Ok(TvShow {
            id: conn.last_insert_rowid(),
            title: title.to_string(),
            tvdb_id,
        })
    }

    fn get_tv_show(&self, id: i64) -> Result<Option<TvShow>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let result = conn.query_row(
            "SELECT id, title, tvdb_id FROM tv_shows WHERE id = ?",
            params![id],
            |row| {
                Ok(TvShow {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    tvdb_id: row.get(2)?,
                })
            },
        );
        match result {
            Ok(show) => Ok(Some(show)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete_tv_show(&self, id: i64) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM tv_shows WHERE id = ?", params![id])?;
        if deleted == 0 {
            return Err(StoreError::NotFound(format!("tv show {}", id)));
        }
        Ok(())
    }

    fn add_episode(
        &self,
        tv_show_id: i64,
        season: i32,
        episode: i32,
        title: Option<&str>,
    ) -> Result<Episode, StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO episodes (tv_show_id, season, episode, title) VALUES (?, ?, ?, ?)",
            params![tv_show_id, season, episode, title],
        )?;
        Ok(Episode {
            id: conn.last_insert_rowid(),
            tv_show_id,
            season,
            episode,
            title: title.map(|t| t.to_string()),
            requested: true,
            has_file: false,
        })
    }

    fn get_episode(&self, id: i64) -> Result<Option<Episode>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let result = conn.query_row(
            "SELECT id, tv_show_id, season, episode, title, requested, has_file
             FROM episodes WHERE id = ?",
            params![id],
            Self::row_to_episode,
        );
        match result {
            Ok(ep) => Ok(Some(ep)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn wanted_episodes(&self, limit: i64) -> Result<Vec<WantedEpisode>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT e.id, e.tv_show_id, e.season, e.episode, e.title, e.requested, e.has_file,
                    s.title
             FROM episodes e JOIN tv_shows s ON s.id = e.tv_show_id
             WHERE e.requested = 1 AND e.has_file = 0
             ORDER BY e.id LIMIT ?",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok(WantedEpisode {
                episode: Self::row_to_episode(row)?,
                show_title: row.get(7)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    fn set_episode_has_file(&self, id: i64, has_file: bool) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE episodes SET has_file = ? WHERE id = ?",
            params![has_file as i64, id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("episode {}", id)));
        }
        Ok(())
    }

    fn unrequest_episode(&self, id: i64) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM episodes WHERE id = ? AND has_file = 0",
            params![id],
        )?;
        if deleted == 0 {
            conn.execute("UPDATE episodes SET requested = 0 WHERE id = ?", params![id])?;
        }
        Ok(())
    }

    fn add_artist(&self, name: &str, musicbrainz_id: Option<&str>) -> Result<Artist, StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO artists (name, musicbrainz_id) VALUES (?, ?)",
            params![name, musicbrainz_id],
        )?;
        Ok(Artist {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            musicbrainz_id: musicbrainz_id.map(|s| s.to_string()),
        })
    }

    fn get_artist(&self, id: i64) -> Result<Option<Artist>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let result = conn.query_row(
            "SELECT id, name, musicbrainz_id FROM artists WHERE id = ?",
            params![id],
            |row| {
                Ok(Artist {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    musicbrainz_id: row.get(2)?,
                })
            },
        );
        match result {
            Ok(artist) => Ok(Some(artist)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete_artist(&self, id: i64) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM artists WHERE id = ?", params![id])?;
        if deleted == 0 {
            return Err(StoreError::NotFound(format!("artist {}", id)));
        }
        Ok(())
    }

    fn add_album(
        &self,
        artist_id: i64,
        title: &str,
        year: Option<i32>,
    ) -> Result<Album, StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO albums (artist_id, title, year) VALUES (?, ?, ?)",
            params![artist_id, title, year],
        )?;
        Ok(Album {
            id: conn.last_insert_rowid(),
            artist_id,
            title: title.to_string(),
            year,
            requested: true,
        })
    }

    fn get_album(&self, id: i64) -> Result<Option<Album>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let result = conn.query_row(
            "SELECT id, artist_id, title, year, requested FROM albums WHERE id = ?",
            params![id],
            Self::row_to_album,
        );
        match result {
            Ok(album) => Ok(Some(album)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn add_track(&self, album_id: i64, position: i32, title: &str) -> Result<Track, StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO tracks (album_id, position, title) VALUES (?, ?, ?)",
            params![album_id, position, title],
        )?;
        Ok(Track {
            id: conn.last_insert_rowid(),
            album_id,
            position,
            title: title.to_string(),
            media_file_id: None,
        })
    }

    fn album_tracks(&self, album_id: i64) -> Result<Vec<Track>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, album_id, position, title, media_file_id FROM tracks
             WHERE album_id = ? ORDER BY position",
        )?;
        let rows = stmt.query_map(params![album_id], Self::row_to_track)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    fn wanted_albums(&self) -> Result<Vec<WantedAlbum>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT a.id, a.artist_id, a.title, a.year, a.requested, ar.name
             FROM albums a JOIN artists ar ON ar.id = a.artist_id
             WHERE a.requested = 1 AND (
                 NOT EXISTS (SELECT 1 FROM tracks t WHERE t.album_id = a.id)
                 OR EXISTS (
                     SELECT 1 FROM tracks t
                     WHERE t.album_id = a.id AND t.media_file_id IS NULL
                 )
             )
             ORDER BY a.id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(WantedAlbum {
                album: Self::row_to_album(row)?,
                artist_name: row.get(5)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    fn link_track_file(&self, track_id: i64, media_file_id: i64) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE tracks SET media_file_id = ? WHERE id = ?",
            params![media_file_id, track_id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("track {}", track_id)));
        }
        Ok(())
    }

    fn album_complete(&self, album_id: i64) -> Result<bool, StoreError> {
        let conn = self.conn.lock().unwrap();
        let (total, missing): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), SUM(CASE WHEN media_file_id IS NULL THEN 1 ELSE 0 END)
             FROM tracks WHERE album_id = ?",
            params![album_id],
            |row| Ok((row.get(0)?, row.get::<_, Option<i64>>(1)?.unwrap_or(0))),
        )?;
        Ok(total > 0 && missing == 0)
    }

    fn unrequest_album(&self, id: i64) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM albums WHERE id = ? AND NOT EXISTS (
                 SELECT 1 FROM tracks t
                 WHERE t.album_id = albums.id AND t.media_file_id IS NOT NULL
             )",
            params![id],
        )?;
        if deleted == 0 {
            conn.execute("UPDATE albums SET requested = 0 WHERE id = ?", params![id])?;
        }
        Ok(())
    }

    fn add_author(&self, name: &str) -> Result<Author, StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute("INSERT INTO authors (name) VALUES (?)", params![name])?;
        Ok(Author {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    fn get_author(&self, id: i64) -> Result<Option<Author>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let result = conn.query_row(
            "SELECT id, name FROM authors WHERE id = ?",
            params![id],
            |row| {
                Ok(Author {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        );
        match result {
            Ok(author) => Ok(Some(author)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete_author(&self, id: i64) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM authors WHERE id = ?", params![id])?;
        if deleted == 0 {
            return Err(StoreError::NotFound(format!("author {}", id)));
        }
        Ok(())
    }

    fn add_book(
        &self,
        author_id: i64,
        title: &str,
        openlibrary_id: Option<&str>,
    ) -> Result<Book, StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO books (author_id, title, openlibrary_id) VALUES (?, ?, ?)",
            params![author_id, title, openlibrary_id],
        )?;
        Ok(Book {
            id: conn.last_insert_rowid(),
            author_id,
            title: title.to_string(),
            openlibrary_id: openlibrary_id.map(|s| s.to_string()),
            requested: true,
            has_file: false,
        })
    }

    fn get_book(&self, id: i64) -> Result<Option<Book>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let result = conn.query_row(
            "SELECT id, author_id, title, openlibrary_id, requested, has_file
             FROM books WHERE id = ?",
            params![id],
            Self::row_to_book,
        );
        match result {
            Ok(book) => Ok(Some(book)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn wanted_books(&self) -> Result<Vec<WantedBook>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT b.id, b.author_id, b.title, b.openlibrary_id, b.requested, b.has_file,
                    au.name
             FROM books b JOIN authors au ON au.id = b.author_id
             WHERE b.requested = 1 AND b.has_file = 0
             ORDER BY b.id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(WantedBook {
                book: Self::row_to_book(row)?,
                author_name: row.get(6)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    fn set_book_has_file(&self, id: i64, has_file: bool) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE books SET has_file = ? WHERE id = ?",
            params![has_file as i64, id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("book {}", id)));
        }
        Ok(())
    }

    fn unrequest_book(&self, id: i64) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM books WHERE id = ? AND has_file = 0",
            params![id],
        )?;
        if deleted == 0 {
            conn.execute("UPDATE books SET requested = 0 WHERE id = ?", params![id])?;
        }
        Ok(())
    }

    fn add_media_file(
        &self,
        path: &str,
        size_bytes: i64,
        owner: MediaFileOwner,
    ) -> Result<MediaFile, StoreError> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let (movie_id, episode_id, book_id) = match owner {
            MediaFileOwner::Movie(id) => (Some(id), None, None),
            MediaFileOwner::Episode(id) => (None, Some(id), None),
            MediaFileOwner::Book(id) => (None, None, Some(id)),
            MediaFileOwner::Track => (None, None, None),
        };
        conn.execute(
            "INSERT INTO media_files (path, size_bytes, added_at, movie_id, episode_id, book_id)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![path, size_bytes, now.to_rfc3339(), movie_id, episode_id, book_id],
        )?;
        Ok(MediaFile {
            id: conn.last_insert_rowid(),
            path: path.to_string(),
            size_bytes,
            added_at: now,
            owner,
        })
    }

    fn add_root_folder(&self, path: &str, media_type: MediaKind) -> Result<RootFolder, StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO root_folders (path, media_type) VALUES (?, ?)",
            params![path, media_type.as_str()],
        )?;
        Ok(RootFolder {
            id: conn.last_insert_rowid(),
            path: path.to_string(),
            media_type,
        })
    }

    fn root_folder(&self, media_type: MediaKind) -> Result<Option<RootFolder>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let result = conn.query_row(
            "SELECT id, path, media_type FROM root_folders WHERE media_type = ? ORDER BY id LIMIT 1",
            params![media_type.as_str()],
            |row| {
                Ok(RootFolder {
                    id: row.get(0)?,
                    path: row.get(1)?,
                    media_type,
                })
            },
        );
        match result {
            Ok(folder) => Ok(Some(folder)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list_root_folders(&self) -> Result<Vec<RootFolder>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT id, path, media_type FROM root_folders ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            let media_type: String = row.get(2)?;
            Ok(RootFolder {
                id: row.get(0)?,
                path: row.get(1)?,
                media_type: MediaKind::from_str(&media_type).unwrap_or(MediaKind::Movie),
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteLibraryStore {
        SqliteLibraryStore::in_memory().unwrap()
    }

    #[test]
    fn test_wanted_movies_excludes_filed_and_unrequested() {
        let store = store();
        let wanted = store.add_movie("The Matrix", Some(1999), None).unwrap();
        let filed = store.add_movie("Fight Club", Some(1999), None).unwrap();
        store.set_movie_has_file(filed.id, true).unwrap();
        let unrequested = store.add_movie("Old Stuff", None, None).unwrap();
        store
            .add_media_file("/media/old.mkv", 1, MediaFileOwner::Movie(unrequested.id))
            .unwrap();
        store.set_movie_has_file(unrequested.id, true).unwrap();
        store.unrequest_movie(unrequested.id).unwrap();

        let result = store.wanted_movies().unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, wanted.id);
    }

    #[test]
    fn test_unrequest_fileless_movie_deletes() {
        let store = store();
        let movie = store.add_movie("Ephemeral", None, None).unwrap();
        store.unrequest_movie(movie.id).unwrap();
        assert!(store.get_movie(movie.id).unwrap().is_none());
    }

    #[test]
    fn test_delete_tv_show_cascades_to_episodes() {
        let store = store();
        let show = store.add_tv_show("Breaking Bad", None).unwrap();
        let ep = store.add_episode(show.id, 5, 7, None).unwrap();
        store.delete_tv_show(show.id).unwrap();
        assert!(store.get_episode(ep.id).unwrap().is_none());
    }

    #[test]
    fn test_wanted_episodes_joins_show_title_and_limits() {
        let store = store();
        let show = store.add_tv_show("Breaking Bad", None).unwrap();
        for e in 1..=5 {
            store.add_episode(show.id, 5, e, None).unwrap();
        }
        let wanted = store.wanted_episodes(3).unwrap();
        assert_eq!(wanted.len(), 3);
        assert_eq!(wanted[0].show_title, "Breaking Bad");
    }

    #[test]
    fn test_album_completeness_from_track_files() {
        let store = store();
        let artist = store.add_artist("Pink Floyd", None).unwrap();
        let album = store.add_album(artist.id, "The Wall", Some(1979)).unwrap();
        assert!(!store.album_complete(album.id).unwrap());

        let t1 = store.add_track(album.id, 1, "In the Flesh?").unwrap();
        let t2 = store.add_track(album.id, 2, "The Thin Ice").unwrap();
        assert!(!store.album_complete(album.id).unwrap());

        let f1 = store
            .add_media_file("/music/01.flac", 1, MediaFileOwner::Track)
            .unwrap();
        store.link_track_file(t1.id, f1.id).unwrap();
        assert!(!store.album_complete(album.id).unwrap());

        let f2 = store
            .add_media_file("/music/02.flac", 1, MediaFileOwner::Track)
            .unwrap();
        store.link_track_file(t2.id, f2.id).unwrap();
        assert!(store.album_complete(album.id).unwrap());

        // Fully linked album is no longer wanted.
        assert!(store.wanted_albums().unwrap().is_empty());
    }

    #[test]
    fn test_wanted_albums_includes_trackless_albums() {
        let store = store();
        let artist = store.add_artist("Boards of Canada", None).unwrap();
        store
            .add_album(artist.id, "Music Has the Right to Children", Some(1998))
            .unwrap();
        let wanted = store.wanted_albums().unwrap();
        assert_eq!(wanted.len(), 1);
        assert_eq!(wanted[0].artist_name, "Boards of Canada");
    }

    #[test]
    fn test_duplicate_movie_file_rejected() {
        let store = store();
        let movie = store.add_movie("Fight Club", Some(1999), None).unwrap();
        store
            .add_media_file("/media/a.mkv", 1, MediaFileOwner::Movie(movie.id))
            .unwrap();
        let dup = store.add_media_file("/media/b.mkv", 1, MediaFileOwner::Movie(movie.id));
        assert!(dup.is_err());
    }

    #[test]
    fn test_root_folder_lookup_by_kind() {
        let store = store();
        store.add_root_folder("/media/movies", MediaKind::Movie).unwrap();
        store.add_root_folder("/media/music", MediaKind::Music).unwrap();
        let folder = store.root_folder(MediaKind::Music).unwrap().unwrap();
        assert_eq!(folder.path, "/media/music");
        assert!(store.root_folder(MediaKind::Book).unwrap().is_none());
        assert_eq!(store.list_root_folders().unwrap().len(), 2);
    }

    #[test]
    fn test_wanted_books_joins_author() {
        let store = store();
        let author = store.add_author("Frank Herbert").unwrap();
        let book = store.add_book(author.id, "Dune", None).unwrap();
        let wanted = store.wanted_books().unwrap();
        assert_eq!(wanted.len(), 1);
        assert_eq!(wanted[0].author_name, "Frank Herbert");

        store.set_book_has_file(book.id, true).unwrap();
        assert!(store.wanted_books().unwrap().is_empty());
    }

    #[test]
    fn test_delete_author_cascades_to_books() {
        let store = store();
        let author = store.add_author("Iain M. Banks").unwrap();
        let book = store.add_book(author.id, "Excession", None).unwrap();
        store.delete_author(author.id).unwrap();
        assert!(store.get_book(book.id).unwrap().is_none());
    }
}
