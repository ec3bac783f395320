//! SQLite-backed download store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::store::StoreError;

use super::store::{DownloadFilter, DownloadStore, NewDownload};
use super::types::{Download, DownloadStatus, DownloadTarget};

/// SQLite-backed download store.
pub struct SqliteDownloadStore {
    conn: Mutex<Connection>,
}

impl SqliteDownloadStore {
    /// Open the download store, creating tables if needed.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory download store (useful for testing).
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
            CREATE TABLE IF NOT EXISTS downloads (
                id INTEGER PRIMARY KEY,
                external_id TEXT,
                client_id TEXT NOT NULL,
                indexer_id TEXT,
                indexer_name TEXT,
                title TEXT NOT NULL,
                size_bytes INTEGER NOT NULL DEFAULT 0,
                download_url TEXT NOT NULL,
                guid TEXT NOT NULL,
                output_path TEXT,
                status TEXT NOT NULL,
                progress REAL NOT NULL DEFAULT 0,
                started_at TEXT NOT NULL,
                completed_at TEXT,
                error_message TEXT,
                movie_id INTEGER,
                tv_show_id INTEGER,
                episode_id INTEGER,
                album_id INTEGER,
                book_id INTEGER,
                CHECK (
                    (movie_id IS NOT NULL) + (episode_id IS NOT NULL)
                    + (album_id IS NOT NULL) + (book_id IS NOT NULL) = 1
                )
            );

            CREATE INDEX IF NOT EXISTS idx_downloads_status ON downloads(status);
            CREATE INDEX IF NOT EXISTS idx_downloads_external
                ON downloads(client_id, external_id);
            "#,
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    const COLUMNS: &'static str = "id, external_id, client_id, indexer_id, indexer_name, title, \
         size_bytes, download_url, guid, output_path, status, progress, started_at, \
         completed_at, error_message, movie_id, tv_show_id, episode_id, album_id, book_id";

    fn row_to_download(row: &rusqlite::Row) -> rusqlite::Result<Download> {
        let status_str: String = row.get(10)?;
        let started_at_str: String = row.get(12)?;
        let completed_at_str: Option<String> = row.get(13)?;

        let movie_id: Option<i64> = row.get(15)?;
        let tv_show_id: Option<i64> = row.get(16)?;
        let episode_id: Option<i64> = row.get(17)?;
        let album_id: Option<i64> = row.get(18)?;
        let book_id: Option<i64> = row.get(19)?;

        let target = if let Some(movie_id) = movie_id {
            DownloadTarget::Movie { movie_id }
        } else if let (Some(tv_show_id), Some(episode_id)) = (tv_show_id, episode_id) {
            DownloadTarget::Episode {
                tv_show_id,
                episode_id,
            }
        } else if let Some(album_id) = album_id {
            DownloadTarget::Album { album_id }
        } else if let Some(book_id) = book_id {
            DownloadTarget::Book { book_id }
        } else {
            return Err(rusqlite::Error::InvalidColumnType(
                15,
                "download row has no target".to_string(),
                rusqlite::types::Type::Null,
            ));
        };

        Ok(Download {
            id: row.get(0)?,
            external_id: row.get(1)?,
            client_id: row.get(2)?,
            indexer_id: row.get(3)?,
            indexer_name: row.get(4)?,
            title: row.get(5)?,
            size_bytes: row.get(6)?,
            download_url: row.get(7)?,
            guid: row.get(8)?,
            output_path: row.get(9)?,
            status: DownloadStatus::from_str(&status_str).unwrap_or(DownloadStatus::Failed),
            progress: row.get(11)?,
            started_at: parse_timestamp(&started_at_str),
            completed_at: completed_at_str.as_deref().map(parse_timestamp),
            error_message: row.get(14)?,
            target,
        })
    }

    fn target_columns(
        target: &DownloadTarget,
    ) -> (Option<i64>, Option<i64>, Option<i64>, Option<i64>, Option<i64>) {
        match *target {
            DownloadTarget::Movie { movie_id } => (Some(movie_id), None, None, None, None),
            DownloadTarget::Episode {
                tv_show_id,
                episode_id,
            } => (None, Some(tv_show_id), Some(episode_id), None, None),
            DownloadTarget::Album { album_id } => (None, None, None, Some(album_id), None),
            DownloadTarget::Book { book_id } => (None, None, None, None, Some(book_id)),
        }
    }
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

impl DownloadStore for SqliteDownloadStore {
    fn create(&self, new: NewDownload) -> Result<Download, StoreError> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let (movie_id, tv_show_id, episode_id, album_id, book_id) =
            Self::target_columns(&new.target);

        conn.execute(
            "INSERT INTO downloads (external_id, client_id, indexer_id, indexer_name, title, \
             size_bytes, download_url, guid, output_path, status, progress, started_at, \
             movie_id, tv_show_id, episode_id, album_id, book_id) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?, ?, ?, ?)",
            params![
                new.external_id,
                new.client_id,
                new.indexer_id,
                new.indexer_name,
                new.title,
                new.size_bytes,
                new.download_url,
                new.guid,
                new.output_path,
                new.status.as_str(),
                now.to_rfc3339(),
                movie_id,
                tv_show_id,
                episode_id,
                album_id,
                book_id,
            ],
        )?;

        Ok(Download {
            id: conn.last_insert_rowid(),
            external_id: new.external_id,
            client_id: new.client_id,
            indexer_id: new.indexer_id,
            indexer_name: new.indexer_name,
            title: new.title,
            size_bytes: new.size_bytes,
            download_url: new.download_url,
            guid: new.guid,
            output_path: new.output_path,
            status: new.status,
            progress: 0.0,
            started_at: parse_timestamp(&now.to_rfc3339()),
            completed_at: None,
            error_message: None,
            target: new.target,
        })
    }

    fn get(&self, id: i64) -> Result<Option<Download>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let sql = format!("SELECT {} FROM downloads WHERE id = ?", Self::COLUMNS);
        let result = conn.query_row(&sql, params![id], Self::row_to_download);
        match result {
            Ok(download) => Ok(Some(download)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn get_by_external_id(
        &self,
        client_id: &str,
        external_id: &str,
    ) -> Result<Option<Download>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {} FROM downloads WHERE client_id = ? AND external_id = ? ORDER BY id DESC LIMIT 1",
            Self::COLUMNS
        );
        let result = conn.query_row(&sql, params![client_id, external_id], Self::row_to_download);
        match result {
            Ok(download) => Ok(Some(download)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self, filter: &DownloadFilter) -> Result<Vec<Download>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut sql = format!("SELECT {} FROM downloads", Self::COLUMNS);
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(status) = filter.status {
            sql.push_str(" WHERE status = ?");
            params_vec.push(Box::new(status.as_str().to_string()));
        }
        sql.push_str(" ORDER BY id DESC");
        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            params_vec.push(Box::new(limit));
        }

        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();
        let rows = stmt.query_map(param_refs.as_slice(), Self::row_to_download)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    fn list_non_terminal(&self) -> Result<Vec<Download>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {} FROM downloads WHERE status NOT IN ('completed', 'failed') ORDER BY id",
            Self::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], Self::row_to_download)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    fn has_active_for_target(&self, target: &DownloadTarget) -> Result<bool, StoreError> {
        let conn = self.conn.lock().unwrap();
        let (movie_id, tv_show_id, episode_id, album_id, book_id) = Self::target_columns(target);
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM downloads
             WHERE status NOT IN ('completed', 'failed')
               AND movie_id IS ? AND tv_show_id IS ? AND episode_id IS ?
               AND album_id IS ? AND book_id IS ?",
            params![movie_id, tv_show_id, episode_id, album_id, book_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn update_progress(
        &self,
        id: i64,
        status: DownloadStatus,
        progress: f64,
        output_path: Option<&str>,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE downloads
             SET status = ?, progress = ?, output_path = COALESCE(?, output_path)
             WHERE id = ?",
            params![status.as_str(), progress.clamp(0.0, 100.0), output_path, id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("download {}", id)));
        }
        Ok(())
    }

    fn set_external_id(&self, id: i64, external_id: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE downloads SET external_id = ? WHERE id = ?",
            params![external_id, id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("download {}", id)));
        }
        Ok(())
    }

    fn mark_importing(
        &self,
        id: i64,
        output_path: &str,
        completed_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE downloads
             SET status = 'importing', output_path = ?, completed_at = ?, progress = 100
             WHERE id = ?",
            params![output_path, completed_at.to_rfc3339(), id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("download {}", id)));
        }
        Ok(())
    }

    fn mark_completed(&self, id: i64) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE downloads
             SET status = 'completed', progress = 100, error_message = NULL,
                 completed_at = COALESCE(completed_at, ?)
             WHERE id = ?",
            params![Utc::now().to_rfc3339(), id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("download {}", id)));
        }
        Ok(())
    }

    fn mark_failed(&self, id: i64, error: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE downloads SET status = 'failed', error_message = ? WHERE id = ?",
            params![error, id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("download {}", id)));
        }
        Ok(())
    }
}
