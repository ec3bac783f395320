//! SQLite-backed blacklist store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::store::StoreError;
use crate::title::normalize;

use super::store::{BlacklistEntry, BlacklistStore};

/// SQLite-backed blacklist store.
pub struct SqliteBlacklistStore {
    conn: Mutex<Connection>,
}

impl SqliteBlacklistStore {
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory blacklist store (useful for testing).
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
            CREATE TABLE IF NOT EXISTS blacklist (
                id INTEGER PRIMARY KEY,
                guid TEXT,
                normalized_title TEXT,
                reason TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_blacklist_guid ON blacklist(guid);
            CREATE INDEX IF NOT EXISTS idx_blacklist_title ON blacklist(normalized_title);
            "#,
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }
}

impl BlacklistStore for SqliteBlacklistStore {
    fn add(
        &self,
        guid: Option<&str>,
        title: Option<&str>,
        reason: &str,
    ) -> Result<BlacklistEntry, StoreError> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let normalized = title.map(normalize);
        conn.execute(
            "INSERT INTO blacklist (guid, normalized_title, reason, created_at) VALUES (?, ?, ?, ?)",
            params![guid, normalized, reason, now.to_rfc3339()],
        )?;
        Ok(BlacklistEntry {
            id: conn.last_insert_rowid(),
            guid: guid.map(|s| s.to_string()),
            normalized_title: normalized,
            reason: reason.to_string(),
            created_at: now,
        })
    }

    fn contains(&self, guid: &str, title: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock().unwrap();
        let normalized = normalize(title);
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM blacklist WHERE guid = ? OR normalized_title = ?",
            params![guid, normalized],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM blacklist WHERE created_at < ?",
            params![cutoff.to_rfc3339()],
        )?;
        Ok(deleted)
    }

    fn count(&self) -> Result<i64, StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM blacklist", [], |row| row.get(0))
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_contains_by_guid() {
        let store = SqliteBlacklistStore::in_memory().unwrap();
        store.add(Some("guid-1"), None, "import failed").unwrap();
        assert!(store.contains("guid-1", "anything").unwrap());
        assert!(!store.contains("guid-2", "anything").unwrap());
    }

    #[test]
    fn test_contains_by_normalized_title() {
        let store = SqliteBlacklistStore::in_memory().unwrap();
        store
            .add(None, Some("The.Matrix.1999.1080p"), "bad release")
            .unwrap();
        // Different separators, same normalized form.
        assert!(store.contains("other-guid", "The Matrix 1999 1080p").unwrap());
        assert!(store
            .contains("other-guid", "the_matrix-1999.1080p")
            .unwrap());
        assert!(!store.contains("other-guid", "The Matrix 1999").unwrap());
    }

    #[test]
    fn test_purge_older_than() {
        let store = SqliteBlacklistStore::in_memory().unwrap();
        store.add(Some("a"), None, "r").unwrap();
        store.add(Some("b"), None, "r").unwrap();
        assert_eq!(store.count().unwrap(), 2);

        // Nothing is older than an hour ago.
        let purged = store
            .purge_older_than(Utc::now() - Duration::hours(1))
            .unwrap();
        assert_eq!(purged, 0);

        // Everything is older than an hour from now.
        let purged = store
            .purge_older_than(Utc::now() + Duration::hours(1))
            .unwrap();
        assert_eq!(purged, 2);
        assert_eq!(store.count().unwrap(), 0);
    }
}
