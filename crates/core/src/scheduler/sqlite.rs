//! SQLite-backed task store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection};

use crate::store::StoreError;

use super::store::TaskStore;
use super::types::{ScheduledTask, TaskType};

/// SQLite-backed task store.
pub struct SqliteTaskStore {
    conn: Mutex<Connection>,
}

impl SqliteTaskStore {
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory task store (useful for testing).
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
            CREATE TABLE IF NOT EXISTS scheduled_tasks (
                task_type TEXT PRIMARY KEY,
                interval_minutes INTEGER NOT NULL,
                enabled INTEGER NOT NULL DEFAULT 1,
                next_run_at TEXT,
                last_run_at TEXT,
                last_duration_ms INTEGER
            );
            "#,
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    fn row_to_task(row: &rusqlite::Row) -> rusqlite::Result<ScheduledTask> {
        let task_type: String = row.get(0)?;
        let next_run_at: Option<String> = row.get(3)?;
        let last_run_at: Option<String> = row.get(4)?;
        Ok(ScheduledTask {
            task_type: TaskType::from_str(&task_type).unwrap_or(TaskType::RssSync),
            interval_minutes: row.get(1)?,
            enabled: row.get::<_, i64>(2)? != 0,
            next_run_at: next_run_at.as_deref().and_then(parse_timestamp),
            last_run_at: last_run_at.as_deref().and_then(parse_timestamp),
            last_duration_ms: row.get(5)?,
        })
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

impl TaskStore for SqliteTaskStore {
    fn upsert_defaults(&self, defaults: &[ScheduledTask]) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        for task in defaults {
            conn.execute(
                "INSERT INTO scheduled_tasks (task_type, interval_minutes, enabled)
                 VALUES (?, ?, ?)
                 ON CONFLICT(task_type) DO UPDATE SET
                     interval_minutes = excluded.interval_minutes,
                     enabled = excluded.enabled",
                params![
                    task.task_type.as_str(),
                    task.interval_minutes,
                    task.enabled as i64
                ],
            )?;
        }
        Ok(())
    }

    fn list(&self) -> Result<Vec<ScheduledTask>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT task_type, interval_minutes, enabled, next_run_at, last_run_at,
                    last_duration_ms
             FROM scheduled_tasks ORDER BY task_type",
        )?;
        let rows = stmt.query_map([], Self::row_to_task)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    fn get(&self, task: TaskType) -> Result<Option<ScheduledTask>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let result = conn.query_row(
            "SELECT task_type, interval_minutes, enabled, next_run_at, last_run_at,
                    last_duration_ms
             FROM scheduled_tasks WHERE task_type = ?",
            params![task.as_str()],
            Self::row_to_task,
        );
        match result {
            Ok(row) => Ok(Some(row)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn update(
        &self,
        task: TaskType,
        interval_minutes: Option<i64>,
        enabled: Option<bool>,
    ) -> Result<ScheduledTask, StoreError> {
        {
            let conn = self.conn.lock().unwrap();
            let changed = conn.execute(
                "UPDATE scheduled_tasks SET
                     interval_minutes = COALESCE(?, interval_minutes),
                     enabled = COALESCE(?, enabled)
                 WHERE task_type = ?",
                params![interval_minutes, enabled.map(|e| e as i64), task.as_str()],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("task {}", task.as_str())));
            }
        }

        // Re-anchor the next due time on the new interval.
        let row = self
            .get(task)?
            .ok_or_else(|| StoreError::NotFound(format!("task {}", task.as_str())))?;
        let next = Utc::now() + Duration::minutes(row.interval_minutes);
        {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "UPDATE scheduled_tasks SET next_run_at = ? WHERE task_type = ?",
                params![next.to_rfc3339(), task.as_str()],
            )?;
        }
        self.get(task)?
            .ok_or_else(|| StoreError::NotFound(format!("task {}", task.as_str())))
    }

    fn record_run(
        &self,
        task: TaskType,
        last_run_at: DateTime<Utc>,
        last_duration_ms: i64,
        next_run_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE scheduled_tasks SET
                 last_run_at = ?, last_duration_ms = ?, next_run_at = ?
             WHERE task_type = ?",
            params![
                last_run_at.to_rfc3339(),
                last_duration_ms,
                next_run_at.to_rfc3339(),
                task.as_str()
            ],
        )?;
        Ok(())
    }
}
