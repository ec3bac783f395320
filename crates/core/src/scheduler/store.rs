//! Task schedule storage trait.

use chrono::{DateTime, Utc};

use crate::store::StoreError;

use super::types::{ScheduledTask, TaskType};

/// Persistence for `scheduled_tasks` rows.
pub trait TaskStore: Send + Sync {
    /// Insert missing rows and apply interval/enabled from the provided
    /// defaults (config is authoritative for those two columns); run
    /// timestamps are preserved.
    fn upsert_defaults(&self, defaults: &[ScheduledTask]) -> Result<(), StoreError>;

    fn list(&self) -> Result<Vec<ScheduledTask>, StoreError>;

    fn get(&self, task: TaskType) -> Result<Option<ScheduledTask>, StoreError>;

    /// Manual re-schedule; also moves `next_run_at` to now + interval.
    fn update(
        &self,
        task: TaskType,
        interval_minutes: Option<i64>,
        enabled: Option<bool>,
    ) -> Result<ScheduledTask, StoreError>;

    /// Record one execution: timestamps, duration and the next due time.
    fn record_run(
        &self,
        task: TaskType,
        last_run_at: DateTime<Utc>,
        last_duration_ms: i64,
        next_run_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}
