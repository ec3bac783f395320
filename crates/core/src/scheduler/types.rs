//! Scheduled task types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The periodic jobs the engine runs. One `scheduled_tasks` row per type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    DownloadMonitor,
    CompletedScan,
    WantedSearch,
    RssSync,
    Backup,
    BlacklistCleanup,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::DownloadMonitor => "download_monitor",
            TaskType::CompletedScan => "completed_scan",
            TaskType::WantedSearch => "wanted_search",
            TaskType::RssSync => "rss_sync",
            TaskType::Backup => "backup",
            TaskType::BlacklistCleanup => "blacklist_cleanup",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "download_monitor" => Some(TaskType::DownloadMonitor),
            "completed_scan" => Some(TaskType::CompletedScan),
            "wanted_search" => Some(TaskType::WantedSearch),
            "rss_sync" => Some(TaskType::RssSync),
            "backup" => Some(TaskType::Backup),
            "blacklist_cleanup" => Some(TaskType::BlacklistCleanup),
            _ => None,
        }
    }

    pub fn default_interval_minutes(&self) -> i64 {
        match self {
            TaskType::DownloadMonitor => 1,
            TaskType::CompletedScan => 5,
            TaskType::WantedSearch => 60,
            TaskType::RssSync => 15,
            TaskType::Backup => 1440,
            TaskType::BlacklistCleanup => 1440,
        }
    }

    pub fn all() -> &'static [TaskType] {
        &[
            TaskType::DownloadMonitor,
            TaskType::CompletedScan,
            TaskType::WantedSearch,
            TaskType::RssSync,
            TaskType::Backup,
            TaskType::BlacklistCleanup,
        ]
    }
}

/// Persistent schedule state for one task type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub task_type: TaskType,
    pub interval_minutes: i64,
    pub enabled: bool,
    pub next_run_at: Option<DateTime<Utc>>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_duration_ms: Option<i64>,
}

impl ScheduledTask {
    /// Default row for a task type.
    pub fn with_defaults(task_type: TaskType) -> Self {
        Self {
            task_type,
            interval_minutes: task_type.default_interval_minutes(),
            enabled: true,
            next_run_at: None,
            last_run_at: None,
            last_duration_ms: None,
        }
    }

    /// Whether the task is due to run now.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.enabled && self.next_run_at.map(|at| at <= now).unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_task_type_round_trip() {
        for task in TaskType::all() {
            assert_eq!(TaskType::from_str(task.as_str()), Some(*task));
        }
        assert_eq!(TaskType::from_str("nope"), None);
    }

    #[test]
    fn test_default_intervals() {
        assert_eq!(TaskType::DownloadMonitor.default_interval_minutes(), 1);
        assert_eq!(TaskType::CompletedScan.default_interval_minutes(), 5);
        assert_eq!(TaskType::WantedSearch.default_interval_minutes(), 60);
        assert_eq!(TaskType::RssSync.default_interval_minutes(), 15);
        assert_eq!(TaskType::Backup.default_interval_minutes(), 1440);
        assert_eq!(TaskType::BlacklistCleanup.default_interval_minutes(), 1440);
    }

    #[test]
    fn test_is_due() {
        let now = Utc::now();
        let mut task = ScheduledTask::with_defaults(TaskType::RssSync);

        // No next_run_at yet: due immediately.
        assert!(task.is_due(now));

        task.next_run_at = Some(now + Duration::minutes(5));
        assert!(!task.is_due(now));

        task.next_run_at = Some(now - Duration::minutes(5));
        assert!(task.is_due(now));

        task.enabled = false;
        assert!(!task.is_due(now));
    }
}
