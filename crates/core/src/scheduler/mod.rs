//! Task scheduler: registers periodic task runners and drives them on their
//! configured intervals.

mod runner;
mod runners;
mod sqlite;
mod store;
mod types;

pub use runner::{Scheduler, SchedulerError, TaskRunner, TaskStatus};
pub use runners::{
    BackupRunner, BlacklistCleanupRunner, CompletedScanRunner, DownloadMonitorRunner,
    RssSyncRunner, WantedSearchRunner,
};
pub use sqlite::SqliteTaskStore;
pub use store::TaskStore;
pub use types::{ScheduledTask, TaskType};
