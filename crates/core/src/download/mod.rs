//! Download lifecycle: the `Download` record, its store, and the manager that
//! drives grab → monitor → import.

mod manager;
mod sqlite;
mod store;
mod types;

pub use manager::{DownloadManager, GrabError, GrabRequest, MonitorResult};
pub use sqlite::SqliteDownloadStore;
pub use store::{DownloadFilter, DownloadStore, NewDownload};
pub use types::{Download, DownloadStatus, DownloadTarget};
