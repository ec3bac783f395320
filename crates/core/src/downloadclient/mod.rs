//! Download client adapters: a uniform front-end over external grabbers.

mod sabnzbd;
mod types;

pub use sabnzbd::SabnzbdClient;
pub use types::{
    AddJobRequest, DownloadClient, DownloadClientError, HistoryItem, Job, JobStatus,
};
