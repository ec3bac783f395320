//! Core download record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::library::MediaKind;

/// Lifecycle state of a grabbed release.
///
/// `Completed` means imported; a download-client job that finishes moves the
/// record to `Importing` first, and only a successful import makes it
/// `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    Queued,
    Downloading,
    Paused,
    Completed,
    Importing,
    Failed,
}

impl DownloadStatus {
    /// Returns true if no further automatic transitions occur from this state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DownloadStatus::Completed | DownloadStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadStatus::Queued => "queued",
            DownloadStatus::Downloading => "downloading",
            DownloadStatus::Paused => "paused",
            DownloadStatus::Completed => "completed",
            DownloadStatus::Importing => "importing",
            DownloadStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(DownloadStatus::Queued),
            "downloading" => Some(DownloadStatus::Downloading),
            "paused" => Some(DownloadStatus::Paused),
            "completed" => Some(DownloadStatus::Completed),
            "importing" => Some(DownloadStatus::Importing),
            "failed" => Some(DownloadStatus::Failed),
            _ => None,
        }
    }
}

/// The library entity a download will populate. Exactly one foreign-key shape
/// per download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DownloadTarget {
    Movie { movie_id: i64 },
    Episode { tv_show_id: i64, episode_id: i64 },
    Album { album_id: i64 },
    Book { book_id: i64 },
}

impl DownloadTarget {
    pub fn media_kind(&self) -> MediaKind {
        match self {
            DownloadTarget::Movie { .. } => MediaKind::Movie,
            DownloadTarget::Episode { .. } => MediaKind::Tv,
            DownloadTarget::Album { .. } => MediaKind::Music,
            DownloadTarget::Book { .. } => MediaKind::Book,
        }
    }
}

/// Persistent record for a grabbed release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Download {
    pub id: i64,
    /// Id assigned by the remote download client once enqueued.
    pub external_id: Option<String>,
    pub client_id: String,
    pub indexer_id: Option<String>,
    pub indexer_name: Option<String>,
    pub title: String,
    pub size_bytes: i64,
    pub download_url: String,
    pub guid: String,
    pub output_path: Option<String>,
    pub status: DownloadStatus,
    /// Percent complete, 0..=100.
    pub progress: f64,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub target: DownloadTarget,
}
