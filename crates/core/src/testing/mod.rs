//! Testing utilities and mock implementations for E2E tests.
//!
//! This module provides mock implementations of the external service traits
//! (indexers, download clients), allowing comprehensive engine testing
//! without real infrastructure.
//!
//! # Example
//!
//! ```rust,ignore
//! use magpie_core::testing::{fixtures, MockDownloadClient, MockIndexerClient};
//!
//! let indexer_client = MockIndexerClient::new();
//! indexer_client.set_rss("mock-indexer", vec![
//!     fixtures::release("abc", "The.Matrix.1999.1080p.BluRay.x264"),
//! ]);
//!
//! let download_client = MockDownloadClient::new("sab");
//! ```

mod mock_download_client;
mod mock_indexer;

pub use mock_download_client::MockDownloadClient;
pub use mock_indexer::MockIndexerClient;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::config::{DownloadClientConfig, DownloadClientKind, IndexerConfig};
    use crate::downloadclient::{HistoryItem, JobStatus};
    use crate::indexer::Release;

    /// Create a test release from the default mock indexer.
    pub fn release(guid: &str, title: &str) -> Release {
        Release {
            guid: guid.to_string(),
            title: title.to_string(),
            size_bytes: 1024 * 1024 * 1024,
            pub_date: None,
            download_url: format!("https://indexer.example/get/{}", guid),
            categories: vec![2000],
            indexer_id: "mock-indexer".to_string(),
            indexer_name: "Mock Indexer".to_string(),
        }
    }

    /// Create a test indexer config with the given id.
    pub fn indexer(id: &str) -> IndexerConfig {
        IndexerConfig {
            id: id.to_string(),
            name: format!("Indexer {}", id),
            base_url: format!("https://{}.example", id),
            api_key: "key".to_string(),
            categories: vec![],
            enabled: true,
            supports_rss: true,
            priority: 25,
        }
    }

    /// Create a test download client config with the given id.
    pub fn download_client(id: &str) -> DownloadClientConfig {
        DownloadClientConfig {
            id: id.to_string(),
            name: format!("Client {}", id),
            kind: DownloadClientKind::Sabnzbd,
            host: "localhost".to_string(),
            port: 8080,
            api_key: "key".to_string(),
            use_ssl: false,
            enabled: true,
            priority: 1,
            remove_completed: false,
            remove_failed: false,
            remote_path: None,
            local_path: None,
            category: None,
        }
    }

    /// Create a completed history slot.
    pub fn completed_slot(external_id: &str, name: &str, storage: Option<&str>) -> HistoryItem {
        HistoryItem {
            external_id: external_id.to_string(),
            name: name.to_string(),
            category: None,
            storage_path: storage.map(|s| s.to_string()),
            status: JobStatus::Completed,
            fail_message: None,
            completed_at: Some(chrono::Utc::now()),
        }
    }
}
