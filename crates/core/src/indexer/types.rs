//! Indexer types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::IndexerConfig;
use crate::gateway::GatewayError;

/// A single release returned by an indexer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    pub guid: String,
    pub title: String,
    pub size_bytes: i64,
    pub pub_date: Option<DateTime<Utc>>,
    pub download_url: String,
    pub categories: Vec<u32>,
    /// Which indexer returned this release.
    pub indexer_id: String,
    pub indexer_name: String,
}

/// Options for a search or feed request.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub categories: Vec<u32>,
    pub limit: u32,
}

impl SearchOptions {
    pub fn new(categories: Vec<u32>, limit: u32) -> Self {
        Self { categories, limit }
    }
}

/// Errors from indexer requests.
#[derive(Debug, Error)]
pub enum IndexerError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Trait for Newznab-compatible indexer backends. Callers are expected to
/// tolerate per-indexer failure.
#[async_trait]
pub trait IndexerClient: Send + Sync {
    /// Synchronous search via the indexer API.
    async fn search(
        &self,
        indexer: &IndexerConfig,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<Release>, IndexerError>;

    /// Latest releases endpoint; same shape as search with an empty query.
    async fn rss(
        &self,
        indexer: &IndexerConfig,
        options: &SearchOptions,
    ) -> Result<Vec<Release>, IndexerError>;
}
