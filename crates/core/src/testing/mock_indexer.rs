//! Mock indexer client for tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::IndexerConfig;
use crate::gateway::GatewayError;
use crate::indexer::{IndexerClient, IndexerError, Release, SearchOptions};

/// Configurable in-memory indexer client.
///
/// Results are keyed by indexer id; indexers marked failing return a network
/// error. An optional per-call delay makes re-entrancy observable in tests.
#[derive(Default)]
pub struct MockIndexerClient {
    rss_results: Mutex<HashMap<String, Vec<Release>>>,
    search_results: Mutex<HashMap<String, Vec<Release>>>,
    failing: Mutex<HashSet<String>>,
    delay: Mutex<Option<Duration>>,
    rss_calls: AtomicU32,
    search_calls: AtomicU32,
}

impl MockIndexerClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the releases the given indexer's feed returns.
    pub fn set_rss(&self, indexer_id: &str, releases: Vec<Release>) {
        self.rss_results
            .lock()
            .unwrap()
            .insert(indexer_id.to_string(), releases);
    }

    /// Set the releases the given indexer returns for any search query.
    pub fn set_search(&self, indexer_id: &str, releases: Vec<Release>) {
        self.search_results
            .lock()
            .unwrap()
            .insert(indexer_id.to_string(), releases);
    }

    /// Make an indexer fail with a network error.
    pub fn fail_indexer(&self, indexer_id: &str) {
        self.failing.lock().unwrap().insert(indexer_id.to_string());
    }

    /// Delay every request, to hold a cycle open.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn rss_call_count(&self) -> u32 {
        self.rss_calls.load(Ordering::SeqCst)
    }

    pub fn search_call_count(&self) -> u32 {
        self.search_calls.load(Ordering::SeqCst)
    }

    async fn respond(
        &self,
        indexer: &IndexerConfig,
        results: &Mutex<HashMap<String, Vec<Release>>>,
    ) -> Result<Vec<Release>, IndexerError> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().unwrap().contains(&indexer.id) {
            return Err(IndexerError::Gateway(GatewayError::Network(
                "mock connection refused".to_string(),
            )));
        }
        Ok(results
            .lock()
            .unwrap()
            .get(&indexer.id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl IndexerClient for MockIndexerClient {
    async fn search(
        &self,
        indexer: &IndexerConfig,
        _query: &str,
        _options: &SearchOptions,
    ) -> Result<Vec<Release>, IndexerError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.respond(indexer, &self.search_results).await
    }

    async fn rss(
        &self,
        indexer: &IndexerConfig,
        _options: &SearchOptions,
    ) -> Result<Vec<Release>, IndexerError> {
        self.rss_calls.fetch_add(1, Ordering::SeqCst);
        self.respond(indexer, &self.rss_results).await
    }
}
