//! Newznab API client.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::config::IndexerConfig;
use crate::gateway::HttpGateway;

use super::types::{IndexerClient, IndexerError, Release, SearchOptions};
use super::xml::parse_feed;

/// Newznab client dispatching through the HTTP gateway under
/// `indexer:<id>` provider keys.
pub struct NewznabClient {
    gateway: Arc<HttpGateway>,
}

impl NewznabClient {
    pub fn new(gateway: Arc<HttpGateway>) -> Self {
        Self { gateway }
    }

    fn provider_key(indexer: &IndexerConfig) -> String {
        format!("indexer:{}", indexer.id)
    }

    fn build_url(indexer: &IndexerConfig, query: Option<&str>, options: &SearchOptions) -> String {
        let mut url = format!(
            "{}/api?t=search&apikey={}&limit={}",
            indexer.base_url.trim_end_matches('/'),
            urlencoding::encode(&indexer.api_key),
            options.limit
        );

        if let Some(query) = query {
            url.push_str(&format!("&q={}", urlencoding::encode(query)));
        }

        if !options.categories.is_empty() {
            let cats: Vec<String> = options.categories.iter().map(|c| c.to_string()).collect();
            url.push_str(&format!("&cat={}", cats.join(",")));
        }

        url
    }

    async fn fetch(
        &self,
        indexer: &IndexerConfig,
        query: Option<&str>,
        options: &SearchOptions,
    ) -> Result<Vec<Release>, IndexerError> {
        let url = Self::build_url(indexer, query, options);
        debug!(indexer = %indexer.id, query = ?query, "Querying Newznab indexer");

        let response = self.gateway.get(&Self::provider_key(indexer), &url).await?;
        let items = parse_feed(&response.body)?;

        debug!(
            indexer = %indexer.id,
            results = items.len(),
            "Newznab query complete"
        );

        Ok(items
            .into_iter()
            .map(|item| Release {
                guid: item.guid,
                title: item.title,
                size_bytes: item.size_bytes,
                pub_date: item.pub_date,
                download_url: item.download_url,
                categories: item.categories,
                indexer_id: indexer.id.clone(),
                indexer_name: indexer.name.clone(),
            })
            .collect())
    }
}

#[async_trait]
impl IndexerClient for NewznabClient {
    async fn search(
        &self,
        indexer: &IndexerConfig,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<Release>, IndexerError> {
        self.fetch(indexer, Some(query), options).await
    }

    async fn rss(
        &self,
        indexer: &IndexerConfig,
        options: &SearchOptions,
    ) -> Result<Vec<Release>, IndexerError> {
        self.fetch(indexer, None, options).await
    }
}
