//! The gateway facade over `reqwest`.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use crate::metrics;

use super::queue::ProviderQueue;
use super::types::{GatewayError, GatewayResponse, ProviderLimits};

/// Fallback delay when a 429 response carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

struct RawResponse {
    status: u16,
    body: String,
    retry_after: Option<u64>,
}

/// One outbound-HTTP facade with per-provider rate limits.
///
/// Providers are keyed by strings like `indexer:<id>` or `sabnzbd:<id>`;
/// unknown keys fall back to the default limits.
pub struct HttpGateway {
    client: Client,
    queues: RwLock<HashMap<String, Arc<ProviderQueue>>>,
    overrides: HashMap<String, ProviderLimits>,
    default_limits: ProviderLimits,
}

impl HttpGateway {
    pub fn new(default_limits: ProviderLimits, overrides: HashMap<String, ProviderLimits>) -> Self {
        // Timeouts are per provider, applied around each request.
        let client = Client::builder()
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            queues: RwLock::new(HashMap::new()),
            overrides,
            default_limits,
        }
    }

    fn queue_for(&self, provider: &str) -> Arc<ProviderQueue> {
        {
            let queues = self.queues.read().unwrap();
            if let Some(queue) = queues.get(provider) {
                return Arc::clone(queue);
            }
        }
        let mut queues = self.queues.write().unwrap();
        Arc::clone(queues.entry(provider.to_string()).or_insert_with(|| {
            let limits = self
                .overrides
                .get(provider)
                .copied()
                .unwrap_or(self.default_limits);
            Arc::new(ProviderQueue::new(limits))
        }))
    }

    /// Dispatch a GET under the provider's rate limits.
    ///
    /// 429 responses are retried once after the server-provided delay; any
    /// other non-2xx status surfaces as [`GatewayError::Http`] with the body
    /// preserved.
    pub async fn get(&self, provider: &str, url: &str) -> Result<GatewayResponse, GatewayError> {
        let queue = self.queue_for(provider);
        let timeout = queue.limits().timeout;

        let _permit = queue.admit().await;
        debug!(provider = provider, "Dispatching request");

        let mut response = self.execute(url, timeout).await;
        if let Ok(raw) = &response {
            if raw.status == 429 {
                let delay = raw.retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS);
                warn!(
                    provider = provider,
                    delay_secs = delay,
                    "Upstream rate limited, retrying once"
                );
                tokio::time::sleep(Duration::from_secs(delay)).await;
                response = self.execute(url, timeout).await;
            }
        }

        let result = match response {
            Ok(raw) if raw.status == 429 => Err(GatewayError::RateLimited {
                retry_after_secs: raw.retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
            }),
            Ok(raw) if (200..300).contains(&raw.status) => Ok(GatewayResponse {
                status: raw.status,
                body: raw.body,
            }),
            Ok(raw) => Err(GatewayError::Http {
                status: raw.status,
                body: raw.body,
            }),
            Err(e) => Err(e),
        };

        let status_label = match &result {
            Ok(_) => "success",
            Err(GatewayError::Timeout) => "timeout",
            Err(GatewayError::Network(_)) => "network",
            Err(GatewayError::RateLimited { .. }) => "rate_limited",
            Err(GatewayError::Http { .. }) => "http_error",
        };
        metrics::GATEWAY_REQUESTS
            .with_label_values(&[provider, status_label])
            .inc();

        result
    }

    async fn execute(&self, url: &str, timeout: Duration) -> Result<RawResponse, GatewayError> {
        let request = async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| GatewayError::Network(e.to_string()))?;

            let status = response.status().as_u16();
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            let body = response
                .text()
                .await
                .map_err(|e| GatewayError::Network(e.to_string()))?;

            Ok(RawResponse {
                status,
                body,
                retry_after,
            })
        };

        match tokio::time::timeout(timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout),
        }
    }
}
