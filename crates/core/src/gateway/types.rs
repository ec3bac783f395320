//! Gateway types.

use std::time::Duration;

use thiserror::Error;

use crate::config::ProviderLimitsConfig;

/// Rate limit parameters for one outbound provider.
#[derive(Debug, Clone, Copy)]
pub struct ProviderLimits {
    /// Dispatch window length.
    pub interval: Duration,
    /// Requests permitted per window.
    pub interval_cap: u32,
    /// Maximum in-flight requests.
    pub concurrency: u32,
    /// Request-level timeout.
    pub timeout: Duration,
}

impl From<&ProviderLimitsConfig> for ProviderLimits {
    fn from(config: &ProviderLimitsConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.interval_ms),
            interval_cap: config.interval_cap.max(1),
            concurrency: config.concurrency.max(1),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

impl Default for ProviderLimits {
    fn default() -> Self {
        (&ProviderLimitsConfig::default()).into()
    }
}

/// A successful (2xx) gateway response.
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub status: u16,
    pub body: String,
}

/// Errors surfaced by the gateway. Retries are the caller's policy, except
/// for a single retry on upstream 429.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout")]
    Timeout,

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Rate limited by upstream, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
}

impl GatewayError {
    /// Transport-level failures callers may reasonably retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, GatewayError::Network(_) | GatewayError::Timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_from_config_clamps_zeroes() {
        let config = ProviderLimitsConfig {
            interval_ms: 500,
            interval_cap: 0,
            concurrency: 0,
            timeout_secs: 10,
        };
        let limits = ProviderLimits::from(&config);
        assert_eq!(limits.interval, Duration::from_millis(500));
        assert_eq!(limits.interval_cap, 1);
        assert_eq!(limits.concurrency, 1);
    }

    #[test]
    fn test_transient_classification() {
        assert!(GatewayError::Network("reset".into()).is_transient());
        assert!(GatewayError::Timeout.is_transient());
        assert!(!GatewayError::Http {
            status: 500,
            body: String::new()
        }
        .is_transient());
        assert!(!GatewayError::RateLimited {
            retry_after_secs: 5
        }
        .is_transient());
    }
}
