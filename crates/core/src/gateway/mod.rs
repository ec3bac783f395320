//! Outbound HTTP facade with per-provider rate limits.
//!
//! Every third-party integration (indexers, download clients, metadata
//! providers) dispatches through [`HttpGateway`]; no other component builds a
//! `reqwest::Client`.

mod client;
mod queue;
mod types;

pub use client::HttpGateway;
pub use queue::ProviderQueue;
pub use types::{GatewayError, GatewayResponse, ProviderLimits};
