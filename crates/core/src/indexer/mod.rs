//! Newznab-compatible indexer access.
//!
//! The [`IndexerClient`] trait covers synchronous search and the RSS-style
//! latest-releases endpoint; [`NewznabClient`] implements it over the HTTP
//! gateway.

mod newznab;
mod types;
mod xml;

pub use newznab::NewznabClient;
pub use types::{IndexerClient, IndexerError, Release, SearchOptions};
pub use xml::parse_feed;
