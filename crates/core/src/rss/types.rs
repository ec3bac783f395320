//! RSS sync result types.

use serde::Serialize;

/// Accumulated outcome of one RSS sync cycle. Per-indexer failures land in
/// `errors` and never abort the cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RssSyncResult {
    pub indexers_checked: usize,
    pub releases_found: usize,
    pub grabbed: usize,
    pub errors: Vec<String>,
}
