//! Scanner result types.

use serde::Serialize;

/// Accumulated outcome of one completed-downloads scan.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanResult {
    pub clients_checked: usize,
    pub slots_seen: usize,
    pub imports_started: usize,
    pub orphans_matched: usize,
    pub errors: Vec<String>,
}
