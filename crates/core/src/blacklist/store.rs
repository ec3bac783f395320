//! Blacklist storage trait.

use chrono::{DateTime, Utc};

use crate::store::StoreError;

/// One suppressed release, keyed by guid and/or normalized title.
#[derive(Debug, Clone, PartialEq)]
pub struct BlacklistEntry {
    pub id: i64,
    pub guid: Option<String>,
    pub normalized_title: Option<String>,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// Storage for blacklisted releases. Reads are lock-free from the caller's
/// perspective; writes serialize at the store.
pub trait BlacklistStore: Send + Sync {
    /// Add an entry. The title is normalized before storage.
    fn add(
        &self,
        guid: Option<&str>,
        title: Option<&str>,
        reason: &str,
    ) -> Result<BlacklistEntry, StoreError>;

    /// Whether a release is suppressed, by guid or by normalized title.
    fn contains(&self, guid: &str, title: &str) -> Result<bool, StoreError>;

    /// Delete entries older than the cutoff; returns how many were removed.
    fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError>;

    fn count(&self) -> Result<i64, StoreError>;
}
