//! Release filtering against the blacklist.

use std::sync::Arc;

use tracing::warn;

use crate::indexer::Release;

use super::store::BlacklistStore;

/// Filters release batches through the blacklist.
#[derive(Clone)]
pub struct BlacklistFilter {
    store: Arc<dyn BlacklistStore>,
}

impl BlacklistFilter {
    pub fn new(store: Arc<dyn BlacklistStore>) -> Self {
        Self { store }
    }

    /// Drop releases present by guid or by normalized title. A store error on
    /// one release keeps that release; suppression is best-effort.
    pub fn filter(&self, releases: Vec<Release>) -> Vec<Release> {
        releases
            .into_iter()
            .filter(|release| match self.store.contains(&release.guid, &release.title) {
                Ok(blacklisted) => !blacklisted,
                Err(e) => {
                    warn!(guid = %release.guid, "Blacklist lookup failed: {}", e);
                    true
                }
            })
            .collect()
    }

    /// Record a failed release so it is not grabbed again.
    pub fn add(&self, release: &Release, reason: &str) {
        if let Err(e) = self
            .store
            .add(Some(&release.guid), Some(&release.title), reason)
        {
            warn!(guid = %release.guid, "Failed to blacklist release: {}", e);
        }
    }
}
