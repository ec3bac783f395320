//! Importer trait and result types.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::download::Download;
use crate::library::MediaKind;

/// Outcome of one import attempt. Errors never propagate past the importer
/// boundary; they end up here and on the download record.
#[derive(Debug, Clone, Serialize)]
pub struct ImportResult {
    pub success: bool,
    pub files_imported: usize,
    pub errors: Vec<String>,
}

impl ImportResult {
    pub fn ok(files_imported: usize) -> Self {
        Self {
            success: true,
            files_imported,
            errors: Vec::new(),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            files_imported: 0,
            errors: vec![error.into()],
        }
    }
}

/// One importer per media kind. Preconditions: the download has a reachable
/// `output_path` and its library entity exists. On failure files are left in
/// place.
#[async_trait]
pub trait Importer: Send + Sync {
    fn media_kind(&self) -> MediaKind;

    async fn import(&self, download: &Download) -> ImportResult;
}

/// Dispatches downloads to the importer for their media kind.
pub struct ImporterSet {
    importers: HashMap<MediaKind, Arc<dyn Importer>>,
}

impl ImporterSet {
    pub fn new(importers: Vec<Arc<dyn Importer>>) -> Self {
        Self {
            importers: importers
                .into_iter()
                .map(|i| (i.media_kind(), i))
                .collect(),
        }
    }

    pub fn for_kind(&self, kind: MediaKind) -> Option<Arc<dyn Importer>> {
        self.importers.get(&kind).map(Arc::clone)
    }

    /// Run the right importer for a download's target.
    pub async fn import(&self, download: &Download) -> ImportResult {
        match self.for_kind(download.target.media_kind()) {
            Some(importer) => importer.import(download).await,
            None => ImportResult::failed(format!(
                "no importer registered for {}",
                download.target.media_kind().as_str()
            )),
        }
    }
}
