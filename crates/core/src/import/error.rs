//! Import error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ImportError {
    /// The download path did not answer within the accessibility timeout, or
    /// is not readable. Always terminal for the current import attempt.
    #[error("Download path not responding: {0}")]
    PathUnavailable(String),

    #[error("No importable files under {0}")]
    NoFiles(PathBuf),

    #[error("Library entity missing: {0}")]
    MissingEntity(String),

    #[error("No root folder configured for {0}")]
    NoRootFolder(&'static str),

    #[error("Download has no output path")]
    NoOutputPath,

    #[error("Download target does not match this importer")]
    WrongTarget,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
