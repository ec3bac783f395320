//! Movie importer.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::download::{Download, DownloadTarget};
use crate::library::{LibraryStore, MediaFileOwner, MediaKind, Movie};

use super::error::ImportError;
use super::fs::{
    check_path_accessible, collect_files, largest_file, move_file, sanitize_name, VIDEO_EXTS,
};
use super::types::{Importer, ImportResult};

/// Imports a completed movie download: picks the main video file, moves it to
/// `<root>/Title (Year)/Title (Year).<ext>`, links the media file and flips
/// `has_file`.
pub struct MovieImporter {
    library: Arc<dyn LibraryStore>,
}

impl MovieImporter {
    pub fn new(library: Arc<dyn LibraryStore>) -> Self {
        Self { library }
    }

    fn movie_base_name(movie: &Movie) -> String {
        match movie.year {
            Some(year) => format!("{} ({})", sanitize_name(&movie.title), year),
            None => sanitize_name(&movie.title),
        }
    }

    async fn run(&self, download: &Download) -> Result<usize, ImportError> {
        let movie_id = match download.target {
            DownloadTarget::Movie { movie_id } => movie_id,
            _ => return Err(ImportError::WrongTarget),
        };
        let output = download
            .output_path
            .as_deref()
            .ok_or(ImportError::NoOutputPath)?;

        check_path_accessible(Path::new(output)).await?;

        let movie = self
            .library
            .get_movie(movie_id)?
            .ok_or_else(|| ImportError::MissingEntity(format!("movie {}", movie_id)))?;
        let root = self
            .library
            .root_folder(MediaKind::Movie)?
            .ok_or(ImportError::NoRootFolder("movie"))?;

        let files = collect_files(Path::new(output), VIDEO_EXTS).await?;
        let main = largest_file(&files)
            .await?
            .ok_or_else(|| ImportError::NoFiles(output.into()))?;

        let base = Self::movie_base_name(&movie);
        let ext = main
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("mkv")
            .to_string();
        let destination = PathBuf::from(&root.path)
            .join(&base)
            .join(format!("{}.{}", base, ext));

        let size = move_file(&main, &destination).await?;
        let file = self.library.add_media_file(
            &destination.to_string_lossy(),
            size as i64,
            MediaFileOwner::Movie(movie.id),
        )?;
        self.library.set_movie_has_file(movie.id, true)?;

        info!(
            movie = %movie.title,
            file = %file.path,
            "Movie imported"
        );
        Ok(1)
    }
}

#[async_trait]
impl Importer for MovieImporter {
    fn media_kind(&self) -> MediaKind {
        MediaKind::Movie
    }

    async fn import(&self, download: &Download) -> ImportResult {
        match self.run(download).await {
            Ok(files) => ImportResult::ok(files),
            Err(e) => ImportResult::failed(e.to_string()),
        }
    }
}
