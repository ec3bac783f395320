//! Episode importer.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::download::{Download, DownloadTarget};
use crate::library::{LibraryStore, MediaFileOwner, MediaKind};

use super::error::ImportError;
use super::fs::{
    check_path_accessible, collect_files, largest_file, move_file, sanitize_name, VIDEO_EXTS,
};
use super::types::{Importer, ImportResult};

/// Imports a completed episode download to
/// `<root>/<Show>/Season NN/<Show> - SNNEMM.<ext>`.
pub struct EpisodeImporter {
    library: Arc<dyn LibraryStore>,
}

impl EpisodeImporter {
    pub fn new(library: Arc<dyn LibraryStore>) -> Self {
        Self { library }
    }

    async fn run(&self, download: &Download) -> Result<usize, ImportError> {
        let (tv_show_id, episode_id) = match download.target {
            DownloadTarget::Episode {
                tv_show_id,
                episode_id,
            } => (tv_show_id, episode_id),
            _ => return Err(ImportError::WrongTarget),
        };
        let output = download
            .output_path
            .as_deref()
            .ok_or(ImportError::NoOutputPath)?;

        check_path_accessible(Path::new(output)).await?;

        let episode = self
            .library
            .get_episode(episode_id)?
            .ok_or_else(|| ImportError::MissingEntity(format!("episode {}", episode_id)))?;
        let show = self
            .library
            .get_tv_show(tv_show_id)?
            .ok_or_else(|| ImportError::MissingEntity(format!("tv show {}", tv_show_id)))?;
        let root = self
            .library
            .root_folder(MediaKind::Tv)?
            .ok_or(ImportError::NoRootFolder("tv"))?;

        let files = collect_files(Path::new(output), VIDEO_EXTS).await?;
        let main = largest_file(&files)
            .await?
            .ok_or_else(|| ImportError::NoFiles(output.into()))?;

        let show_name = sanitize_name(&show.title);
        let ext = main.extension().and_then(|e| e.to_str()).unwrap_or("mkv");
        let destination = PathBuf::from(&root.path)
            .join(&show_name)
            .join(format!("Season {:02}", episode.season))
            .join(format!(
                "{} - S{:02}E{:02}.{}",
                show_name, episode.season, episode.episode, ext
            ));

        let size = move_file(&main, &destination).await?;
        self.library.add_media_file(
            &destination.to_string_lossy(),
            size as i64,
            MediaFileOwner::Episode(episode.id),
        )?;
        self.library.set_episode_has_file(episode.id, true)?;

        info!(
            show = %show.title,
            season = episode.season,
            episode = episode.episode,
            "Episode imported"
        );
        Ok(1)
    }
}

#[async_trait]
impl Importer for EpisodeImporter {
    fn media_kind(&self) -> MediaKind {
        MediaKind::Tv
    }

    async fn import(&self, download: &Download) -> ImportResult {
        match self.run(download).await {
            Ok(files) => ImportResult::ok(files),
            Err(e) => ImportResult::failed(e.to_string()),
        }
    }
}
