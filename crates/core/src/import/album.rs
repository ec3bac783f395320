//! Album importer.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::download::{Download, DownloadTarget};
use crate::library::{LibraryStore, MediaFileOwner, MediaKind};

use super::error::ImportError;
use super::fs::{check_path_accessible, collect_files, move_file, sanitize_name, AUDIO_EXTS};
use super::types::{Importer, ImportResult};

/// Imports a completed album download to `<root>/<Artist>/<Album>/`, linking
/// each moved file to a track. Albums with no known track list get tracks
/// synthesized from the files; completeness stays derived from track links.
pub struct AlbumImporter {
    library: Arc<dyn LibraryStore>,
}

impl AlbumImporter {
    pub fn new(library: Arc<dyn LibraryStore>) -> Self {
        Self { library }
    }

    async fn run(&self, download: &Download) -> Result<usize, ImportError> {
        let album_id = match download.target {
            DownloadTarget::Album { album_id } => album_id,
            _ => return Err(ImportError::WrongTarget),
        };
        let output = download
            .output_path
            .as_deref()
            .ok_or(ImportError::NoOutputPath)?;

        check_path_accessible(Path::new(output)).await?;

        let album = self
            .library
            .get_album(album_id)?
            .ok_or_else(|| ImportError::MissingEntity(format!("album {}", album_id)))?;
        let artist = self
            .library
            .get_artist(album.artist_id)?
            .ok_or_else(|| ImportError::MissingEntity(format!("artist {}", album.artist_id)))?;
        let root = self
            .library
            .root_folder(MediaKind::Music)?
            .ok_or(ImportError::NoRootFolder("music"))?;

        let files = collect_files(Path::new(output), AUDIO_EXTS).await?;
        if files.is_empty() {
            return Err(ImportError::NoFiles(output.into()));
        }

        let album_dir = PathBuf::from(&root.path)
            .join(sanitize_name(&artist.name))
            .join(sanitize_name(&album.title));

        let mut tracks = self.library.album_tracks(album.id)?;
        if tracks.is_empty() {
            // No known track list: synthesize one per file, in file order.
            for (idx, file) in files.iter().enumerate() {
                let stem = file
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("Unknown");
                tracks.push(self.library.add_track(album.id, idx as i32 + 1, stem)?);
            }
        }

        let mut imported = 0usize;
        for (idx, source) in files.iter().enumerate() {
            let file_name = source
                .file_name()
                .and_then(|n| n.to_str())
                .map(sanitize_name)
                .unwrap_or_else(|| format!("track-{:02}", idx + 1));
            let destination = album_dir.join(file_name);

            let size = move_file(source, &destination).await?;
            let media_file = self.library.add_media_file(
                &destination.to_string_lossy(),
                size as i64,
                MediaFileOwner::Track,
            )?;
            if let Some(track) = tracks.get(idx) {
                if track.media_file_id.is_none() {
                    self.library.link_track_file(track.id, media_file.id)?;
                }
            }
            imported += 1;
        }

        info!(
            artist = %artist.name,
            album = %album.title,
            files = imported,
            complete = self.library.album_complete(album.id)?,
            "Album imported"
        );
        Ok(imported)
    }
}

#[async_trait]
impl Importer for AlbumImporter {
    fn media_kind(&self) -> MediaKind {
        MediaKind::Music
    }

    async fn import(&self, download: &Download) -> ImportResult {
        match self.run(download).await {
            Ok(files) => ImportResult::ok(files),
            Err(e) => ImportResult::failed(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::DownloadStatus;
    use crate::library::SqliteLibraryStore;
    use chrono::Utc;
    use tempfile::TempDir;

    fn download_for(album_id: i64, output: &str) -> Download {
        Download {
            id: 1,
            external_id: None,
            client_id: "sab".to_string(),
            indexer_id: None,
            indexer_name: None,
            title: "Artist - Album FLAC".to_string(),
            size_bytes: 0,
            download_url: String::new(),
            guid: "g".to_string(),
            output_path: Some(output.to_string()),
            status: DownloadStatus::Importing,
            progress: 100.0,
            started_at: Utc::now(),
            completed_at: Some(Utc::now()),
            error_message: None,
            target: DownloadTarget::Album { album_id },
        }
    }

    #[tokio::test]
    async fn test_import_album_synthesizes_tracks_and_completes() {
        let library = Arc::new(SqliteLibraryStore::in_memory().unwrap());
        let artist = library.add_artist("Pink Floyd", None).unwrap();
        let album = library.add_album(artist.id, "The Wall", Some(1979)).unwrap();

        let downloads_dir = TempDir::new().unwrap();
        let library_dir = TempDir::new().unwrap();
        library
            .add_root_folder(&library_dir.path().to_string_lossy(), MediaKind::Music)
            .unwrap();

        let job_dir = downloads_dir.path().join("Pink.Floyd.The.Wall.FLAC");
        tokio::fs::create_dir(&job_dir).await.unwrap();
        tokio::fs::write(job_dir.join("01 - In the Flesh.flac"), vec![0u8; 64])
            .await
            .unwrap();
        tokio::fs::write(job_dir.join("02 - The Thin Ice.flac"), vec![0u8; 64])
            .await
            .unwrap();

        let importer = AlbumImporter::new(Arc::clone(&library) as Arc<dyn LibraryStore>);
        let result = importer
            .import(&download_for(album.id, &job_dir.to_string_lossy()))
            .await;

        assert!(result.success, "errors: {:?}", result.errors);
        assert_eq!(result.files_imported, 2);
        assert!(library.album_complete(album.id).unwrap());

        let album_dir = library_dir.path().join("Pink Floyd/The Wall");
        assert!(album_dir.join("01 - In the Flesh.flac").exists());
        assert!(album_dir.join("02 - The Thin Ice.flac").exists());
    }

    #[tokio::test]
    async fn test_import_album_links_existing_tracks() {
        let library = Arc::new(SqliteLibraryStore::in_memory().unwrap());
        let artist = library.add_artist("Artist", None).unwrap();
        let album = library.add_album(artist.id, "Album", None).unwrap();
        library.add_track(album.id, 1, "One").unwrap();
        library.add_track(album.id, 2, "Two").unwrap();

        let downloads_dir = TempDir::new().unwrap();
        let library_dir = TempDir::new().unwrap();
        library
            .add_root_folder(&library_dir.path().to_string_lossy(), MediaKind::Music)
            .unwrap();

        let job_dir = downloads_dir.path().join("album");
        tokio::fs::create_dir(&job_dir).await.unwrap();
        tokio::fs::write(job_dir.join("a.mp3"), vec![0u8; 8]).await.unwrap();
        tokio::fs::write(job_dir.join("b.mp3"), vec![0u8; 8]).await.unwrap();

        let importer = AlbumImporter::new(Arc::clone(&library) as Arc<dyn LibraryStore>);
        let result = importer
            .import(&download_for(album.id, &job_dir.to_string_lossy()))
            .await;

        assert!(result.success);
        assert!(library.album_complete(album.id).unwrap());
        let tracks = library.album_tracks(album.id).unwrap();
        assert_eq!(tracks.len(), 2);
        assert!(tracks.iter().all(|t| t.media_file_id.is_some()));
    }
}
