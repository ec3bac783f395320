//! Book importer.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::download::{Download, DownloadTarget};
use crate::library::{LibraryStore, MediaFileOwner, MediaKind};

use super::error::ImportError;
use super::fs::{check_path_accessible, collect_files, move_file, sanitize_name, BOOK_EXTS};
use super::types::{Importer, ImportResult};

/// Imports a completed book download to `<root>/<Author>/<Title>.<ext>`.
/// When several formats are present the first (sorted) wins; the rest stay in
/// the source folder.
pub struct BookImporter {
    library: Arc<dyn LibraryStore>,
}

impl BookImporter {
    pub fn new(library: Arc<dyn LibraryStore>) -> Self {
        Self { library }
    }

    async fn run(&self, download: &Download) -> Result<usize, ImportError> {
        let book_id = match download.target {
            DownloadTarget::Book { book_id } => book_id,
            _ => return Err(ImportError::WrongTarget),
        };
        let output = download
            .output_path
            .as_deref()
            .ok_or(ImportError::NoOutputPath)?;

        check_path_accessible(Path::new(output)).await?;

        let book = self
            .library
            .get_book(book_id)?
            .ok_or_else(|| ImportError::MissingEntity(format!("book {}", book_id)))?;
        let author = self
            .library
            .get_author(book.author_id)?
            .ok_or_else(|| ImportError::MissingEntity(format!("author {}", book.author_id)))?;
        let root = self
            .library
            .root_folder(MediaKind::Book)?
            .ok_or(ImportError::NoRootFolder("book"))?;

        let files = collect_files(Path::new(output), BOOK_EXTS).await?;
        let source = files
            .first()
            .ok_or_else(|| ImportError::NoFiles(output.into()))?;

        let ext = source.extension().and_then(|e| e.to_str()).unwrap_or("epub");
        let destination = PathBuf::from(&root.path)
            .join(sanitize_name(&author.name))
            .join(format!("{}.{}", sanitize_name(&book.title), ext));

        let size = move_file(source, &destination).await?;
        self.library.add_media_file(
            &destination.to_string_lossy(),
            size as i64,
            MediaFileOwner::Book(book.id),
        )?;
        self.library.set_book_has_file(book.id, true)?;

        info!(author = %author.name, book = %book.title, "Book imported");
        Ok(1)
    }
}

#[async_trait]
impl Importer for BookImporter {
    fn media_kind(&self) -> MediaKind {
        MediaKind::Book
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

    #[tokio::test]
    async fn test_import_book() {
        let library = Arc::new(SqliteLibraryStore::in_memory().unwrap());
        let author = library.add_author("Frank Herbert").unwrap();
        let book = library.add_book(author.id, "Dune", None).unwrap();

        let downloads_dir = TempDir::new().unwrap();
        let library_dir = TempDir::new().unwrap();
        library
            .add_root_folder(&library_dir.path().to_string_lossy(), MediaKind::Book)
            .unwrap();

        let job_dir = downloads_dir.path().join("Dune.by.Frank.Herbert.epub");
        tokio::fs::create_dir(&job_dir).await.unwrap();
        tokio::fs::write(job_dir.join("dune.epub"), vec![0u8; 256])
            .await
            .unwrap();

        let download = Download {
            id: 1,
            external_id: None,
            client_id: "sab".to_string(),
            indexer_id: None,
            indexer_name: None,
            title: "Dune by Frank Herbert epub".to_string(),
            size_bytes: 0,
            download_url: String::new(),
            guid: "g".to_string(),
            output_path: Some(job_dir.to_string_lossy().into_owned()),
            status: DownloadStatus::Importing,
            progress: 100.0,
            started_at: Utc::now(),
            completed_at: Some(Utc::now()),
            error_message: None,
            target: DownloadTarget::Book { book_id: book.id },
        };

        let importer = BookImporter::new(Arc::clone(&library) as Arc<dyn LibraryStore>);
        let result = importer.import(&download).await;
        assert!(result.success, "errors: {:?}", result.errors);

        assert!(library_dir.path().join("Frank Herbert/Dune.epub").exists());
        assert!(library.get_book(book.id).unwrap().unwrap().has_file);
    }
}
