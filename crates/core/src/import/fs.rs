//! Filesystem helpers shared by the importers.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs;

use super::error::ImportError;

/// Accessibility probes abort after this long; the target may be a mounted
/// network share that is down.
pub const PATH_CHECK_TIMEOUT: Duration = Duration::from_secs(3);

/// Video container extensions recognized by the movie/episode importers.
pub const VIDEO_EXTS: &[&str] = &["mkv", "mp4", "avi", "m4v", "ts", "webm"];

/// Audio extensions recognized by the album importer.
pub const AUDIO_EXTS: &[&str] = &["flac", "mp3", "m4a", "ogg", "opus", "wav"];

/// Book extensions recognized by the book importer.
pub const BOOK_EXTS: &[&str] = &["epub", "mobi", "azw3", "pdf"];

/// Check that a path answers a metadata probe within [`PATH_CHECK_TIMEOUT`].
pub async fn check_path_accessible(path: &Path) -> Result<(), ImportError> {
    let probe = fs::metadata(path);
    match tokio::time::timeout(PATH_CHECK_TIMEOUT, probe).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(ImportError::PathUnavailable(format!(
            "{} ({})",
            path.display(),
            e
        ))),
        Err(_) => Err(ImportError::PathUnavailable(path.display().to_string())),
    }
}

/// Collect files with one of the given extensions under `path`. A matching
/// single file is returned as-is; directories are walked to a bounded depth.
pub async fn collect_files(path: &Path, exts: &[&str]) -> Result<Vec<PathBuf>, ImportError> {
    let meta = fs::metadata(path).await?;
    if meta.is_file() {
        return Ok(if has_extension(path, exts) {
            vec![path.to_path_buf()]
        } else {
            Vec::new()
        });
    }

    let mut found = Vec::new();
    // (dir, depth); releases nest at most a couple of levels.
    let mut pending = vec![(path.to_path_buf(), 0usize)];
    while let Some((dir, depth)) = pending.pop() {
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let entry_path = entry.path();
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                if depth < 3 {
                    pending.push((entry_path, depth + 1));
                }
            } else if has_extension(&entry_path, exts) {
                found.push(entry_path);
            }
        }
    }
    found.sort();
    Ok(found)
}

fn has_extension(path: &Path, exts: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| exts.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Largest file among candidates: the main file of a release, samples and
/// extras lose.
pub async fn largest_file(files: &[PathBuf]) -> Result<Option<PathBuf>, ImportError> {
    let mut best: Option<(u64, &PathBuf)> = None;
    for file in files {
        let size = fs::metadata(file).await?.len();
        if best.map(|(s, _)| size > s).unwrap_or(true) {
            best = Some((size, file));
        }
    }
    Ok(best.map(|(_, f)| f.clone()))
}

/// Move a file into the library, creating parent directories.
///
/// Tries an atomic rename first; cross-filesystem moves fall back to
/// copy-then-delete. A failed copy removes the partial destination so the
/// source stays authoritative.
pub async fn move_file(source: &Path, destination: &Path) -> Result<u64, ImportError> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).await?;
    }

    let source_size = fs::metadata(source).await?.len();

    match fs::rename(source, destination).await {
        Ok(()) => return Ok(source_size),
        Err(e) => {
            // Cross-filesystem moves fail with EXDEV (18 on Linux).
            let crosses_devices = e.kind() == std::io::ErrorKind::CrossesDevices
                || e.raw_os_error() == Some(18);
            if !crosses_devices {
                return Err(e.into());
            }
        }
    }

    match fs::copy(source, destination).await {
        Ok(copied) if copied == source_size => {
            fs::remove_file(source).await?;
            Ok(copied)
        }
        Ok(_) => {
            let _ = fs::remove_file(destination).await;
            Err(ImportError::Io(std::io::Error::other(format!(
                "partial copy of {}",
                source.display()
            ))))
        }
        Err(e) => {
            let _ = fs::remove_file(destination).await;
            Err(e.into())
        }
    }
}

/// Strip characters that are unsafe in library file names.
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect();
    cleaned.trim().trim_matches('.').trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_check_path_accessible_missing_path() {
        let err = check_path_accessible(Path::new("/no/such/path/anywhere"))
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Download path not responding:"));
    }

    #[tokio::test]
    async fn test_collect_files_walks_subdirectories() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("Sub");
        tokio::fs::create_dir(&sub).await.unwrap();
        tokio::fs::write(dir.path().join("movie.mkv"), b"x").await.unwrap();
        tokio::fs::write(sub.join("extra.mp4"), b"x").await.unwrap();
        tokio::fs::write(dir.path().join("notes.txt"), b"x").await.unwrap();

        let files = collect_files(dir.path(), VIDEO_EXTS).await.unwrap();
        assert_eq!(files.len(), 2);
    }

    #[tokio::test]
    async fn test_collect_files_single_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("book.epub");
        tokio::fs::write(&file, b"x").await.unwrap();

        let files = collect_files(&file, BOOK_EXTS).await.unwrap();
        assert_eq!(files, vec![file.clone()]);
        assert!(collect_files(&file, VIDEO_EXTS).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_move_file_creates_parents_and_moves() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source.mkv");
        tokio::fs::write(&source, b"content").await.unwrap();
        let dest = dir.path().join("Library/Title (1999)/Title (1999).mkv");

        let moved = move_file(&source, &dest).await.unwrap();
        assert_eq!(moved, 7);
        assert!(!source.exists());
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"content");
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Who? Me: Never*"), "Who Me Never");
        assert_eq!(sanitize_name("Trailing dots..."), "Trailing dots");
        assert_eq!(sanitize_name("AC/DC"), "ACDC");
    }
}
