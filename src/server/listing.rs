//! Recursive directory listing.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, instrument};
use walkdir::WalkDir;

use super::path::PathResolver;
use crate::protocol::FileRecord;

/// Errors produced while listing a directory.
#[derive(Debug, Error)]
pub enum ListingError {
    /// The requested directory does not exist.
    #[error("directory not found: {path}")]
    NotFound {
        /// The resolved directory path.
        path: PathBuf,
    },

    /// The requested path exists but is not a directory.
    #[error("not a directory: {path}")]
    NotADirectory {
        /// The resolved path.
        path: PathBuf,
    },

    /// The walk failed part way; no partial listing is returned.
    #[error("failed to walk {path}: {source}")]
    Walk {
        /// The directory being walked.
        path: PathBuf,
        /// The underlying walk error.
        #[source]
        source: walkdir::Error,
    },

    /// The walk produced an entry outside the shared root.
    #[error("entry outside the shared root: {path}")]
    OutsideRoot {
        /// The offending entry.
        path: PathBuf,
    },

    /// The blocking walk task did not complete.
    #[error("listing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Lists every non-directory entry under `dir`, with paths relative to the root.
///
/// Symbolic links are reported as entries and never followed.
///
/// # Errors
///
/// Returns [`ListingError::NotFound`] or [`ListingError::NotADirectory`] for
/// a bad target and [`ListingError::Walk`] if any entry cannot be read.
#[instrument(skip(resolver), fields(dir = %dir.display()))]
pub async fn list_files(resolver: &PathResolver, dir: &Path) -> Result<Vec<FileRecord>, ListingError> {
    let metadata = tokio::fs::metadata(dir)
        .await
        .map_err(|_| ListingError::NotFound {
            path: dir.to_path_buf(),
        })?;
    if !metadata.is_dir() {
        return Err(ListingError::NotADirectory {
            path: dir.to_path_buf(),
        });
    }

    let resolver = resolver.clone();
    let dir = dir.to_path_buf();
    let files = tokio::task::spawn_blocking(move || walk(&resolver, &dir)).await??;
    debug!(count = files.len(), "directory listed");
    Ok(files)
}

fn walk(resolver: &PathResolver, dir: &Path) -> Result<Vec<FileRecord>, ListingError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry.map_err(|source| ListingError::Walk {
            path: dir.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_dir() {
            continue;
        }
        let metadata = entry.metadata().map_err(|source| ListingError::Walk {
            path: dir.to_path_buf(),
            source,
        })?;
        let relative = resolver.relative_path(entry.path()).ok_or_else(|| {
            ListingError::OutsideRoot {
                path: entry.path().to_path_buf(),
            }
        })?;
        files.push(FileRecord::new(
            relative,
            i64::try_from(metadata.len()).unwrap_or(i64::MAX),
        ));
    }
    Ok(files)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PathResolver) {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a"), vec![0u8; 10]).unwrap();
        std::fs::create_dir(temp.path().join("b")).unwrap();
        std::fs::write(temp.path().join("b").join("c"), vec![1u8; 20]).unwrap();
        let resolver = PathResolver::new(temp.path()).unwrap();
        (temp, resolver)
    }

    fn sorted(mut files: Vec<FileRecord>) -> Vec<FileRecord> {
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }

    #[tokio::test]
    async fn test_list_root_returns_files_only() {
        let (_temp, resolver) = setup();
        let files = list_files(&resolver, resolver.root()).await.unwrap();
        assert_eq!(
            sorted(files),
            vec![FileRecord::new("a", 10), FileRecord::new("b/c", 20)]
        );
    }

    #[tokio::test]
    async fn test_list_subdirectory_keeps_root_relative_paths() {
        let (_temp, resolver) = setup();
        let dir = resolver.resolve("b").unwrap();
        let files = list_files(&resolver, &dir).await.unwrap();
        assert_eq!(files, vec![FileRecord::new("b/c", 20)]);
    }

    #[tokio::test]
    async fn test_list_empty_directory() {
        let (temp, resolver) = setup();
        std::fs::create_dir(temp.path().join("empty")).unwrap();
        let dir = resolver.resolve("empty").unwrap();
        let files = list_files(&resolver, &dir).await.unwrap();
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn test_list_missing_directory_is_not_found() {
        let (_temp, resolver) = setup();
        let dir = resolver.resolve("nonexistent").unwrap();
        let result = list_files(&resolver, &dir).await;
        assert!(matches!(result, Err(ListingError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_list_file_is_not_a_directory() {
        let (_temp, resolver) = setup();
        let file = resolver.resolve("a").unwrap();
        let result = list_files(&resolver, &file).await;
        assert!(matches!(result, Err(ListingError::NotADirectory { .. })));
    }

    #[test]
    fn test_walk_outside_root_fails_instead_of_dropping_entries() {
        let (_temp, resolver) = setup();
        let elsewhere = TempDir::new().unwrap();
        std::fs::write(elsewhere.path().join("stray"), b"x").unwrap();

        let result = walk(&resolver, elsewhere.path());
        assert!(matches!(result, Err(ListingError::OutsideRoot { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_list_does_not_follow_directory_symlinks() {
        let (temp, resolver) = setup();
        let outside = TempDir::new().unwrap();
        std::fs::write(outside.path().join("secret"), b"x").unwrap();
        std::os::unix::fs::symlink(outside.path(), temp.path().join("link")).unwrap();

        let files = list_files(&resolver, resolver.root()).await.unwrap();
        let paths: Vec<_> = sorted(files).into_iter().map(|f| f.path).collect();
        assert_eq!(paths, vec!["a", "b/c", "link"]);
    }
}
