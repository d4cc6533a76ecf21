//! Single-file transfer with a size-based completeness check.
//!
//! A file whose local copy already has the advertised size is skipped.
//! Anything else is downloaded again from byte zero; there is no range resume.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::File;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::client::{HttpClient, stream_to_file};
use super::error::DownloadError;
use super::ledger::LedgerHandle;

/// Result of a successful transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The body was written to `path`.
    Downloaded {
        /// Local file path.
        path: PathBuf,
        /// Bytes written.
        bytes: u64,
    },
    /// A local copy with the expected size already existed.
    Skipped {
        /// Local file path.
        path: PathBuf,
        /// Size of the existing copy.
        bytes: u64,
    },
}

impl TransferOutcome {
    /// Local path of the transferred file.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Downloaded { path, .. } | Self::Skipped { path, .. } => path,
        }
    }
}

/// One file transfer, as driven by the batch engine.
#[async_trait]
pub trait Transfer: Send + Sync {
    /// Transfers the file at `relative_path`.
    ///
    /// # Errors
    ///
    /// Returns any transport, status, local IO, integrity or cancellation error.
    async fn transfer(
        &self,
        relative_path: &str,
        cancel: &CancellationToken,
    ) -> Result<TransferOutcome, DownloadError>;
}

/// Downloads files from the server into a local save directory.
#[derive(Debug, Clone)]
pub struct FileTransfer {
    client: HttpClient,
    save_dir: PathBuf,
    ledger: LedgerHandle,
}

impl FileTransfer {
    /// Creates a transfer that mirrors server paths under `save_dir` and
    /// reports completed files to `ledger`.
    pub fn new(client: HttpClient, save_dir: impl Into<PathBuf>, ledger: LedgerHandle) -> Self {
        Self {
            client,
            save_dir: save_dir.into(),
            ledger,
        }
    }

    /// The local directory that mirrors the server root.
    #[must_use]
    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    /// Maps a server-relative path onto the save directory.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::UnsafePath`] for empty paths and for paths
    /// containing `..`, a root or a drive prefix.
    pub fn local_path(&self, relative_path: &str) -> Result<PathBuf, DownloadError> {
        let mut local = self.save_dir.clone();
        let mut has_name = false;
        for component in Path::new(relative_path).components() {
            match component {
                Component::Normal(segment) => {
                    local.push(segment);
                    has_name = true;
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(DownloadError::unsafe_path(relative_path));
                }
            }
        }
        if has_name {
            Ok(local)
        } else {
            Err(DownloadError::unsafe_path(relative_path))
        }
    }
}

#[async_trait]
impl Transfer for FileTransfer {
    #[instrument(skip(self, cancel))]
    async fn transfer(
        &self,
        relative_path: &str,
        cancel: &CancellationToken,
    ) -> Result<TransferOutcome, DownloadError> {
        let local_path = self.local_path(relative_path)?;
        let url = self.client.download_url(relative_path);

        let response = self.client.fetch_file(relative_path, cancel).await?;

        let expected = response.content_length().filter(|&len| len > 0);
        match expected {
            Some(len) => info!(path = relative_path, size = len, "starting download"),
            None => warn!(
                path = relative_path,
                "server did not report a size, downloading without a size check"
            ),
        }

        if let Some(parent) = local_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DownloadError::io(parent, e))?;
        }

        if let Some(len) = expected
            && let Ok(metadata) = tokio::fs::metadata(&local_path).await
            && metadata.is_file()
            && metadata.len() == len
        {
            info!(path = relative_path, size = len, "local copy complete, skipping");
            return Ok(TransferOutcome::Skipped {
                path: local_path,
                bytes: len,
            });
        }

        let file = File::create(&local_path)
            .await
            .map_err(|e| DownloadError::io(&local_path, e))?;
        let written = match stream_to_file(file, response, &url, &local_path, cancel).await {
            Ok(written) => written,
            // A body that breaks off before the advertised size is a short file.
            Err(error @ DownloadError::Network { .. }) => match expected {
                Some(len) => {
                    let actual = tokio::fs::metadata(&local_path)
                        .await
                        .map_or(0, |metadata| metadata.len());
                    warn!(
                        path = relative_path,
                        expected = len,
                        actual,
                        error = %error,
                        "body ended early, leaving partial file in place"
                    );
                    return Err(DownloadError::integrity(&local_path, len, actual));
                }
                None => return Err(error),
            },
            Err(error) => return Err(error),
        };

        if let Some(len) = expected
            && written != len
        {
            warn!(
                path = relative_path,
                expected = len,
                actual = written,
                "size mismatch, leaving partial file in place"
            );
            return Err(DownloadError::integrity(&local_path, len, written));
        }

        self.ledger
            .record(relative_path, i64::try_from(written).unwrap_or(i64::MAX))
            .await;
        debug!(path = %local_path.display(), bytes = written, "ledger updated");
        info!(path = %local_path.display(), bytes = written, "download complete");

        Ok(TransferOutcome::Downloaded {
            path: local_path,
            bytes: written,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;
    use url::Url;

    use super::*;
    use crate::download::ledger::LedgerStore;

    fn transfer_into(save_dir: &Path) -> FileTransfer {
        let client = HttpClient::new(&Url::parse("http://127.0.0.1:9").unwrap()).unwrap();
        let (ledger, _task) = LedgerHandle::spawn(LedgerStore::new(save_dir.join("state.json")));
        FileTransfer::new(client, save_dir, ledger)
    }

    #[tokio::test]
    async fn test_local_path_mirrors_relative_directories() {
        let temp = TempDir::new().unwrap();
        let transfer = transfer_into(temp.path());
        assert_eq!(
            transfer.local_path("b/c.txt").unwrap(),
            temp.path().join("b").join("c.txt")
        );
        assert_eq!(
            transfer.local_path("./a.txt").unwrap(),
            temp.path().join("a.txt")
        );
    }

    #[tokio::test]
    async fn test_local_path_rejects_escapes() {
        let temp = TempDir::new().unwrap();
        let transfer = transfer_into(temp.path());
        for bad in ["../x", "a/../../x", "/etc/passwd", "", "."] {
            assert!(
                matches!(
                    transfer.local_path(bad),
                    Err(DownloadError::UnsafePath { .. })
                ),
                "expected {bad:?} to be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_unsafe_path_fails_before_any_request() {
        let temp = TempDir::new().unwrap();
        let transfer = transfer_into(temp.path());
        let result = transfer
            .transfer("../escape.txt", &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(DownloadError::UnsafePath { .. })));
    }

    #[test]
    fn test_outcome_path() {
        let outcome = TransferOutcome::Skipped {
            path: PathBuf::from("/tmp/a"),
            bytes: 1,
        };
        assert_eq!(outcome.path(), Path::new("/tmp/a"));
    }
}
