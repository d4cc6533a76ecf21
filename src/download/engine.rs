//! Batch engine that mirrors a server directory with a fixed worker pool.
//!
//! The engine lists the directory once, loads every record into a closed
//! queue and starts exactly `concurrency` workers that drain it. Each worker
//! runs one [`Transfer`] at a time.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use fileshare_core::download::{
//!     BatchDownloader, FileTransfer, HttpClient, LedgerHandle, LedgerStore,
//! };
//! use tokio_util::sync::CancellationToken;
//! use url::Url;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new(&Url::parse("http://localhost:8080")?)?;
//! let (ledger, ledger_task) = LedgerHandle::spawn(LedgerStore::new(".download_state.json"));
//! let transfer = Arc::new(FileTransfer::new(client.clone(), "./mirror", ledger));
//!
//! let engine = BatchDownloader::new(5)?;
//! let outcome = engine
//!     .download_directory(&client, "docs", transfer, &CancellationToken::new())
//!     .await?;
//! println!("{outcome:?}");
//! ledger_task.await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::constants::{MAX_CONCURRENCY, MIN_CONCURRENCY};
use super::transfer::{Transfer, TransferOutcome};
use super::{DownloadError, HttpClient};
use crate::protocol::FileRecord;

/// Error type for batch operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// The directory listing could not be fetched.
    #[error("listing failed: {0}")]
    Listing(#[from] DownloadError),
}

/// How a batch ended.
///
/// Per-file failures are logged by the workers and are not reported here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// The listing had no files; no workers were started.
    Empty,
    /// Every queued file was handed to a worker.
    Finished {
        /// Files in the listing.
        listed: usize,
        /// Files handed to a transfer.
        dispatched: usize,
    },
    /// Cancellation stopped the batch early.
    Cancelled {
        /// Files in the listing.
        listed: usize,
        /// Files handed to a transfer before cancellation.
        dispatched: usize,
    },
}

type SharedQueue = Arc<Mutex<mpsc::Receiver<FileRecord>>>;

/// Downloads a whole directory with a fixed number of workers.
#[derive(Debug, Clone, Copy)]
pub struct BatchDownloader {
    concurrency: usize,
}

impl BatchDownloader {
    /// Creates an engine that runs `concurrency` workers per batch.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConcurrency`] if the value is outside
    /// the valid range (1-100).
    ///
    /// # Example
    ///
    /// ```
    /// use fileshare_core::download::BatchDownloader;
    ///
    /// let engine = BatchDownloader::new(4).unwrap();
    /// assert_eq!(engine.concurrency(), 4);
    /// ```
    #[instrument(level = "debug")]
    pub fn new(concurrency: usize) -> Result<Self, EngineError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(EngineError::InvalidConcurrency { value: concurrency });
        }
        Ok(Self { concurrency })
    }

    /// Returns the configured worker count.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Lists `dir` on the server and transfers every file in it.
    ///
    /// A cancelled listing is reported as [`BatchOutcome::Cancelled`] rather
    /// than an error.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Listing`] if the listing request fails. Failures
    /// of individual files never surface here.
    #[instrument(skip(self, client, transfer, cancel))]
    pub async fn download_directory(
        &self,
        client: &HttpClient,
        dir: &str,
        transfer: Arc<dyn Transfer>,
        cancel: &CancellationToken,
    ) -> Result<BatchOutcome, EngineError> {
        let files = match client.list_directory(dir, cancel).await {
            Ok(files) => files,
            Err(error) if error.is_cancelled() => {
                info!("batch cancelled during listing");
                return Ok(BatchOutcome::Cancelled {
                    listed: 0,
                    dispatched: 0,
                });
            }
            Err(error) => return Err(error.into()),
        };

        if files.is_empty() {
            info!("no files found, directory is empty or missing");
            return Ok(BatchOutcome::Empty);
        }

        Ok(self.run(files, transfer, cancel).await)
    }

    /// Transfers `files` using exactly [`concurrency`](Self::concurrency) workers.
    pub async fn run(
        &self,
        files: Vec<FileRecord>,
        transfer: Arc<dyn Transfer>,
        cancel: &CancellationToken,
    ) -> BatchOutcome {
        let listed = files.len();
        if listed == 0 {
            return BatchOutcome::Empty;
        }

        // Fill and close the queue before any worker starts.
        let (tx, rx) = mpsc::channel(listed);
        for record in files {
            if tx.try_send(record).is_err() {
                break;
            }
        }
        drop(tx);

        let queue: SharedQueue = Arc::new(Mutex::new(rx));
        let dispatched = Arc::new(AtomicUsize::new(0));

        info!(files = listed, workers = self.concurrency, "starting batch");

        let mut handles = Vec::with_capacity(self.concurrency);
        for worker_id in 0..self.concurrency {
            handles.push(tokio::spawn(worker(
                worker_id,
                Arc::clone(&queue),
                Arc::clone(&transfer),
                Arc::clone(&dispatched),
                cancel.clone(),
            )));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "download worker panicked");
            }
        }

        let dispatched = dispatched.load(Ordering::SeqCst);
        if cancel.is_cancelled() {
            info!(listed, dispatched, "batch cancelled");
            BatchOutcome::Cancelled { listed, dispatched }
        } else {
            info!(listed, dispatched, "batch complete");
            BatchOutcome::Finished { listed, dispatched }
        }
    }
}

async fn worker(
    worker_id: usize,
    queue: SharedQueue,
    transfer: Arc<dyn Transfer>,
    dispatched: Arc<AtomicUsize>,
    cancel: CancellationToken,
) {
    loop {
        if cancel.is_cancelled() {
            debug!(worker_id, "worker stopping on cancellation");
            break;
        }
        // The sender is gone, so recv only waits on the lock and returns None once drained.
        let next = queue.lock().await.recv().await;
        let Some(record) = next else {
            break;
        };
        dispatched.fetch_add(1, Ordering::SeqCst);

        match transfer.transfer(&record.path, &cancel).await {
            Ok(TransferOutcome::Downloaded { bytes, .. }) => {
                debug!(worker_id, path = %record.path, bytes, "file downloaded");
            }
            Ok(TransferOutcome::Skipped { .. }) => {
                debug!(worker_id, path = %record.path, "file already complete");
            }
            Err(error) if error.is_cancelled() => {
                debug!(worker_id, path = %record.path, "transfer cancelled");
            }
            Err(error) => {
                warn!(worker_id, path = %record.path, error = %error, "download failed");
            }
        }
    }
}
