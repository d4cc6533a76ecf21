//! Client side of the file share: listing, single-file transfers and batches.
//!
//! # Features
//!
//! - Streaming downloads (memory-efficient for large files)
//! - Size-based skip of files that are already complete locally
//! - A persisted ledger of completed transfers, owned by a single task
//! - A fixed-size worker pool for whole-directory mirrors
//! - Cancellation of in-flight requests and body copies
//!
//! # Example
//!
//! ```no_run
//! use fileshare_core::download::{FileTransfer, HttpClient, LedgerHandle, LedgerStore, Transfer};
//! use tokio_util::sync::CancellationToken;
//! use url::Url;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new(&Url::parse("http://localhost:8080")?)?;
//! let (ledger, ledger_task) = LedgerHandle::spawn(LedgerStore::new(".download_state.json"));
//! let transfer = FileTransfer::new(client, "./downloads", ledger);
//! let outcome = transfer.transfer("docs/a.txt", &CancellationToken::new()).await?;
//! println!("Saved: {}", outcome.path().display());
//! drop(transfer);
//! ledger_task.await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod engine;
mod error;
mod ledger;
mod transfer;

pub use client::HttpClient;
pub use constants::{DEFAULT_CONCURRENCY, MAX_CONCURRENCY, MIN_CONCURRENCY};
pub use engine::{BatchDownloader, BatchOutcome, EngineError};
pub use error::DownloadError;
pub use ledger::{LedgerHandle, LedgerStore, TransferLedger};
pub use transfer::{FileTransfer, Transfer, TransferOutcome};

// Use `Result<T, DownloadError>` explicitly in signatures; no module-local Result alias.
