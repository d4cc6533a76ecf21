//! Fileshare Core Library
//!
//! This library provides both halves of the fileshare tool: an HTTP server
//! that exposes a directory tree read-only, and a client that lists and
//! mirrors that tree with a bounded pool of concurrent workers.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`config`] - Explicit server and client configuration
//! - [`protocol`] - Wire types shared by server and client
//! - [`server`] - Path containment, directory listing and file serving
//! - [`download`] - HTTP client, transfer ledger, single-file transfer and batch engine

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod download;
pub mod protocol;
pub mod server;

// Re-export commonly used types
pub use config::{ClientConfig, ConfigError, ServerConfig};
pub use download::{
    BatchDownloader, BatchOutcome, DEFAULT_CONCURRENCY, DownloadError, EngineError, FileTransfer,
    HttpClient, LedgerHandle, LedgerStore, Transfer, TransferLedger, TransferOutcome,
};
pub use protocol::{ErrorBody, FileRecord, ListingResponse};
pub use server::{FileServer, PathError, PathResolver};
