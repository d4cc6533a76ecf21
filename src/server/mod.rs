//! Read-only HTTP file server.
//!
//! # Endpoints
//!
//! - `GET /list/{path}` - every file under a directory, with root-relative
//!   paths and sizes
//! - `GET /download/{path}` - a single file's bytes with an exact
//!   `Content-Length`
//!
//! Paths are percent-encoded relative paths. Anything resolving outside the
//! shared root is answered with 403.
//!
//! # Example
//!
//! ```no_run
//! use fileshare_core::{FileServer, ServerConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ServerConfig::new(8080, "./public");
//! let server = FileServer::new(&config)?;
//! server.serve(config.bind_addr(), CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod handlers;
mod listing;
mod path;
mod router;

pub use error::ApiError;
pub use handlers::ServerState;
pub use listing::{ListingError, list_files};
pub use path::{PathError, PathResolver};
pub use router::FileServer;
