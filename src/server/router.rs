//! Router assembly and the listening loop.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::handlers::{DOWNLOAD_PREFIX, LIST_PREFIX, ServerState, download_file, list_directory};
use super::path::PathResolver;
use crate::config::ServerConfig;

/// HTTP file server exposing `/list` and `/download` under a fixed root.
#[derive(Debug, Clone)]
pub struct FileServer {
    router: Router,
}

impl FileServer {
    /// Builds the server for the configured root.
    ///
    /// # Errors
    ///
    /// Returns an error if the root does not exist or is not a directory.
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let resolver = PathResolver::new(&config.root)?;
        Ok(Self::with_resolver(resolver))
    }

    /// Builds the server around an existing resolver.
    #[must_use]
    pub fn with_resolver(resolver: PathResolver) -> Self {
        let state = Arc::new(ServerState::new(resolver));
        Self {
            router: build_router(state),
        }
    }

    /// The underlying router, for embedding or in-process requests.
    #[must_use]
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Binds `addr` and serves until `shutdown` is cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails to bind or the server terminates unexpectedly.
    pub async fn serve(self, addr: SocketAddr, shutdown: CancellationToken) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;
        self.serve_with_listener(listener, shutdown).await
    }

    /// Serves on an already-bound listener until `shutdown` is cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error if the server terminates unexpectedly.
    pub async fn serve_with_listener(
        self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> Result<()> {
        info!(addr = %listener.local_addr()?, "file server listening");
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await?;
        info!("file server stopped");
        Ok(())
    }
}

fn build_router(state: Arc<ServerState>) -> Router {
    let list_tail = format!("{LIST_PREFIX}/{{*path}}");
    let download_tail = format!("{DOWNLOAD_PREFIX}/{{*path}}");
    Router::new()
        .route(LIST_PREFIX, get(list_directory))
        .route(&format!("{LIST_PREFIX}/"), get(list_directory))
        .route(&list_tail, get(list_directory))
        .route(DOWNLOAD_PREFIX, get(download_file))
        .route(&format!("{DOWNLOAD_PREFIX}/"), get(download_file))
        .route(&download_tail, get(download_file))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
