//! `/list` and `/download` request handlers.
//!
//! Both handlers read the still-encoded path straight from the request URI so
//! that [`PathResolver`] performs the one and only percent-decoding step.

use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{HeaderValue, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;
use tracing::{debug, instrument};

use super::error::ApiError;
use super::listing::list_files;
use super::path::PathResolver;
use crate::protocol::ListingResponse;

/// Shared, read-only server state.
#[derive(Debug)]
pub struct ServerState {
    pub(crate) resolver: PathResolver,
}

impl ServerState {
    /// Wraps a resolver for use by the router.
    #[must_use]
    pub fn new(resolver: PathResolver) -> Self {
        Self { resolver }
    }
}

pub(crate) const LIST_PREFIX: &str = "/list";
pub(crate) const DOWNLOAD_PREFIX: &str = "/download";

/// Extracts the encoded path that follows `prefix` and its single separator.
fn encoded_tail<'a>(uri: &'a Uri, prefix: &str) -> &'a str {
    let rest = uri.path().strip_prefix(prefix).unwrap_or_default();
    rest.strip_prefix('/').unwrap_or(rest)
}

#[instrument(skip(state), fields(path = %uri.path()))]
pub(crate) async fn list_directory(
    State(state): State<Arc<ServerState>>,
    uri: Uri,
) -> Result<Json<ListingResponse>, ApiError> {
    let dir = state.resolver.resolve(encoded_tail(&uri, LIST_PREFIX))?;
    let files = list_files(&state.resolver, &dir).await?;
    Ok(Json(ListingResponse { files }))
}

#[instrument(skip(state), fields(path = %uri.path()))]
pub(crate) async fn download_file(
    State(state): State<Arc<ServerState>>,
    uri: Uri,
) -> Result<Response, ApiError> {
    let target = state.resolver.resolve(encoded_tail(&uri, DOWNLOAD_PREFIX))?;

    let metadata = tokio::fs::metadata(&target)
        .await
        .map_err(|_| ApiError::not_found("file not found"))?;
    if metadata.is_dir() {
        return Err(ApiError::bad_request(
            "cannot download a directory, use the /list endpoint",
        ));
    }

    let file = tokio::fs::File::open(&target)
        .await
        .map_err(|e| open_failure(&e))?;
    let size = metadata.len();
    debug!(target = %target.display(), size, "serving file");

    // Content-Length is pinned to the stat size so a short read shows up as a
    // truncated body on the client.
    let mut response = (StatusCode::OK, Body::from_stream(ReaderStream::new(file))).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    Ok(response)
}

/// Maps a failed open of a file that was just stat'ed.
fn open_failure(error: &std::io::Error) -> ApiError {
    match error.kind() {
        std::io::ErrorKind::NotFound => ApiError::not_found("file not found"),
        std::io::ErrorKind::PermissionDenied => ApiError::forbidden("access denied"),
        _ => ApiError::internal(format!("failed to open file: {error}")),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn test_open_failure_keeps_io_errors_distinct_from_missing_files() {
        let gone = open_failure(&io::Error::from(io::ErrorKind::NotFound));
        assert_eq!(gone.status(), StatusCode::NOT_FOUND);

        let denied = open_failure(&io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(denied.status(), StatusCode::FORBIDDEN);

        let broken = open_failure(&io::Error::other("disk on fire"));
        assert_eq!(broken.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(broken.message().contains("disk on fire"));
    }

    #[test]
    fn test_encoded_tail_strips_prefix_and_one_separator() {
        let uri: Uri = "/download/docs%2Fa.txt".parse().unwrap();
        assert_eq!(encoded_tail(&uri, DOWNLOAD_PREFIX), "docs%2Fa.txt");

        let uri: Uri = "/list".parse().unwrap();
        assert_eq!(encoded_tail(&uri, LIST_PREFIX), "");

        let uri: Uri = "/list/".parse().unwrap();
        assert_eq!(encoded_tail(&uri, LIST_PREFIX), "");

        let uri: Uri = "/list//etc".parse().unwrap();
        assert_eq!(encoded_tail(&uri, LIST_PREFIX), "/etc");
    }
}
