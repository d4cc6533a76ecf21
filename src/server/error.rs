//! JSON error responses for the file server.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::warn;

use super::listing::ListingError;
use super::path::PathError;
use crate::protocol::ErrorBody;

/// Error returned by request handlers, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub(crate) fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// HTTP status of this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Client-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<PathError> for ApiError {
    fn from(error: PathError) -> Self {
        match error {
            PathError::InvalidEncoding { .. } => Self::bad_request("invalid path"),
            PathError::AccessDenied { .. } => Self::forbidden("access denied"),
            PathError::InvalidRoot { .. } => Self::internal(error.to_string()),
        }
    }
}

impl From<ListingError> for ApiError {
    fn from(error: ListingError) -> Self {
        match error {
            ListingError::NotFound { .. } => Self::not_found("directory not found"),
            ListingError::NotADirectory { .. } => Self::bad_request("not a directory"),
            ListingError::Walk { .. }
            | ListingError::OutsideRoot { .. }
            | ListingError::Task(_) => Self::internal(error.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(status = self.status.as_u16(), error = %self.message, "request failed");
        }
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_path_errors_map_to_status() {
        let denied = ApiError::from(PathError::AccessDenied {
            path: "../x".to_string(),
        });
        assert_eq!(denied.status(), StatusCode::FORBIDDEN);

        let encoding = ApiError::from(PathError::InvalidEncoding {
            raw: "%FF".to_string(),
        });
        assert_eq!(encoding.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_listing_errors_map_to_status() {
        let missing = ApiError::from(ListingError::NotFound {
            path: PathBuf::from("/srv/missing"),
        });
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(missing.message(), "directory not found");

        let file = ApiError::from(ListingError::NotADirectory {
            path: PathBuf::from("/srv/file"),
        });
        assert_eq!(file.status(), StatusCode::BAD_REQUEST);

        let stray = ApiError::from(ListingError::OutsideRoot {
            path: PathBuf::from("/elsewhere/x"),
        });
        assert_eq!(stray.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_into_response_renders_error_body() {
        let response = ApiError::not_found("file not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error, "file not found");
    }
}
