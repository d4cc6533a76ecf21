//! Error types for the download module.
//!
//! This module defines structured errors for listing and transfer operations,
//! providing context-rich error messages for debugging and user feedback.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while listing or transferring files.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    ClientBuild {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },

    /// The request URL could not be built from the base URL and path.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// Network-level error (DNS resolution, connection refused, broken body stream, etc.)
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-2xx status.
    #[error("HTTP {status} fetching {url}{}", message_suffix(.message))]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// The server's `error` message, when the body carried one.
        message: Option<String>,
    },

    /// A listing response body was not valid JSON.
    #[error("invalid listing response from {url}: {source}")]
    Decode {
        /// The listing URL.
        url: String,
        /// The underlying decode error.
        #[source]
        source: reqwest::Error,
    },

    /// A server-supplied relative path would land outside the save directory.
    #[error("refusing unsafe relative path: {path}")]
    UnsafePath {
        /// The rejected relative path.
        path: String,
    },

    /// File system error during download (create directory, create file, write, etc.)
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Written byte count does not match the advertised content length.
    #[error(
        "integrity check failed for {path}: expected {expected_bytes} bytes, got {actual_bytes}"
    )]
    Integrity {
        /// Local file that failed verification.
        path: PathBuf,
        /// Expected size in bytes.
        expected_bytes: u64,
        /// Actual size in bytes.
        actual_bytes: u64,
    },

    /// The operation was cancelled before it finished.
    #[error("cancelled while fetching {url}")]
    Cancelled {
        /// The URL being fetched.
        url: String,
    },
}

impl DownloadError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16, message: Option<String>) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            message,
        }
    }

    /// Creates a listing decode error.
    pub fn decode(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Decode {
            url: url.into(),
            source,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates an unsafe path error.
    pub fn unsafe_path(path: impl Into<String>) -> Self {
        Self::UnsafePath { path: path.into() }
    }

    /// Creates an integrity mismatch error.
    pub fn integrity(path: impl Into<PathBuf>, expected_bytes: u64, actual_bytes: u64) -> Self {
        Self::Integrity {
            path: path.into(),
            expected_bytes,
            actual_bytes,
        }
    }

    /// Creates a cancellation error.
    pub fn cancelled(url: impl Into<String>) -> Self {
        Self::Cancelled { url: url.into() }
    }

    /// Returns true if this error came from cancellation rather than a failure.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

fn message_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|message| format!(": {message}"))
        .unwrap_or_default()
}

// No From<reqwest::Error> or From<std::io::Error>: every variant needs the
// URL or path the source error lacks.

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_download_error_http_status_display() {
        let error = DownloadError::http_status("http://localhost:8080/download/a.txt", 404, None);
        let msg = error.to_string();
        assert!(msg.contains("404"), "Expected '404' in: {msg}");
        assert!(
            msg.contains("http://localhost:8080/download/a.txt"),
            "Expected URL in: {msg}"
        );
    }

    #[test]
    fn test_download_error_http_status_includes_server_message() {
        let error = DownloadError::http_status(
            "http://localhost:8080/list/x",
            400,
            Some("not a directory".to_string()),
        );
        let msg = error.to_string();
        assert!(msg.ends_with(": not a directory"), "Expected message in: {msg}");
    }

    #[test]
    fn test_download_error_io_display() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let error = DownloadError::io(PathBuf::from("/tmp/test.bin"), io_error);
        let msg = error.to_string();
        assert!(msg.contains("/tmp/test.bin"), "Expected path in: {msg}");
    }

    #[test]
    fn test_download_error_integrity_display() {
        let error = DownloadError::integrity("/tmp/out/a.bin", 100, 42);
        let msg = error.to_string();
        assert!(msg.contains("100"), "Expected expected size in: {msg}");
        assert!(msg.contains("42"), "Expected actual size in: {msg}");
    }

    #[test]
    fn test_download_error_unsafe_path_display() {
        let error = DownloadError::unsafe_path("../escape.txt");
        assert!(error.to_string().contains("../escape.txt"));
    }

    #[test]
    fn test_download_error_cancelled() {
        let error = DownloadError::cancelled("http://localhost:8080/download/a");
        assert!(error.is_cancelled());
        assert!(error.to_string().contains("cancelled"));
        assert!(!DownloadError::invalid_url("x").is_cancelled());
    }
}
