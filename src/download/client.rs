//! HTTP client wrapper for the fileshare protocol.
//!
//! This module provides the `HttpClient` struct which builds `/list` and
//! `/download` URLs, checks response status and streams bodies to disk.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use url::Url;

use super::constants::CONNECT_TIMEOUT_SECS;
use super::error::DownloadError;
use crate::protocol::{ErrorBody, FileRecord, ListingResponse};

/// HTTP client bound to one fileshare server.
///
/// This client is designed to be created once and shared by every worker of
/// a batch, taking advantage of connection pooling. Cloning is cheap.
///
/// # Example
///
/// ```no_run
/// use fileshare_core::download::HttpClient;
/// use tokio_util::sync::CancellationToken;
/// use url::Url;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new(&Url::parse("http://localhost:8080")?)?;
/// let files = client.list_directory("docs", &CancellationToken::new()).await?;
/// println!("{} files", files.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    /// Creates a client for the server at `base_url`.
    ///
    /// Only the connect phase is bounded by a timeout; body transfers of
    /// large files are allowed to take as long as they need.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::ClientBuild`] if the underlying client cannot be built.
    pub fn new(base_url: &Url) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| DownloadError::ClientBuild { source })?;
        Ok(Self {
            client,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
        })
    }

    /// The server base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of the listing for `dir`.
    #[must_use]
    pub fn list_url(&self, dir: &str) -> String {
        self.endpoint("list", dir)
    }

    /// URL of the file at `path`.
    #[must_use]
    pub fn download_url(&self, path: &str) -> String {
        self.endpoint("download", path)
    }

    /// The whole relative path is encoded as one segment, so `/` travels as `%2F`.
    fn endpoint(&self, kind: &str, relative: &str) -> String {
        format!(
            "{}/{kind}/{}",
            self.base_url,
            urlencoding::encode(relative)
        )
    }

    /// Fetches the recursive listing of `dir` from the server.
    ///
    /// # Errors
    ///
    /// Returns a transport, status or decode error; no partial listing is returned.
    #[instrument(skip(self, cancel))]
    pub async fn list_directory(
        &self,
        dir: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<FileRecord>, DownloadError> {
        let url = self.list_url(dir);
        let response = self.get(&url, cancel).await?;

        let listing = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(DownloadError::cancelled(&url)),
            body = response.json::<ListingResponse>() => {
                body.map_err(|e| DownloadError::decode(&url, e))?
            }
        };
        debug!(count = listing.files.len(), "listing received");
        Ok(listing.files)
    }

    /// Issues a GET for the file at `path` and returns the successful response.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::HttpStatus`] for non-2xx responses, a network
    /// error if the request fails, or [`DownloadError::Cancelled`].
    #[instrument(skip(self, cancel))]
    pub async fn fetch_file(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<reqwest::Response, DownloadError> {
        let url = self.download_url(path);
        self.get(&url, cancel).await
    }

    async fn get(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<reqwest::Response, DownloadError> {
        let parsed = Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(DownloadError::cancelled(url)),
            result = self.client.get(parsed).send() => {
                result.map_err(|e| DownloadError::network(url, e))?
            }
        };

        let status = response.status();
        if !status.is_success() {
            let message = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(DownloadError::cancelled(url)),
                body = response.json::<ErrorBody>() => body.ok().map(|body| body.error),
            };
            return Err(DownloadError::http_status(url, status.as_u16(), message));
        }
        Ok(response)
    }
}

/// Streams a response body into `file`, returning the number of bytes written.
///
/// Bytes received before a failure or cancellation are flushed and left in the
/// file.
pub(crate) async fn stream_to_file(
    file: File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
    cancel: &CancellationToken,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    let outcome = loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => break Err(DownloadError::cancelled(url)),
            next = stream.next() => next,
        };
        let Some(chunk_result) = next else {
            break Ok(());
        };
        let chunk = match chunk_result {
            Ok(chunk) => chunk,
            Err(e) => break Err(DownloadError::network(url, e)),
        };
        if let Err(e) = writer.write_all(&chunk).await {
            break Err(DownloadError::io(file_path, e));
        }
        bytes_written += chunk.len() as u64;
    };

    // Flush even on failure so the partial file reflects what was received.
    let flushed = writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path, e));

    match outcome {
        Ok(()) => flushed.map(|()| bytes_written),
        Err(error) => {
            debug!(bytes_written, error = %error, "body stream ended early");
            Err(error)
        }
    }
}
