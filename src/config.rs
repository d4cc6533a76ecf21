//! Explicit server and client configuration.
//!
//! Both structs are built once at startup from command-line values and then
//! handed to the components that need them.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use thiserror::Error;
use url::Url;

use crate::download::{DEFAULT_CONCURRENCY, MAX_CONCURRENCY, MIN_CONCURRENCY};

/// Default server listen port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default server base URL used by the client.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080";

/// Default location of the transfer ledger file.
pub const DEFAULT_LEDGER_FILE: &str = ".download_state.json";

/// Errors raised while validating configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The server base URL is not a valid http(s) URL.
    #[error("invalid server URL {url}: must be an absolute http or https URL")]
    ServerUrl {
        /// The rejected value.
        url: String,
    },

    /// Worker concurrency is out of range.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    Concurrency {
        /// The rejected value.
        value: usize,
    },
}

/// Settings for the file server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to listen on.
    pub host: IpAddr,
    /// Port to listen on.
    pub port: u16,
    /// Directory whose contents are exposed.
    pub root: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            root: PathBuf::from("."),
        }
    }
}

impl ServerConfig {
    /// Creates a server configuration listening on all interfaces.
    pub fn new(port: u16, root: impl Into<PathBuf>) -> Self {
        Self {
            port,
            root: root.into(),
            ..Self::default()
        }
    }

    /// Overrides the listen address.
    #[must_use]
    pub fn with_host(mut self, host: IpAddr) -> Self {
        self.host = host;
        self
    }

    /// Socket address the server binds to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Settings for the download client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    server_url: Url,
    save_dir: PathBuf,
    concurrency: usize,
    ledger_path: PathBuf,
}

impl ClientConfig {
    /// Validates and builds a client configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ServerUrl`] if `server_url` is not an absolute
    /// http(s) URL and [`ConfigError::Concurrency`] if `concurrency` is out of range.
    pub fn new(
        server_url: &str,
        save_dir: impl Into<PathBuf>,
        concurrency: usize,
        ledger_path: impl Into<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let parsed = Url::parse(server_url).map_err(|_| ConfigError::ServerUrl {
            url: server_url.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.cannot_be_a_base() {
            return Err(ConfigError::ServerUrl {
                url: server_url.to_string(),
            });
        }
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(ConfigError::Concurrency { value: concurrency });
        }

        Ok(Self {
            server_url: parsed,
            save_dir: save_dir.into(),
            concurrency,
            ledger_path: ledger_path.into(),
        })
    }

    /// Base URL of the file server.
    #[must_use]
    pub fn server_url(&self) -> &Url {
        &self.server_url
    }

    /// Local directory that mirrors the server root.
    #[must_use]
    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    /// Number of batch workers.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Path of the persisted transfer ledger.
    #[must_use]
    pub fn ledger_path(&self) -> &Path {
        &self.ledger_path
    }
}
