//! Path containment for client-supplied paths.
//!
//! Every request path is percent-decoded exactly once, joined under the
//! server root with `.` and `..` folded lexically, and then checked to be a
//! descendant of the root. Existing targets are canonicalized and checked
//! again so a symlink cannot lead outside the root.

use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Error type for path resolution failures.
#[derive(Debug, Error)]
pub enum PathError {
    /// The request path is not valid percent-encoded UTF-8.
    #[error("invalid path encoding: {raw}")]
    InvalidEncoding {
        /// The raw, still-encoded request path.
        raw: String,
    },

    /// The resolved path lies outside the server root.
    #[error("access denied: {path} is outside the shared root")]
    AccessDenied {
        /// The decoded request path.
        path: String,
    },

    /// The configured root cannot be used.
    #[error("invalid root directory {path}: {source}")]
    InvalidRoot {
        /// The configured root.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Maps client-supplied relative paths onto the filesystem under a fixed root.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// Creates a resolver for `root`, canonicalizing it first.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::InvalidRoot`] if the root does not exist or is not
    /// a directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, PathError> {
        let root = root.as_ref();
        let canonical = std::fs::canonicalize(root).map_err(|source| PathError::InvalidRoot {
            path: root.to_path_buf(),
            source,
        })?;
        if !canonical.is_dir() {
            return Err(PathError::InvalidRoot {
                path: root.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotADirectory, "not a directory"),
            });
        }
        Ok(Self { root: canonical })
    }

    /// The canonical root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a percent-encoded relative path to an absolute path under the root.
    ///
    /// The returned path may not exist; callers stat it themselves.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::InvalidEncoding`] if decoding fails and
    /// [`PathError::AccessDenied`] if the path escapes the root, lexically or
    /// through a symlink.
    pub fn resolve(&self, encoded: &str) -> Result<PathBuf, PathError> {
        let decoded = urlencoding::decode(encoded).map_err(|_| PathError::InvalidEncoding {
            raw: encoded.to_string(),
        })?;

        let candidate = self.join_lexically(&decoded);
        if !candidate.starts_with(&self.root) {
            debug!(path = %decoded, "rejected path outside root");
            return Err(PathError::AccessDenied {
                path: decoded.into_owned(),
            });
        }

        match std::fs::canonicalize(&candidate) {
            Ok(real) if !real.starts_with(&self.root) => {
                debug!(path = %decoded, target = %real.display(), "rejected symlink outside root");
                Err(PathError::AccessDenied {
                    path: decoded.into_owned(),
                })
            }
            // Missing targets (and dangling links) are reported by the caller's stat.
            _ => Ok(candidate),
        }
    }

    /// Returns `path` relative to the root as a `/`-separated string.
    #[must_use]
    pub fn relative_path(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let segments: Vec<_> = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect();
        Some(segments.join("/"))
    }

    fn join_lexically(&self, relative: &str) -> PathBuf {
        let mut joined = self.root.clone();
        for component in Path::new(relative).components() {
            match component {
                Component::Normal(segment) => joined.push(segment),
                Component::ParentDir => {
                    joined.pop();
                }
                // A leading separator is joined as if relative, like a plain path join.
                Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            }
        }
        joined
    }
}
