//! Wire types exchanged between the server and the client.
//!
//! `GET /list/{path}` answers with a [`ListingResponse`], every non-2xx
//! answer carries an [`ErrorBody`].

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};

/// A regular file visible under the server root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path relative to the server root, `/`-separated.
    pub path: String,
    /// Byte length observed when the directory was walked.
    pub size: i64,
}

impl FileRecord {
    /// Creates a record from a relative path and size.
    pub fn new(path: impl Into<String>, size: i64) -> Self {
        Self {
            path: path.into(),
            size,
        }
    }

    /// Returns the parent directory of this record, or `None` for files at the root.
    #[must_use]
    pub fn parent_dir(&self) -> Option<&str> {
        self.path
            .rsplit_once('/')
            .map(|(dir, _)| dir)
            .filter(|dir| !dir.is_empty() && *dir != ".")
    }
}

/// Body of a successful `/list` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingResponse {
    /// Files in walk order. Older servers send `null` for an empty directory.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub files: Vec<FileRecord>,
}

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Distinct parent directories of a listing, sorted, excluding the root.
#[must_use]
pub fn directories(files: &[FileRecord]) -> BTreeSet<String> {
    files
        .iter()
        .filter_map(FileRecord::parent_dir)
        .map(str::to_owned)
        .collect()
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<FileRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<FileRecord>>::deserialize(deserializer)?.unwrap_or_default())
}
