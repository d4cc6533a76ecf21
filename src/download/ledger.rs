//! Persisted record of completed transfers.
//!
//! The ledger maps each relative path to the byte count of its last
//! complete transfer and is stored as `{"files": {"path": size}}`.
//!
//! A single ledger owner task holds the in-memory ledger and is the only
//! writer of the ledger file. Workers send it updates through a
//! [`LedgerHandle`], so concurrent transfers cannot overwrite each other's
//! entries.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::constants::LEDGER_COMMAND_BUFFER;

/// Mapping from relative path to last fully-transferred size.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferLedger {
    #[serde(default)]
    files: BTreeMap<String, i64>,
}

impl TransferLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a completed transfer, replacing any previous entry.
    pub fn record(&mut self, path: impl Into<String>, size: i64) {
        self.files.insert(path.into(), size);
    }

    /// Size recorded for `path`, if any.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<i64> {
        self.files.get(path).copied()
    }

    /// Number of recorded files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterates over entries in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.files.iter().map(|(path, size)| (path.as_str(), *size))
    }
}

/// Reads and writes the ledger file.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    /// Creates a store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the ledger file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the ledger. A missing or unreadable file yields an empty ledger.
    pub async fn load(&self) -> TransferLedger {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(error) => {
                debug!(path = %self.path.display(), error = %error, "no readable ledger, starting empty");
                return TransferLedger::new();
            }
        };
        match serde_json::from_slice(&data) {
            Ok(ledger) => ledger,
            Err(error) => {
                warn!(path = %self.path.display(), error = %error, "ignoring corrupt ledger");
                TransferLedger::new()
            }
        }
    }

    /// Persists the whole ledger. Failures are logged and otherwise ignored.
    pub async fn save(&self, ledger: &TransferLedger) {
        if let Err(error) = self.try_save(ledger).await {
            warn!(path = %self.path.display(), error = %error, "failed to persist ledger");
        }
    }

    async fn try_save(&self, ledger: &TransferLedger) -> std::io::Result<()> {
        let data = serde_json::to_vec(ledger)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut temp_name = self.path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);
        tokio::fs::write(&temp_path, &data).await?;
        tokio::fs::rename(&temp_path, &self.path).await
    }
}

#[derive(Debug)]
enum LedgerCommand {
    Record {
        path: String,
        size: i64,
    },
    Snapshot {
        respond_to: oneshot::Sender<TransferLedger>,
    },
}

/// Cloneable sender side of the ledger owner task.
#[derive(Debug, Clone)]
pub struct LedgerHandle {
    commands: mpsc::Sender<LedgerCommand>,
}

impl LedgerHandle {
    /// Starts the ledger owner task for `store`.
    ///
    /// The task loads the ledger once, applies every update in arrival order
    /// and saves after each one. It exits when every handle is dropped and
    /// yields the final ledger through the returned join handle.
    #[must_use]
    pub fn spawn(store: LedgerStore) -> (Self, JoinHandle<TransferLedger>) {
        let (commands, rx) = mpsc::channel(LEDGER_COMMAND_BUFFER);
        let task = tokio::spawn(run_ledger(store, rx));
        (Self { commands }, task)
    }

    /// Records a completed transfer. Best-effort: a stopped owner is logged.
    pub async fn record(&self, path: impl Into<String>, size: i64) {
        let path = path.into();
        if self
            .commands
            .send(LedgerCommand::Record { path, size })
            .await
            .is_err()
        {
            warn!("ledger owner stopped, update dropped");
        }
    }

    /// Current in-memory ledger, or `None` if the owner has stopped.
    pub async fn snapshot(&self) -> Option<TransferLedger> {
        let (respond_to, rx) = oneshot::channel();
        self.commands
            .send(LedgerCommand::Snapshot { respond_to })
            .await
            .ok()?;
        rx.await.ok()
    }
}

async fn run_ledger(store: LedgerStore, mut rx: mpsc::Receiver<LedgerCommand>) -> TransferLedger {
    let mut ledger = store.load().await;
    debug!(path = %store.path().display(), entries = ledger.len(), "ledger loaded");

    while let Some(command) = rx.recv().await {
        match command {
            LedgerCommand::Record { path, size } => {
                ledger.record(path, size);
                store.save(&ledger).await;
            }
            LedgerCommand::Snapshot { respond_to } => {
                let _ = respond_to.send(ledger.clone());
            }
        }
    }

    ledger
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = LedgerStore::new(temp.path().join("state.json"));
        let mut ledger = TransferLedger::new();
        ledger.record("x", 100);

        store.save(&ledger).await;
        let loaded = store.load().await;
        assert_eq!(loaded, ledger);
        assert_eq!(loaded.get("x"), Some(100));
    }

    #[tokio::test]
    async fn test_file_format_matches_wire_shape() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state.json");
        let store = LedgerStore::new(&path);
        let mut ledger = TransferLedger::new();
        ledger.record("x", 100);
        store.save(&ledger).await;

        let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({"files": {"x": 100}}));
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = LedgerStore::new(temp.path().join("missing.json"));
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_load_corrupt_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state.json");
        std::fs::write(&path, b"{not json").unwrap();
        assert!(LedgerStore::new(&path).load().await.is_empty());
    }

    #[tokio::test]
    async fn test_load_accepts_missing_files_key() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state.json");
        std::fs::write(&path, b"{}").unwrap();
        assert!(LedgerStore::new(&path).load().await.is_empty());
    }

    #[tokio::test]
    async fn test_save_to_unwritable_location_does_not_panic() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, b"file, not dir").unwrap();
        let store = LedgerStore::new(blocker.join("state.json"));

        let mut ledger = TransferLedger::new();
        ledger.record("x", 1);
        store.save(&ledger).await;
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_owner_keeps_existing_entries() {
        let temp = TempDir::new().unwrap();
        let store = LedgerStore::new(temp.path().join("state.json"));
        let mut prior = TransferLedger::new();
        prior.record("old", 5);
        store.save(&prior).await;

        let (handle, task) = LedgerHandle::spawn(store.clone());
        handle.record("new", 7).await;
        drop(handle);
        let final_ledger = task.await.unwrap();

        assert_eq!(final_ledger.get("old"), Some(5));
        assert_eq!(final_ledger.get("new"), Some(7));
        assert_eq!(store.load().await, final_ledger);
    }

    #[tokio::test]
    async fn test_concurrent_records_are_all_persisted() {
        let temp = TempDir::new().unwrap();
        let store = LedgerStore::new(temp.path().join("state.json"));
        let (handle, task) = LedgerHandle::spawn(store.clone());

        let mut writers = Vec::new();
        for i in 0..50_i64 {
            let handle = handle.clone();
            writers.push(tokio::spawn(async move {
                handle.record(format!("file-{i}"), i).await;
            }));
        }
        for writer in writers {
            writer.await.unwrap();
        }

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.len(), 50);

        drop(handle);
        task.await.unwrap();
        let reloaded = store.load().await;
        assert_eq!(reloaded.len(), 50);
        for i in 0..50_i64 {
            assert_eq!(reloaded.get(&format!("file-{i}")), Some(i));
        }
    }
}
