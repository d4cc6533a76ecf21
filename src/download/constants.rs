//! Constants for the download module (timeouts, worker bounds).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Minimum allowed worker count.
pub const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed worker count.
pub const MAX_CONCURRENCY: usize = 100;

/// Default worker count.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Pending ledger updates buffered before workers wait on the ledger owner.
pub const LEDGER_COMMAND_BUFFER: usize = 128;
