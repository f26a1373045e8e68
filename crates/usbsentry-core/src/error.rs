/// Error types for every boundary the monitor loop crosses.
///
/// Each enum maps onto one row of the handling policy: hashing errors are
/// skipped per file, enumeration errors degrade a tick, scan errors are
/// escalated to the loop, and sink errors are logged and dropped.
use std::path::PathBuf;
use thiserror::Error;

/// Reading a file for hashing failed (vanished, permission denied, device
/// pulled mid-read).
#[derive(Error, Debug)]
#[error("failed to hash {path}: {source}")]
pub struct HashError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// A scan could not start.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("volume root is unreadable: {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("volume root is a symbolic link: {0}")]
    RootIsSymlink(PathBuf),
}

/// Listing or probing volumes failed.
#[derive(Error, Debug)]
pub enum EnumerationError {
    #[error("volume enumeration is not supported on this platform")]
    Unsupported,

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("platform query failed: {0}")]
    Platform(String),

    #[error("no such volume: {0}")]
    NotFound(PathBuf),
}

/// An alert or log sink could not deliver.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("sink I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("sink rejected the alert: {0}")]
    Rejected(String),
}

/// A poll tick could not run at all.
#[derive(Error, Debug)]
pub enum TickError {
    #[error("error getting drives: {0}")]
    Enumeration(#[from] EnumerationError),

    #[error("monitor tick panicked: {0}")]
    Panicked(String),
}

/// The monitor itself could not be started.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("failed to spawn monitor thread: {0}")]
    Spawn(#[source] std::io::Error),
}
