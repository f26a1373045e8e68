/// USBSentry Core: removable-volume detection, scanning, and signatures.
///
/// This crate contains all detection logic with zero UI or alert-transport
/// dependencies. Frontends (the headless agent binary, a future GUI) drive
/// it through [`monitor::Monitor`] and consume its event stream.
///
/// # Modules
///
/// - [`model`]: Volumes, findings, and scan results.
/// - [`signatures`]: SHA-256 to threat-label store with atomic bulk updates.
/// - [`hasher`]: Streaming SHA-256 digests of file contents.
/// - [`scanner`]: Contained, symlink-safe volume scanning.
/// - [`platform`]: Per-OS removable volume enumeration.
/// - [`monitor`]: Polling loop, events, and sink interfaces.
pub mod error;
pub mod hasher;
pub mod model;
pub mod monitor;
pub mod platform;
pub mod scanner;
pub mod signatures;

pub use error::{EnumerationError, HashError, MonitorError, ScanError, SinkError, TickError};
