/// Data model shared by the scanner, the enumerators, and the monitor.
pub mod scan_result;
pub mod volume;

pub use scan_result::{FindingReason, ScanFinding, ScanResult, ScanWarning};
pub use volume::{DriveInfo, Volume, VolumeKind};
