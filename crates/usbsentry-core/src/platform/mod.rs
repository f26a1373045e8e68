/// Platform-specific removable volume enumeration.
///
/// Each supported OS gets one [`VolumeEnumerator`] implementation selected
/// at compile time by [`default_enumerator`]. The monitor and the scanner
/// only ever see the trait.
///
/// - Windows: drive letters reporting `DRIVE_REMOVABLE`.
/// - macOS: `/Volumes` entries that `diskutil` reports as removable media.
/// - Linux: mounts under `/media`, `/run/media` and `/mnt` whose block
///   device has the sysfs `removable` flag set.
#[cfg(target_os = "linux")]
pub mod linux;
#[cfg(target_os = "macos")]
pub mod macos;
pub mod static_list;
#[cfg(windows)]
pub mod win32;

pub use static_list::StaticEnumerator;

use crate::error::EnumerationError;
use crate::model::{DriveInfo, Volume};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Discovery of attached volumes.
pub trait VolumeEnumerator: Send + Sync {
    /// Every currently attached volume classified as removable.
    fn list_removable_volumes(&self) -> Result<BTreeSet<Volume>, EnumerationError>;

    /// Label and classification for one mount point or drive root.
    fn probe(&self, path: &Path) -> Result<DriveInfo, EnumerationError>;
}

/// Drive metadata that never fails.
///
/// A probe error is logged and degrades to a name derived from the path
/// with [`VolumeKind::Unknown`](crate::model::VolumeKind::Unknown).
pub fn drive_info(enumerator: &dyn VolumeEnumerator, path: &Path) -> DriveInfo {
    match enumerator.probe(path) {
        Ok(info) => info,
        Err(e) => {
            warn!("Error getting drive info for {}: {e}", path.display());
            DriveInfo::degraded(path)
        }
    }
}

/// The enumerator for the platform this binary was built for.
pub fn default_enumerator() -> Arc<dyn VolumeEnumerator> {
    platform_enumerator()
}

#[cfg(windows)]
fn platform_enumerator() -> Arc<dyn VolumeEnumerator> {
    Arc::new(win32::WindowsEnumerator::new())
}

#[cfg(target_os = "macos")]
fn platform_enumerator() -> Arc<dyn VolumeEnumerator> {
    Arc::new(macos::MacEnumerator::new())
}

#[cfg(target_os = "linux")]
fn platform_enumerator() -> Arc<dyn VolumeEnumerator> {
    Arc::new(linux::LinuxEnumerator::new())
}

#[cfg(not(any(windows, target_os = "macos", target_os = "linux")))]
fn platform_enumerator() -> Arc<dyn VolumeEnumerator> {
    Arc::new(Unsupported)
}

/// Fallback for targets without an implementation; every call fails.
#[cfg(not(any(windows, target_os = "macos", target_os = "linux")))]
struct Unsupported;

#[cfg(not(any(windows, target_os = "macos", target_os = "linux")))]
impl VolumeEnumerator for Unsupported {
    fn list_removable_volumes(&self) -> Result<BTreeSet<Volume>, EnumerationError> {
        Err(EnumerationError::Unsupported)
    }

    fn probe(&self, _path: &Path) -> Result<DriveInfo, EnumerationError> {
        Err(EnumerationError::Unsupported)
    }
}
