/// In-memory enumerator.
///
/// Reports whatever volumes it was told about. Used to embed the monitor
/// where discovery happens elsewhere (a udev listener, a GUI drive picker)
/// and to drive the monitor deterministically in tests.
use crate::error::EnumerationError;
use crate::model::{DriveInfo, Volume};
use crate::platform::VolumeEnumerator;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct StaticEnumerator {
    drives: Mutex<Vec<DriveInfo>>,
    /// When set, every call fails with this message.
    failure: Mutex<Option<String>>,
    list_calls: AtomicU64,
    probe_calls: AtomicU64,
}

impl StaticEnumerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_drives(drives: impl IntoIterator<Item = DriveInfo>) -> Self {
        let e = Self::new();
        *e.drives.lock() = drives.into_iter().collect();
        e
    }

    /// Add or replace the drive at `info.path`.
    pub fn attach(&self, info: DriveInfo) {
        let mut drives = self.drives.lock();
        drives.retain(|d| d.path != info.path);
        drives.push(info);
    }

    pub fn detach(&self, path: &Path) {
        self.drives.lock().retain(|d| d.path != path);
    }

    pub fn clear(&self) {
        self.drives.lock().clear();
    }

    /// Make subsequent calls fail (`Some`) or succeed again (`None`).
    pub fn set_failure(&self, message: Option<&str>) {
        *self.failure.lock() = message.map(str::to_owned);
    }

    pub fn list_calls(&self) -> u64 {
        self.list_calls.load(Ordering::Relaxed)
    }

    pub fn probe_calls(&self) -> u64 {
        self.probe_calls.load(Ordering::Relaxed)
    }

    fn check_failure(&self) -> Result<(), EnumerationError> {
        match self.failure.lock().as_deref() {
            Some(msg) => Err(EnumerationError::Platform(msg.to_owned())),
            None => Ok(()),
        }
    }
}

impl VolumeEnumerator for StaticEnumerator {
    fn list_removable_volumes(&self) -> Result<BTreeSet<Volume>, EnumerationError> {
        self.list_calls.fetch_add(1, Ordering::Relaxed);
        self.check_failure()?;
        Ok(self
            .drives
            .lock()
            .iter()
            .filter(|d| d.kind.is_removable())
            .cloned()
            .map(Volume::from)
            .collect())
    }

    fn probe(&self, path: &Path) -> Result<DriveInfo, EnumerationError> {
        self.probe_calls.fetch_add(1, Ordering::Relaxed);
        self.check_failure()?;
        self.drives
            .lock()
            .iter()
            .find(|d| d.path == path)
            .cloned()
            .ok_or_else(|| EnumerationError::NotFound(path.to_path_buf()))
    }
}
