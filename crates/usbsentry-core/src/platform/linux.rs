/// Removable volume discovery on Linux.
///
/// Mounts are read from `/proc/self/mounts`. A mount is reported when it
/// sits under one of the desktop automount roots, is not hidden, is not on
/// the same device as `/`, and its block device is hot-pluggable according
/// to sysfs: the disk's `removable` flag is set or the device hangs off a USB
/// bus. Anything that cannot be confirmed is treated as fixed.
use crate::error::EnumerationError;
use crate::model::{DriveInfo, Volume, VolumeKind};
use crate::platform::VolumeEnumerator;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directories under which desktop automounters place removable media.
pub const MOUNT_ROOTS: &[&str] = &["/media", "/run/media", "/mnt"];

const NETWORK_FS: &[&str] = &["nfs", "nfs4", "cifs", "smb3", "smbfs", "sshfs", "fuse.sshfs"];
const RAM_FS: &[&str] = &["tmpfs", "ramfs"];
const OPTICAL_FS: &[&str] = &["iso9660", "udf"];

/// One row of the mount table.
#[derive(Debug, Clone, PartialEq, Eq)]
struct MountEntry {
    device: String,
    mount_point: PathBuf,
    fs_type: String,
}

#[derive(Debug, Clone)]
pub struct LinuxEnumerator {
    mounts_file: PathBuf,
    sys_class_block: PathBuf,
    mount_roots: Vec<PathBuf>,
}

impl Default for LinuxEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

impl LinuxEnumerator {
    pub fn new() -> Self {
        Self {
            mounts_file: PathBuf::from("/proc/self/mounts"),
            sys_class_block: PathBuf::from("/sys/class/block"),
            mount_roots: MOUNT_ROOTS.iter().map(PathBuf::from).collect(),
        }
    }

    /// Read the mount table and sysfs from alternative locations.
    pub fn with_sources(
        mounts_file: impl Into<PathBuf>,
        sys_class_block: impl Into<PathBuf>,
        mount_roots: impl IntoIterator<Item = PathBuf>,
    ) -> Self {
        Self {
            mounts_file: mounts_file.into(),
            sys_class_block: sys_class_block.into(),
            mount_roots: mount_roots.into_iter().collect(),
        }
    }

    fn read_mounts(&self) -> Result<Vec<MountEntry>, EnumerationError> {
        let text = fs::read_to_string(&self.mounts_file).map_err(|source| EnumerationError::Io {
            path: self.mounts_file.clone(),
            source,
        })?;
        Ok(text.lines().filter_map(parse_mount_line).collect())
    }

    fn is_candidate(&self, entry: &MountEntry, root_device: Option<&str>) -> bool {
        let under_root = self
            .mount_roots
            .iter()
            .any(|r| entry.mount_point != *r && entry.mount_point.starts_with(r));
        let hidden = entry
            .mount_point
            .file_name()
            .map(|n| n.to_string_lossy().starts_with('.'))
            .unwrap_or(true);
        under_root
            && !hidden
            && entry.device.starts_with("/dev/")
            && Some(entry.device.as_str()) != root_device
    }

    /// Whether the block device backing `device` is hot-pluggable.
    fn is_hotplug(&self, device: &str) -> bool {
        let dev_path = fs::canonicalize(device).unwrap_or_else(|_| PathBuf::from(device));
        let Some(name) = dev_path.file_name() else {
            return false;
        };
        let sys_entry = self.sys_class_block.join(name);
        let sys_path = match fs::canonicalize(&sys_entry) {
            Ok(p) => p,
            Err(e) => {
                debug!("No sysfs entry for {device}: {e}");
                return false;
            }
        };

        // Partitions carry no `removable` flag of their own; the disk is the
        // parent directory.
        let disk_path = if sys_path.join("partition").exists() {
            match sys_path.parent() {
                Some(p) => p.to_path_buf(),
                None => return false,
            }
        } else {
            sys_path.clone()
        };

        let removable_flag = fs::read_to_string(disk_path.join("removable"))
            .map(|s| s.trim() == "1")
            .unwrap_or(false);
        let on_usb_bus = disk_path
            .components()
            .any(|c| c.as_os_str().to_string_lossy().starts_with("usb"));

        removable_flag || on_usb_bus
    }

    fn classify(&self, entry: &MountEntry, root_device: Option<&str>) -> VolumeKind {
        let fs_type = entry.fs_type.as_str();
        if NETWORK_FS.contains(&fs_type) {
            VolumeKind::Network
        } else if RAM_FS.contains(&fs_type) {
            VolumeKind::RamDisk
        } else if !entry.device.starts_with("/dev/") {
            VolumeKind::Unknown
        } else if Some(entry.device.as_str()) == root_device {
            VolumeKind::Fixed
        } else if self.is_hotplug(&entry.device) {
            VolumeKind::Removable
        } else if OPTICAL_FS.contains(&fs_type) {
            VolumeKind::Optical
        } else {
            VolumeKind::Fixed
        }
    }
}

impl VolumeEnumerator for LinuxEnumerator {
    fn list_removable_volumes(&self) -> Result<BTreeSet<Volume>, EnumerationError> {
        let mounts = self.read_mounts()?;
        let root_device = root_device(&mounts);

        Ok(mounts
            .iter()
            .filter(|m| self.is_candidate(m, root_device))
            .filter(|m| self.is_hotplug(&m.device))
            .map(|m| Volume::new(m.mount_point.clone(), "", VolumeKind::Removable))
            .collect())
    }

    fn probe(&self, path: &Path) -> Result<DriveInfo, EnumerationError> {
        let mounts = self.read_mounts()?;
        let root_device = root_device(&mounts);
        let entry = mounts
            .iter()
            .rev()
            .find(|m| m.mount_point == path)
            .ok_or_else(|| EnumerationError::NotFound(path.to_path_buf()))?;

        let volume = Volume::new(entry.mount_point.clone(), "", VolumeKind::Unknown);
        Ok(DriveInfo {
            display_name: volume.display_name,
            kind: self.classify(entry, root_device),
            path: path.to_path_buf(),
        })
    }
}

/// Device mounted at `/`. Later rows shadow earlier ones.
fn root_device(mounts: &[MountEntry]) -> Option<&str> {
    mounts
        .iter()
        .rev()
        .find(|m| m.mount_point == Path::new("/"))
        .map(|m| m.device.as_str())
}

/// Parse one `/proc/mounts` row: `device mount_point fs_type options dump pass`.
fn parse_mount_line(line: &str) -> Option<MountEntry> {
    let mut fields = line.split_whitespace();
    let device = unescape_mount_field(fields.next()?);
    let mount_point = unescape_mount_field(fields.next()?);
    let fs_type = fields.next()?.to_owned();
    Some(MountEntry {
        device,
        mount_point: PathBuf::from(mount_point),
        fs_type,
    })
}

/// The kernel escapes space, tab, newline and backslash as three-digit
/// octal sequences (`\040` for a space).
fn unescape_mount_field(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() && is_octal_triplet(&bytes[i + 1..i + 4]) {
            let value = (bytes[i + 1] - b'0') * 64 + (bytes[i + 2] - b'0') * 8 + (bytes[i + 3] - b'0');
            out.push(value);
            i += 4;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn is_octal_triplet(b: &[u8]) -> bool {
    b.len() == 3 && b[0] <= b'3' && b.iter().all(|c| (b'0'..=b'7').contains(c))
}
