/// Drive enumeration using the Windows API.
///
/// Walks the logical drive strings and keeps the roots whose drive type is
/// `DRIVE_REMOVABLE`. Labels come from `GetVolumeInformationW`.
use crate::error::EnumerationError;
use crate::model::{DriveInfo, Volume, VolumeKind};
use crate::platform::VolumeEnumerator;
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::os::windows::ffi::OsStringExt;
use std::path::{Path, PathBuf};
use windows::Win32::Storage::FileSystem::{
    GetDriveTypeW, GetLogicalDriveStringsW, GetVolumeInformationW,
};

// Drive type constants from the Windows API.
const DRIVE_REMOVABLE_VAL: u32 = 2;
const DRIVE_FIXED_VAL: u32 = 3;
const DRIVE_REMOTE_VAL: u32 = 4;
const DRIVE_CDROM_VAL: u32 = 5;
const DRIVE_RAMDISK_VAL: u32 = 6;

#[derive(Debug, Default)]
pub struct WindowsEnumerator;

impl WindowsEnumerator {
    pub fn new() -> Self {
        Self
    }
}

impl VolumeEnumerator for WindowsEnumerator {
    fn list_removable_volumes(&self) -> Result<BTreeSet<Volume>, EnumerationError> {
        let mut volumes = BTreeSet::new();
        for root in logical_drive_roots()? {
            let wide = to_wide(&root);
            if drive_kind(&wide) != VolumeKind::Removable {
                continue;
            }
            let label = volume_label(&wide).unwrap_or_default();
            volumes.insert(Volume::new(PathBuf::from(&root), &label, VolumeKind::Removable));
        }
        Ok(volumes)
    }

    fn probe(&self, path: &Path) -> Result<DriveInfo, EnumerationError> {
        let root = drive_root(path)
            .ok_or_else(|| EnumerationError::NotFound(path.to_path_buf()))?;
        let wide = to_wide(&root);
        let kind = drive_kind(&wide);
        let label = volume_label(&wide).unwrap_or_default();
        Ok(DriveInfo {
            display_name: if label.is_empty() {
                "Unnamed Drive".to_owned()
            } else {
                label
            },
            kind,
            path: path.to_path_buf(),
        })
    }
}

/// Parse the null-separated list returned by `GetLogicalDriveStringsW`.
fn logical_drive_roots() -> Result<Vec<String>, EnumerationError> {
    let mut buffer = [0u16; 256];
    let len = unsafe { GetLogicalDriveStringsW(Some(&mut buffer)) };

    if len == 0 {
        return Err(EnumerationError::Platform(
            "GetLogicalDriveStringsW returned 0".to_owned(),
        ));
    }
    if len as usize > buffer.len() {
        return Err(EnumerationError::Platform(format!(
            "GetLogicalDriveStringsW needs {len} code units"
        )));
    }

    let full = OsString::from_wide(&buffer[..len as usize]);
    Ok(full
        .to_string_lossy()
        .split('\0')
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect())
}

fn drive_kind(root_wide: &[u16]) -> VolumeKind {
    let raw_type = unsafe { GetDriveTypeW(windows::core::PCWSTR(root_wide.as_ptr())) };
    match raw_type {
        DRIVE_REMOVABLE_VAL => VolumeKind::Removable,
        DRIVE_FIXED_VAL => VolumeKind::Fixed,
        DRIVE_REMOTE_VAL => VolumeKind::Network,
        DRIVE_CDROM_VAL => VolumeKind::Optical,
        DRIVE_RAMDISK_VAL => VolumeKind::RamDisk,
        _ => VolumeKind::Unknown,
    }
}

fn volume_label(root_wide: &[u16]) -> Option<String> {
    let mut label_buf = [0u16; 256];
    let ok = unsafe {
        GetVolumeInformationW(
            windows::core::PCWSTR(root_wide.as_ptr()),
            Some(&mut label_buf),
            None,
            None,
            None,
            None,
        )
        .is_ok()
    };
    if !ok {
        return None;
    }
    let end = label_buf.iter().position(|&c| c == 0).unwrap_or(0);
    Some(String::from_utf16_lossy(&label_buf[..end]))
}

/// `E:\`, `e:`, `E:\some\dir` all map to the drive root `E:\`.
fn drive_root(path: &Path) -> Option<String> {
    let s = path.to_string_lossy();
    let s = s.strip_prefix(r"\\?\").unwrap_or(&s);
    let mut chars = s.chars();
    let letter = chars.next()?;
    if !letter.is_ascii_alphabetic() || chars.next()? != ':' {
        return None;
    }
    Some(format!("{}:\\", letter.to_ascii_uppercase()))
}

fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}
