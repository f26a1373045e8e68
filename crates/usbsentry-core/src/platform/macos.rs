/// Removable volume discovery on macOS.
///
/// Candidates are the mount points directly under `/Volumes`. Each one is
/// confirmed with `diskutil info`; when that probe fails the volume is
/// treated as non-removable rather than guessed from its name.
use crate::error::EnumerationError;
use crate::model::{DriveInfo, Volume, VolumeKind};
use crate::platform::VolumeEnumerator;
use std::collections::BTreeSet;
use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Fields of interest from `diskutil info <mount point>`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct DiskutilInfo {
    volume_name: Option<String>,
    removable_media: bool,
    external: bool,
    optical: bool,
}

#[derive(Debug, Clone)]
pub struct MacEnumerator {
    volumes_dir: PathBuf,
}

impl Default for MacEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

impl MacEnumerator {
    pub fn new() -> Self {
        Self {
            volumes_dir: PathBuf::from("/Volumes"),
        }
    }
}

impl VolumeEnumerator for MacEnumerator {
    fn list_removable_volumes(&self) -> Result<BTreeSet<Volume>, EnumerationError> {
        let entries = fs::read_dir(&self.volumes_dir).map_err(|source| EnumerationError::Io {
            path: self.volumes_dir.clone(),
            source,
        })?;
        let boot_dev = fs::metadata("/").map(|m| m.dev()).ok();

        let mut volumes = BTreeSet::new();
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            let path = entry.path();
            // The boot volume appears here as a symlink to `/`.
            let Ok(meta) = fs::symlink_metadata(&path) else {
                continue;
            };
            if meta.file_type().is_symlink() || Some(meta.dev()) == boot_dev {
                continue;
            }
            if !is_mount_point(&path, meta.dev()) {
                continue;
            }
            match diskutil_info(&path) {
                Ok(info) if info.removable_media || info.external => {
                    let label = info.volume_name.unwrap_or_default();
                    volumes.insert(Volume::new(path, &label, VolumeKind::Removable));
                }
                Ok(_) => {}
                Err(e) => debug!("diskutil probe failed for {}: {e}", path.display()),
            }
        }
        Ok(volumes)
    }

    fn probe(&self, path: &Path) -> Result<DriveInfo, EnumerationError> {
        let info = diskutil_info(path)?;
        let kind = if info.optical {
            VolumeKind::Optical
        } else if info.removable_media || info.external {
            VolumeKind::Removable
        } else {
            VolumeKind::Fixed
        };
        let volume = Volume::new(path, info.volume_name.as_deref().unwrap_or(""), kind);
        Ok(DriveInfo {
            display_name: volume.display_name,
            kind,
            path: path.to_path_buf(),
        })
    }
}

/// A directory is a mount point when it lives on a different device than
/// its parent.
fn is_mount_point(path: &Path, dev: u64) -> bool {
    path.parent()
        .and_then(|p| fs::metadata(p).ok())
        .map(|parent| parent.dev() != dev)
        .unwrap_or(false)
}

fn diskutil_info(path: &Path) -> Result<DiskutilInfo, EnumerationError> {
    let output = Command::new("diskutil")
        .arg("info")
        .arg(path)
        .output()
        .map_err(|e| EnumerationError::Platform(format!("failed to execute diskutil: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(EnumerationError::Platform(format!(
            "diskutil failed: {}",
            stderr.trim()
        )));
    }

    Ok(parse_diskutil_info(&String::from_utf8_lossy(&output.stdout)))
}

fn parse_diskutil_info(text: &str) -> DiskutilInfo {
    let mut info = DiskutilInfo::default();
    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "Volume Name" if !value.is_empty() => info.volume_name = Some(value.to_owned()),
            // Older releases print "Yes", newer ones "Removable".
            "Removable Media" => {
                info.removable_media = value.eq_ignore_ascii_case("yes")
                    || value.eq_ignore_ascii_case("removable")
            }
            "Device Location" => info.external = value.eq_ignore_ascii_case("external"),
            "Optical Drive Type" | "Optical Media Type" => info.optical = true,
            _ => {}
        }
    }
    info
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_usb_stick_output() {
        let text = "   Device Identifier:         disk4s1\n\
                    \x20  Volume Name:               KINGSTON\n\
                    \x20  Protocol:                  USB\n\
                    \x20  Device Location:           External\n\
                    \x20  Removable Media:           Removable\n";
        let info = parse_diskutil_info(text);
        assert_eq!(info.volume_name.as_deref(), Some("KINGSTON"));
        assert!(info.removable_media);
        assert!(info.external);
        assert!(!info.optical);
    }

    #[test]
    fn parses_internal_disk_output() {
        let text = "   Volume Name:               Macintosh HD\n\
                    \x20  Device Location:           Internal\n\
                    \x20  Removable Media:           Fixed\n";
        let info = parse_diskutil_info(text);
        assert!(!info.removable_media);
        assert!(!info.external);
    }

    #[test]
    fn legacy_yes_is_removable() {
        assert!(parse_diskutil_info("Removable Media: Yes").removable_media);
    }
}
