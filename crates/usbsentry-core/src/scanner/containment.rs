/// Volume-root containment checks.
///
/// Every file examined by a scan must canonicalise to a path under the
/// canonical volume root. A symlinked directory, a junction, or a rename
/// racing the walk can otherwise point the scanner at the host's own disk.
use crate::error::ScanError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A validated, canonical scan root.
#[derive(Debug, Clone)]
pub struct VolumeRoot {
    canonical: PathBuf,
}

impl VolumeRoot {
    /// Validate `path` as a scan root.
    ///
    /// The root itself must not be a symbolic link, must canonicalise, and
    /// must be listable. Any failure here means the device is gone or
    /// unreadable and is escalated to the caller.
    pub fn open(path: &Path) -> Result<Self, ScanError> {
        let unreadable = |source| ScanError::RootUnreadable {
            path: path.to_path_buf(),
            source,
        };

        let meta = fs::symlink_metadata(path).map_err(unreadable)?;
        if meta.file_type().is_symlink() {
            return Err(ScanError::RootIsSymlink(path.to_path_buf()));
        }
        if !meta.is_dir() {
            return Err(unreadable(io::Error::new(
                io::ErrorKind::InvalidInput,
                "not a directory",
            )));
        }

        let canonical = fs::canonicalize(path).map_err(unreadable)?;
        fs::read_dir(&canonical).map_err(unreadable)?;

        Ok(Self { canonical })
    }

    pub fn path(&self) -> &Path {
        &self.canonical
    }

    /// Canonicalise `candidate` and return it if it still lies under the
    /// root. `Ok(None)` means the path escapes the volume.
    pub fn resolve(&self, candidate: &Path) -> io::Result<Option<PathBuf>> {
        let canonical = fs::canonicalize(candidate)?;
        if canonical.starts_with(&self.canonical) {
            Ok(Some(canonical))
        } else {
            Ok(None)
        }
    }

    /// `path` relative to the root, or `path` unchanged when it is not under
    /// the root.
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.canonical).unwrap_or(path)
    }
}
