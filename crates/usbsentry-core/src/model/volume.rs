/// Volume identity and classification.
use serde::Serialize;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

/// Drive type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum VolumeKind {
    Removable,
    Fixed,
    Network,
    Optical,
    RamDisk,
    Unknown,
}

impl VolumeKind {
    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Removable => "Removable",
            Self::Fixed => "Fixed",
            Self::Network => "Network",
            Self::Optical => "CD-ROM",
            Self::RamDisk => "RAM Disk",
            Self::Unknown => "Unknown",
        }
    }

    pub fn is_removable(self) -> bool {
        self == Self::Removable
    }
}

/// Display metadata for one drive, as returned by a platform probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriveInfo {
    /// Volume label, or a name derived from the path.
    pub display_name: String,
    pub kind: VolumeKind,
    /// Mount point or drive root, e.g. `E:\` or `/media/alice/KINGSTON`.
    pub path: PathBuf,
}

impl DriveInfo {
    /// Best-effort metadata for a path whose probe failed.
    pub fn degraded(path: &Path) -> Self {
        let name = fallback_name(path);
        Self {
            display_name: if name.is_empty() {
                "Unknown".to_owned()
            } else {
                name
            },
            kind: VolumeKind::Unknown,
            path: path.to_path_buf(),
        }
    }
}

/// One attached storage device, as seen by a single poll.
///
/// Identity is the `identifier` alone: two polls that report the same mount
/// point with a different label still describe the same volume.
#[derive(Debug, Clone, Serialize)]
pub struct Volume {
    pub identifier: PathBuf,
    pub display_name: String,
    pub kind: VolumeKind,
}

impl Volume {
    /// Build a volume, falling back to the identifier's base name when the
    /// label is empty.
    pub fn new(identifier: impl Into<PathBuf>, display_name: &str, kind: VolumeKind) -> Self {
        let identifier = identifier.into();
        let display_name = if display_name.trim().is_empty() {
            fallback_name(&identifier)
        } else {
            display_name.to_owned()
        };
        Self {
            identifier,
            display_name,
            kind,
        }
    }

    pub fn is_removable(&self) -> bool {
        self.kind.is_removable()
    }
}

impl From<DriveInfo> for Volume {
    fn from(info: DriveInfo) -> Self {
        Volume::new(info.path, &info.display_name, info.kind)
    }
}

impl PartialEq for Volume {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier
    }
}

impl Eq for Volume {}

impl Hash for Volume {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identifier.hash(state);
    }
}

impl PartialOrd for Volume {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Volume {
    fn cmp(&self, other: &Self) -> Ordering {
        self.identifier.cmp(&other.identifier)
    }
}

impl std::fmt::Display for Volume {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.display_name, self.identifier.display())
    }
}

/// For drive roots like `E:\` there is no file name; show `E:` instead.
fn fallback_name(path: &Path) -> String {
    let name = match path.file_name() {
        Some(name) => name.to_string_lossy(),
        None => path.to_string_lossy(),
    };
    name.trim_end_matches(['\\', '/']).to_string()
}
