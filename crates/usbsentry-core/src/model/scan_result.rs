/// Scan output: findings and per-scan bookkeeping.
use crate::model::Volume;
use chrono::{DateTime, Local};
use compact_str::CompactString;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Why a file was flagged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum FindingReason {
    /// The file name ends with a configured suspicious extension.
    SuspiciousExtension { extension: CompactString },
    /// The file's SHA-256 is in the signature store.
    KnownMalwareHash {
        sha256: String,
        threat_label: CompactString,
    },
}

impl FindingReason {
    pub fn threat_label(&self) -> Option<&str> {
        match self {
            Self::KnownMalwareHash { threat_label, .. } => Some(threat_label.as_str()),
            Self::SuspiciousExtension { .. } => None,
        }
    }
}

/// A single suspicious-file determination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ScanFinding {
    /// Path relative to the volume root.
    pub relative_path: PathBuf,
    pub reason: FindingReason,
}

impl std::fmt::Display for ScanFinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.reason {
            FindingReason::SuspiciousExtension { extension } => write!(
                f,
                "{} (suspicious extension {extension})",
                self.relative_path.display()
            ),
            FindingReason::KnownMalwareHash { threat_label, .. } => write!(
                f,
                "{} (known malware: {threat_label})",
                self.relative_path.display()
            ),
        }
    }
}

/// A non-fatal problem met during a scan (unreadable file, skipped volume).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanWarning {
    pub path: Option<PathBuf>,
    pub message: String,
}

impl std::fmt::Display for ScanWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}: {}", path.display(), self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Everything one scan produced. An empty `findings` list is a clean scan,
/// which is distinct from a scan that failed to start (`ScanError`).
#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    pub volume: Volume,
    pub started_at: DateTime<Local>,
    /// In walk order (sorted by path within each directory).
    pub findings: Vec<ScanFinding>,
    pub files_examined: u64,
    pub duration: Duration,
    pub warnings: Vec<ScanWarning>,
}

impl ScanResult {
    /// An empty result for `volume`, stamped now.
    pub fn empty(volume: Volume) -> Self {
        Self {
            volume,
            started_at: Local::now(),
            findings: Vec::new(),
            files_examined: 0,
            duration: Duration::ZERO,
            warnings: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn malware_count(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| matches!(f.reason, FindingReason::KnownMalwareHash { .. }))
            .count()
    }
}
