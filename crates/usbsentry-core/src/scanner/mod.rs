/// Scanner module: one-shot scan of a removable volume.
///
/// A scan runs in two phases:
/// - **Walk:** `jwalk` traversal of the canonical volume root with symlinks
///   never followed. Produces the candidate file list in sorted order.
/// - **Classify:** each candidate is re-validated against the root and then
///   checked against the extension heuristic and the signature store.
///   Hashing is the expensive part, so candidates are classified on the
///   rayon pool; `collect` keeps walk order, so findings stay deterministic.
///
/// Per-file failures become [`ScanWarning`]s. Only a root that cannot be
/// opened fails the scan.
pub mod containment;
pub mod extensions;

pub use containment::VolumeRoot;
pub use extensions::{SuspiciousExtensions, DEFAULT_SUSPICIOUS_EXTENSIONS};

use crate::error::ScanError;
use crate::hasher;
use crate::model::{FindingReason, ScanFinding, ScanResult, ScanWarning, Volume, VolumeKind};
use crate::platform::VolumeEnumerator;
use crate::signatures::{SignatureSnapshot, SignatureStore};
use chrono::Local;
use compact_str::CompactString;
use parking_lot::RwLock;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// What classifying one candidate produced.
#[derive(Default)]
struct FileOutcome {
    examined: bool,
    findings: Vec<ScanFinding>,
    warnings: Vec<ScanWarning>,
}

/// Scans volumes against the current extension set and signature store.
///
/// Cloning is cheap; clones share configuration, so an update through one
/// handle is seen by scans started from any other.
#[derive(Clone)]
pub struct ScanEngine {
    extensions: Arc<RwLock<Arc<SuspiciousExtensions>>>,
    signatures: SignatureStore,
}

impl ScanEngine {
    pub fn new(extensions: SuspiciousExtensions, signatures: SignatureStore) -> Self {
        Self {
            extensions: Arc::new(RwLock::new(Arc::new(extensions))),
            signatures,
        }
    }

    /// Replace the extension set. Scans already running keep the old set.
    pub fn set_suspicious_extensions(&self, extensions: SuspiciousExtensions) {
        *self.extensions.write() = Arc::new(extensions);
    }

    pub fn suspicious_extensions(&self) -> Arc<SuspiciousExtensions> {
        Arc::clone(&self.extensions.read())
    }

    pub fn signatures(&self) -> &SignatureStore {
        &self.signatures
    }

    /// Scan `volume`.
    ///
    /// The enumerator is asked for the volume's kind first; anything other
    /// than [`VolumeKind::Removable`] (including a failed probe) returns an
    /// empty result carrying a skip warning without touching the volume.
    pub fn scan(
        &self,
        volume: &Volume,
        enumerator: &dyn VolumeEnumerator,
    ) -> Result<ScanResult, ScanError> {
        let started_at = Local::now();
        let start = Instant::now();

        let kind = match enumerator.probe(&volume.identifier) {
            Ok(info) => info.kind,
            Err(e) => {
                warn!("Cannot classify {}: {e}", volume.identifier.display());
                VolumeKind::Unknown
            }
        };
        if !kind.is_removable() {
            info!(
                "Skipping scan of non-removable drive: {} ({})",
                volume.identifier.display(),
                kind.label()
            );
            let mut result = ScanResult::empty(volume.clone());
            result.started_at = started_at;
            result.warnings.push(ScanWarning {
                path: Some(volume.identifier.clone()),
                message: format!(
                    "Skipping scan of non-removable drive ({})",
                    kind.label()
                ),
            });
            return Ok(result);
        }

        let root = VolumeRoot::open(&volume.identifier)?;
        let extensions = self.suspicious_extensions();
        let signatures = self.signatures.snapshot();
        info!(
            "Scanning {} ({} extensions, {} signatures)",
            root.path().display(),
            extensions.len(),
            signatures.len()
        );

        let (candidates, mut warnings) = collect_candidates(&root);

        let outcomes: Vec<FileOutcome> = candidates
            .par_iter()
            .map(|path| classify(path, &root, &extensions, &signatures))
            .collect();

        let mut findings = Vec::new();
        let mut files_examined = 0u64;
        for outcome in outcomes {
            if outcome.examined {
                files_examined += 1;
            }
            findings.extend(outcome.findings);
            warnings.extend(outcome.warnings);
        }

        let duration = start.elapsed();
        debug!(
            "Scan of {} complete: {} files, {} findings, {} warnings in {:?}",
            root.path().display(),
            files_examined,
            findings.len(),
            warnings.len(),
            duration
        );

        Ok(ScanResult {
            volume: volume.clone(),
            started_at,
            findings,
            files_examined,
            duration,
            warnings,
        })
    }
}

/// Walk the volume and return every regular-file path, in sorted walk
/// order, plus a warning per unreadable directory.
fn collect_candidates(root: &VolumeRoot) -> (Vec<PathBuf>, Vec<ScanWarning>) {
    let mut files = Vec::new();
    let mut warnings = Vec::new();

    let walker = jwalk::WalkDir::new(root.path())
        .skip_hidden(false)
        .follow_links(false)
        .sort(true)
        .parallelism(jwalk::Parallelism::RayonNewPool(num_cpus::get()));

    for entry_result in walker {
        let entry = match entry_result {
            Ok(e) => e,
            Err(err) => {
                // jwalk errors are typically access-denied on directories.
                let path = err.path().map(Path::to_path_buf);
                debug!("Access denied on USB volume: {err}");
                warnings.push(ScanWarning {
                    path: path.map(|p| root.relative(&p).to_path_buf()),
                    message: err.to_string(),
                });
                continue;
            }
        };

        if entry.depth == 0 {
            continue;
        }

        let file_type = entry.file_type();
        if file_type.is_symlink() {
            debug!("Skipping symlink {}", entry.path().display());
            continue;
        }
        if file_type.is_file() {
            files.push(entry.path());
        }
    }

    (files, warnings)
}

/// Re-validate one candidate and run both checks on it.
fn classify(
    path: &Path,
    root: &VolumeRoot,
    extensions: &SuspiciousExtensions,
    signatures: &SignatureSnapshot,
) -> FileOutcome {
    let mut outcome = FileOutcome::default();
    let relative = root.relative(path).to_path_buf();

    let meta = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) => {
            debug!("Access denied to USB file: {}: {e}", relative.display());
            outcome.warnings.push(ScanWarning {
                path: Some(relative),
                message: e.to_string(),
            });
            return outcome;
        }
    };
    // Replaced by a link or directory since the walk listed it.
    if meta.file_type().is_symlink() || !meta.is_file() {
        debug!("Skipping {}: no longer a regular file", relative.display());
        return outcome;
    }

    let canonical = match root.resolve(path) {
        Ok(Some(p)) => p,
        Ok(None) => {
            debug!("Skipping {}: resolves outside the volume", path.display());
            return outcome;
        }
        Err(e) => {
            debug!("Access denied to USB file: {}: {e}", relative.display());
            outcome.warnings.push(ScanWarning {
                path: Some(relative),
                message: e.to_string(),
            });
            return outcome;
        }
    };
    outcome.examined = true;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    if let Some(ext) = extensions.matching(&file_name) {
        warn!("Suspicious file found on USB: {}", relative.display());
        outcome.findings.push(ScanFinding {
            relative_path: relative.clone(),
            reason: FindingReason::SuspiciousExtension {
                extension: CompactString::new(ext),
            },
        });
    }

    match hasher::digest(&canonical) {
        Ok(hash) => {
            if let Some(label) = signatures.lookup(&hash) {
                warn!(
                    "Known malware on USB: {} ({label})",
                    relative.display()
                );
                outcome.findings.push(ScanFinding {
                    relative_path: relative,
                    reason: FindingReason::KnownMalwareHash {
                        sha256: hash.to_hex(),
                        threat_label: label.clone(),
                    },
                });
            }
        }
        Err(e) => {
            debug!("Could not hash USB file: {}: {}", relative.display(), e.source);
            outcome.warnings.push(ScanWarning {
                path: Some(relative),
                message: e.source.to_string(),
            });
        }
    }

    outcome
}
