/// End-to-end scanner integration tests.
///
/// These run the real `ScanEngine` (jwalk walk, rayon classification,
/// streaming SHA-256) against a temporary directory standing in for a
/// mounted USB volume. Classification comes from a `StaticEnumerator`, so
/// nothing here depends on what is plugged into the test machine.
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use usbsentry_core::hasher::ContentHash;
use usbsentry_core::model::{DriveInfo, FindingReason, Volume, VolumeKind};
use usbsentry_core::platform::StaticEnumerator;
use usbsentry_core::scanner::{ScanEngine, SuspiciousExtensions};
use usbsentry_core::signatures::SignatureStore;
use usbsentry_core::ScanError;

// ── Helpers ──────────────────────────────────────────────────────────────────

const PAYLOAD: &[u8] = b"not really a worm, just test bytes";

fn removable(path: &Path) -> (Volume, StaticEnumerator) {
    let info = DriveInfo {
        display_name: "TESTUSB".into(),
        kind: VolumeKind::Removable,
        path: path.to_path_buf(),
    };
    let enumerator = StaticEnumerator::with_drives([info.clone()]);
    (Volume::from(info), enumerator)
}

fn engine_with_payload_signature() -> ScanEngine {
    let store = SignatureStore::new();
    let hash = ContentHash::of_bytes(PAYLOAD).to_hex();
    let summary = store.bulk_update([(hash.as_str(), "Test.Worm")]);
    assert_eq!(summary.accepted, 1);
    ScanEngine::new(SuspiciousExtensions::defaults(), store)
}

/// ```text
/// root/
///   readme.txt        clean
///   payload.EXE       suspicious extension
///   docs/
///     notes.bin       known-malware content
///     run.bat         suspicious extension + known-malware content
/// ```
fn build_volume(root: &Path) {
    fs::create_dir_all(root.join("docs")).unwrap();
    fs::write(root.join("readme.txt"), b"hello").unwrap();
    fs::write(root.join("payload.EXE"), b"MZ").unwrap();
    fs::write(root.join("docs").join("notes.bin"), PAYLOAD).unwrap();
    fs::write(root.join("docs").join("run.bat"), PAYLOAD).unwrap();
}

fn finding_paths(findings: &[usbsentry_core::model::ScanFinding]) -> Vec<PathBuf> {
    findings.iter().map(|f| f.relative_path.clone()).collect()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn flags_extensions_and_known_hashes() {
    let tmp = TempDir::new().unwrap();
    build_volume(tmp.path());
    let (volume, enumerator) = removable(tmp.path());

    let result = engine_with_payload_signature()
        .scan(&volume, &enumerator)
        .unwrap();

    assert_eq!(result.files_examined, 4);
    assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    assert_eq!(result.findings.len(), 4, "{:?}", result.findings);
    assert_eq!(result.malware_count(), 2);

    let paths = finding_paths(&result.findings);
    assert!(paths.contains(&PathBuf::from("payload.EXE")));
    assert!(!paths.contains(&PathBuf::from("readme.txt")));

    let run_bat = Path::new("docs").join("run.bat");
    let reasons: Vec<&FindingReason> = result
        .findings
        .iter()
        .filter(|f| f.relative_path == run_bat)
        .map(|f| &f.reason)
        .collect();
    assert_eq!(reasons.len(), 2);
    assert!(reasons
        .iter()
        .any(|r| matches!(r, FindingReason::SuspiciousExtension { extension } if extension == ".bat")));
    assert!(reasons
        .iter()
        .any(|r| r.threat_label() == Some("Test.Worm")));
}

#[test]
fn uppercase_extension_is_flagged() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("payload.EXE"), b"MZ").unwrap();
    let (volume, enumerator) = removable(tmp.path());

    let engine = ScanEngine::new(SuspiciousExtensions::defaults(), SignatureStore::new());
    let result = engine.scan(&volume, &enumerator).unwrap();

    assert_eq!(result.findings.len(), 1);
    assert_eq!(
        result.findings[0].reason,
        FindingReason::SuspiciousExtension {
            extension: ".exe".into()
        }
    );
}

#[test]
fn rescanning_an_unchanged_volume_is_identical() {
    let tmp = TempDir::new().unwrap();
    build_volume(tmp.path());
    let (volume, enumerator) = removable(tmp.path());
    let engine = engine_with_payload_signature();

    let first = engine.scan(&volume, &enumerator).unwrap();
    let second = engine.scan(&volume, &enumerator).unwrap();

    assert_eq!(first.findings, second.findings);
    assert_eq!(first.files_examined, second.files_examined);
}

#[test]
fn non_removable_volume_is_never_read() {
    let info = DriveInfo {
        display_name: "System".into(),
        kind: VolumeKind::Fixed,
        path: PathBuf::from("/definitely/not/a/real/mount/point"),
    };
    let enumerator = StaticEnumerator::with_drives([info.clone()]);
    let volume = Volume::from(info);
    let engine = engine_with_payload_signature();

    // The root does not exist; touching it would surface RootUnreadable.
    let result = engine.scan(&volume, &enumerator).unwrap();

    assert!(result.findings.is_empty());
    assert_eq!(result.files_examined, 0);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].message.contains("non-removable"));
}

#[test]
fn unreadable_root_is_a_scan_error() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("unplugged");
    let (volume, enumerator) = removable(&missing);

    let err = engine_with_payload_signature()
        .scan(&volume, &enumerator)
        .unwrap_err();
    assert!(matches!(err, ScanError::RootUnreadable { .. }), "{err}");
}

#[test]
fn signature_update_applies_to_the_next_scan() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("data.bin"), PAYLOAD).unwrap();
    let (volume, enumerator) = removable(tmp.path());
    let engine = ScanEngine::new(SuspiciousExtensions::defaults(), SignatureStore::new());

    assert!(engine.scan(&volume, &enumerator).unwrap().is_clean());

    let hash = ContentHash::of_bytes(PAYLOAD).to_hex().to_uppercase();
    engine.signatures().bulk_update([(hash, "Test.Worm".to_owned())]);

    let result = engine.scan(&volume, &enumerator).unwrap();
    assert_eq!(result.malware_count(), 1);
}

#[cfg(unix)]
mod symlinks {
    use super::*;
    use std::os::unix::fs::symlink;

    #[test]
    fn symlinked_directory_outside_the_volume_is_not_followed() {
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("evil.exe"), PAYLOAD).unwrap();

        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("readme.txt"), b"hello").unwrap();
        symlink(outside.path(), tmp.path().join("escape")).unwrap();
        let (volume, enumerator) = removable(tmp.path());

        let result = engine_with_payload_signature()
            .scan(&volume, &enumerator)
            .unwrap();

        assert!(result.is_clean(), "{:?}", result.findings);
        assert_eq!(result.files_examined, 1);
    }

    #[test]
    fn symlinked_file_outside_the_volume_is_not_hashed() {
        let outside = TempDir::new().unwrap();
        let target = outside.path().join("secret.bin");
        fs::write(&target, PAYLOAD).unwrap();

        let tmp = TempDir::new().unwrap();
        symlink(&target, tmp.path().join("link.bin")).unwrap();
        let (volume, enumerator) = removable(tmp.path());

        let result = engine_with_payload_signature()
            .scan(&volume, &enumerator)
            .unwrap();

        assert!(result.is_clean());
        assert_eq!(result.files_examined, 0);
    }

    #[test]
    fn unreadable_file_is_a_warning_and_the_scan_continues() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let locked = tmp.path().join("locked.bin");
        fs::write(&locked, PAYLOAD).unwrap();
        fs::write(tmp.path().join("payload.exe"), b"MZ").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::File::open(&locked).is_ok() {
            // Running as root: permissions are not enforced.
            return;
        }
        let (volume, enumerator) = removable(tmp.path());

        let result = engine_with_payload_signature()
            .scan(&volume, &enumerator)
            .unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

        assert_eq!(result.warnings.len(), 1, "{:?}", result.warnings);
        assert_eq!(
            result.warnings[0].path.as_deref(),
            Some(Path::new("locked.bin"))
        );
        assert_eq!(finding_paths(&result.findings), vec![PathBuf::from("payload.exe")]);
    }

    #[test]
    fn symlinked_root_is_refused() {
        let real = TempDir::new().unwrap();
        fs::write(real.path().join("payload.exe"), b"MZ").unwrap();
        let tmp = TempDir::new().unwrap();
        let link = tmp.path().join("usb");
        symlink(real.path(), &link).unwrap();
        let (volume, enumerator) = removable(&link);

        let err = engine_with_payload_signature()
            .scan(&volume, &enumerator)
            .unwrap_err();
        assert!(matches!(err, ScanError::RootIsSymlink(_)), "{err}");
    }
}
