/// Agent configuration: JSON file plus CSV signature feeds.
///
/// Every field has a default, so an empty object (or no file at all) runs
/// the agent with the built-in extension list, the built-in signatures, and
/// alerts written to the log.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use usbsentry_core::monitor::MonitorConfig;
use usbsentry_core::scanner::DEFAULT_SUSPICIOUS_EXTENSIONS;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentConfig {
    pub suspicious_extensions: Vec<String>,
    /// Load the signatures compiled into the agent.
    pub builtin_signatures: bool,
    /// CSV files of `sha256,label` rows merged over the built-in set.
    pub signature_files: Vec<PathBuf>,
    pub alert: AlertConfig,
    pub log: LogConfig,
    pub monitor: MonitorSettings,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            suspicious_extensions: DEFAULT_SUSPICIOUS_EXTENSIONS
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
            builtin_signatures: true,
            signature_files: Vec::new(),
            alert: AlertConfig::default(),
            log: LogConfig::default(),
            monitor: MonitorSettings::default(),
        }
    }
}

/// Where alerts for infected volumes go.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertConfig {
    /// Render the report through `tracing` at WARN.
    #[default]
    Log,
    /// Append one JSON document per alert to `path`.
    JsonLines { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Event log file; `null` disables it.
    pub file: Option<PathBuf>,
    pub max_bytes: u64,
    pub backups: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: Some(PathBuf::from("usb_monitor.log")),
            max_bytes: 5 * 1024 * 1024,
            backups: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorSettings {
    pub poll_interval_secs: u64,
    pub error_backoff_secs: u64,
    pub no_volume_interval_secs: u64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        let defaults = MonitorConfig::default();
        Self {
            poll_interval_secs: defaults.poll_interval.as_secs(),
            error_backoff_secs: defaults.error_backoff.as_secs(),
            no_volume_interval_secs: defaults.no_volume_interval.as_secs(),
        }
    }
}

impl MonitorSettings {
    /// Zero intervals are raised to one second so the loop never spins.
    pub fn to_monitor_config(&self) -> MonitorConfig {
        let secs = |n: u64| Duration::from_secs(n.max(1));
        MonitorConfig {
            poll_interval: secs(self.poll_interval_secs),
            error_backoff: secs(self.error_backoff_secs),
            no_volume_interval: secs(self.no_volume_interval_secs),
        }
    }
}

impl AgentConfig {
    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Load from `path` when given, otherwise use the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}

/// Read `sha256,label` rows from a CSV signature feed.
///
/// Blank lines, `#` comments and a leading `sha256,...` header are skipped.
/// A missing label becomes `"Unknown"`. Hash validation is left to the
/// signature store, which rejects and counts malformed keys.
pub fn load_signature_csv(path: &Path) -> Result<Vec<(String, String)>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open signature file {}", path.display()))?;

    let mut entries = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| {
            format!("Malformed row {} in {}", line + 1, path.display())
        })?;
        let Some(hash) = record.get(0).filter(|h| !h.is_empty()) else {
            continue;
        };
        if line == 0 && hash.eq_ignore_ascii_case("sha256") {
            continue;
        }
        let label = record
            .get(1)
            .filter(|l| !l.is_empty())
            .unwrap_or("Unknown");
        entries.push((hash.to_owned(), label.to_owned()));
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_object_is_all_defaults() {
        let config: AgentConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AgentConfig::default());
        assert_eq!(config.suspicious_extensions.len(), 14);
        assert_eq!(config.log.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.alert, AlertConfig::Log);
    }

    #[test]
    fn parses_json_lines_alert_and_partial_sections() {
        let config: AgentConfig = serde_json::from_str(
            r#"{
                "suspicious_extensions": ["exe", ".lnk"],
                "alert": { "kind": "json_lines", "path": "/var/log/usb-alerts.jsonl" },
                "monitor": { "poll_interval_secs": 2 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.suspicious_extensions, vec!["exe", ".lnk"]);
        assert_eq!(
            config.alert,
            AlertConfig::JsonLines {
                path: PathBuf::from("/var/log/usb-alerts.jsonl")
            }
        );
        assert_eq!(config.monitor.poll_interval_secs, 2);
        assert_eq!(config.monitor.error_backoff_secs, 5);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(serde_json::from_str::<AgentConfig>(r#"{"smtp_server": "x"}"#).is_err());
    }

    #[test]
    fn zero_intervals_are_clamped() {
        let settings = MonitorSettings {
            poll_interval_secs: 0,
            error_backoff_secs: 0,
            no_volume_interval_secs: 60,
        };
        let config = settings.to_monitor_config();
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.error_backoff, Duration::from_secs(1));
        assert_eq!(config.no_volume_interval, Duration::from_secs(60));
    }

    #[test]
    fn load_reports_the_path_on_failure() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("missing.json");
        let err = AgentConfig::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("missing.json"));

        std::fs::write(&path, "{ not json").unwrap();
        assert!(AgentConfig::load(&path).is_err());
    }

    #[test]
    fn signature_csv_skips_header_comments_and_blanks() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("feed.csv");
        std::fs::write(
            &path,
            "sha256,label\n\
             # vendor feed 2024-05\n\
             \n\
             AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA, Worm.A\n\
             bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb\n",
        )
        .unwrap();

        let entries = load_signature_csv(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].1, "Worm.A");
        assert_eq!(entries[1].1, "Unknown");
    }
}
