/// Alert rendering and delivery for infected volumes.
///
/// The core hands every non-clean [`ScanResult`] to one [`AlertSink`]; the
/// sinks here turn it into an [`AlertReport`] and either log it or append it
/// to a JSON-lines file that an external mailer or SIEM forwarder can tail.
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use usbsentry_core::model::ScanResult;
use usbsentry_core::monitor::AlertSink;
use usbsentry_core::SinkError;

pub const ALERT_SUBJECT: &str = "USB Security Alert - Suspicious Files Detected";

/// A rendered alert.
#[derive(Debug, Clone, Serialize)]
pub struct AlertReport<'a> {
    pub subject: &'static str,
    pub generated_at: DateTime<Local>,
    pub body: String,
    pub result: &'a ScanResult,
}

impl<'a> AlertReport<'a> {
    pub fn new(result: &'a ScanResult, generated_at: DateTime<Local>) -> Self {
        Self {
            subject: ALERT_SUBJECT,
            generated_at,
            body: render_body(result, generated_at),
            result,
        }
    }
}

fn render_body(result: &ScanResult, at: DateTime<Local>) -> String {
    let volume = &result.volume;
    let mut body = String::from("USB Security Alert\n\nDrive Information:\n");
    body.push_str(&format!("- Name: {}\n", volume.display_name));
    body.push_str(&format!("- Type: {}\n", volume.kind.label()));
    body.push_str(&format!("- Path: {}\n\n", volume.identifier.display()));
    body.push_str(&format!("Time: {}\n\n", at.format("%Y-%m-%d %H:%M:%S")));
    body.push_str("Suspicious files detected:\n");
    for finding in &result.findings {
        body.push_str(&format!("{finding}\n"));
    }
    body.push_str("\nThis is an automated alert from your USB Security Monitor.\n");
    body
}

/// Writes each alert through `tracing` at WARN.
#[derive(Debug, Default)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn notify(&self, result: &ScanResult) -> Result<(), SinkError> {
        let report = AlertReport::new(result, Local::now());
        tracing::warn!("{}\n{}", report.subject, report.body);
        Ok(())
    }
}

/// Appends one JSON document per alert to a file.
pub struct JsonLinesAlertSink {
    path: PathBuf,
    // Serialises appends from concurrent notifies.
    write_lock: Mutex<()>,
}

impl JsonLinesAlertSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AlertSink for JsonLinesAlertSink {
    fn notify(&self, result: &ScanResult) -> Result<(), SinkError> {
        let report = AlertReport::new(result, Local::now());
        let mut line = serde_json::to_vec(&report)
            .map_err(|e| SinkError::Rejected(format!("cannot serialise alert: {e}")))?;
        line.push(b'\n');

        let _guard = self.write_lock.lock();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&line)?;
        file.flush()?;
        Ok(())
    }
}
