//! USBSentry: removable-storage security monitor.
//!
//! Thin binary entry point. Detection logic lives in the `usbsentry-core`
//! crate; this binary wires it to a JSON config, CSV signature feeds, a
//! rotating log file, and an alert sink.

mod alert;
mod config;
mod log_file;

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, BufRead, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use usbsentry_core::monitor::{AlertSink, Monitor};
use usbsentry_core::platform;
use usbsentry_core::scanner::SuspiciousExtensions;
use usbsentry_core::signatures::SignatureStore;

use alert::{JsonLinesAlertSink, LogAlertSink};
use config::{AgentConfig, AlertConfig};
use log_file::FileLogSink;

#[derive(Parser, Debug)]
#[command(name = "usbsentry")]
#[command(about = "Scan newly attached USB volumes for suspicious files and known malware")]
struct Args {
    #[arg(env = "USBSENTRY_CONFIG", help = "Path to the JSON configuration file")]
    config: Option<PathBuf>,

    #[arg(long, help = "Scan the volumes attached right now, then exit")]
    once: bool,
}

fn main() -> Result<()> {
    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let config = AgentConfig::load_or_default(args.config.as_deref())?;

    tracing::info!("USBSentry starting");
    let monitor = build_monitor(&config)?;

    if args.once {
        let report = monitor
            .manual_poller()
            .tick(Instant::now())
            .context("Volume enumeration failed")?;
        tracing::info!(
            "Scanned {} volumes: {} alerts, {} failures",
            report.scans_completed,
            report.alerts_sent,
            report.scan_failures
        );
        return Ok(());
    }

    monitor.start().context("Failed to start USB monitoring")?;
    wait_for_quit();
    monitor.stop();
    Ok(())
}

fn build_monitor(config: &AgentConfig) -> Result<Monitor> {
    let mut builder = Monitor::builder(platform::default_enumerator())
        .suspicious_extensions(SuspiciousExtensions::new(&config.suspicious_extensions))
        .signatures(load_signatures(config)?)
        .shared_alert_sink(alert_sink(&config.alert))
        .config(config.monitor.to_monitor_config());

    if let Some(path) = &config.log.file {
        let sink = FileLogSink::open(path, config.log.max_bytes, config.log.backups)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        builder = builder.log_sink(sink);
    }

    Ok(builder.build())
}

fn load_signatures(config: &AgentConfig) -> Result<SignatureStore> {
    let store = if config.builtin_signatures {
        SignatureStore::with_builtin_signatures()
    } else {
        SignatureStore::new()
    };

    for path in &config.signature_files {
        let entries = config::load_signature_csv(path)?;
        let summary = store.bulk_update(entries);
        tracing::info!(
            "Loaded {} signatures from {} ({} rejected)",
            summary.accepted,
            path.display(),
            summary.rejected
        );
    }

    tracing::info!("Signature database ready: {} entries", store.len());
    Ok(store)
}

fn alert_sink(config: &AlertConfig) -> Arc<dyn AlertSink> {
    match config {
        AlertConfig::Log => Arc::new(LogAlertSink),
        AlertConfig::JsonLines { path } => Arc::new(JsonLinesAlertSink::new(path.clone())),
    }
}

/// Block until `q`, `quit` or `exit` is entered, or stdin reaches EOF.
///
/// EOF on a terminal (Ctrl-D) also quits. Without an interactive stdin
/// (service managers hand out `/dev/null`) the agent runs until the process
/// is terminated.
fn wait_for_quit() {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        match line {
            Ok(l) if is_quit_command(&l) => return,
            Ok(_) => continue,
            Err(_) => break,
        }
    }
    if !keep_running_after_eof(stdin.is_terminal()) {
        return;
    }
    loop {
        std::thread::park();
    }
}

fn is_quit_command(line: &str) -> bool {
    matches!(line.trim(), "q" | "quit" | "exit")
}

fn keep_running_after_eof(interactive: bool) -> bool {
    !interactive
}
