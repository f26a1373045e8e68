/// Events emitted by the monitor and the fan-out that delivers them.
///
/// Every event is logged through `tracing`, written as a timestamped line
/// to each registered [`LogSink`], and offered to the subscriber channel
/// once someone has subscribed.
use crate::model::{ScanResult, Volume};
use crate::monitor::panic_message;
use crate::monitor::sinks::LogSink;
use chrono::{DateTime, Local};
use crossbeam_channel::{Sender, TrySendError};
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Severity used for log lines and `tracing` levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventLevel {
    Info,
    Warning,
    Error,
}

impl EventLevel {
    pub fn label(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

/// Something observers need to know about.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum MonitorEvent {
    VolumeAttached { volume: Volume },
    VolumeRemoved { volume: Volume },
    /// No removable volume has been present for a full throttle window.
    NoVolumePresent,
    ScanStarted { volume: Volume },
    /// Emitted for every finished scan, clean or not.
    ScanCompleted { result: ScanResult },
    Info { message: String },
    Warning { message: String },
    Error { message: String },
}

impl MonitorEvent {
    pub fn info(message: impl Into<String>) -> Self {
        Self::Info {
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::Warning {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn level(&self) -> EventLevel {
        match self {
            Self::Warning { .. } => EventLevel::Warning,
            Self::Error { .. } => EventLevel::Error,
            Self::ScanCompleted { result } if !result.is_clean() => EventLevel::Warning,
            _ => EventLevel::Info,
        }
    }

    /// One-line human-readable description.
    pub fn message(&self) -> String {
        match self {
            Self::VolumeAttached { volume } => format!("New USB drive detected: {volume}"),
            Self::VolumeRemoved { volume } => format!("USB drive removed: {volume}"),
            Self::NoVolumePresent => "No USB drives connected".to_owned(),
            Self::ScanStarted { volume } => {
                format!("Starting one-time scan of newly inserted drive: {volume}")
            }
            Self::ScanCompleted { result } if result.is_clean() => format!(
                "Scan of {} complete: {} files, no suspicious files found",
                result.volume, result.files_examined
            ),
            Self::ScanCompleted { result } => format!(
                "Found {} suspicious files during initial scan of {} ({} known malware)",
                result.findings.len(),
                result.volume,
                result.malware_count()
            ),
            Self::Info { message } | Self::Warning { message } | Self::Error { message } => {
                message.clone()
            }
        }
    }
}

/// An event stamped with the local time it was emitted.
#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    pub at: DateTime<Local>,
    pub event: MonitorEvent,
}

impl EventRecord {
    pub fn now(event: MonitorEvent) -> Self {
        Self {
            at: Local::now(),
            event,
        }
    }

    /// `2024-05-01 14:03:22 - WARNING - Suspicious file ...`
    pub fn log_line(&self) -> String {
        format!(
            "{} - {} - {}",
            self.at.format("%Y-%m-%d %H:%M:%S"),
            self.event.level().label(),
            self.event.message()
        )
    }
}

/// Delivers events to `tracing`, the log sinks, and the subscriber channel.
pub(crate) struct EventEmitter {
    tx: Sender<EventRecord>,
    log_sinks: Vec<Arc<dyn LogSink>>,
    /// Nothing is queued until the first subscriber.
    subscribed: AtomicBool,
}

impl EventEmitter {
    pub(crate) fn new(tx: Sender<EventRecord>, log_sinks: Vec<Arc<dyn LogSink>>) -> Self {
        Self {
            tx,
            log_sinks,
            subscribed: AtomicBool::new(false),
        }
    }

    /// Start queueing events for subscribers.
    pub(crate) fn mark_subscribed(&self) {
        self.subscribed.store(true, Ordering::Release);
    }

    pub(crate) fn emit(&self, event: MonitorEvent) {
        let record = EventRecord::now(event);
        let message = record.event.message();
        match record.event.level() {
            EventLevel::Info => info!("{message}"),
            EventLevel::Warning => warn!("{message}"),
            EventLevel::Error => error!("{message}"),
        }

        if !self.log_sinks.is_empty() {
            let line = record.log_line();
            for sink in &self.log_sinks {
                // A panicking sink loses this line and nothing else.
                if let Err(payload) =
                    panic::catch_unwind(AssertUnwindSafe(|| sink.write_line(&line)))
                {
                    debug!("Log sink panicked, line dropped: {}", panic_message(&payload));
                }
            }
        }

        if !self.subscribed.load(Ordering::Acquire) {
            return;
        }
        // Nobody draining the channel must never stall the monitor.
        if let Err(TrySendError::Full(dropped)) = self.tx.try_send(record) {
            debug!("Event channel full, dropping: {}", dropped.event.message());
        }
    }
}
