/// Removable-volume monitor: polls for attach/detach and scans new volumes.
///
/// All polling, enumeration, and scanning run on one dedicated background
/// thread. The caller's thread is never blocked except by [`Monitor::stop`],
/// which joins that thread.
///
/// # Usage
///
/// ```ignore
/// let monitor = Monitor::builder(platform::default_enumerator())
///     .signatures(SignatureStore::with_builtin_signatures())
///     .alert_sink(my_sink)
///     .build();
/// let events = monitor.subscribe();
/// monitor.start()?;
/// // receive EventRecords on `events`
/// monitor.stop();
/// ```
///
/// # Cancellation
///
/// `stop()` drops the stop channel's sender. The thread notices during its
/// inter-tick sleep, or right after the current tick; a scan in progress
/// always runs to completion and emits `ScanCompleted` first.
pub mod events;
pub mod poller;
pub mod sinks;
pub mod throttle;

pub use events::{EventLevel, EventRecord, MonitorEvent};
pub use poller::{MonitorState, Poller, TickReport};
pub use sinks::{AlertSink, LogSink, MemoryLogSink};

use crate::error::{MonitorError, TickError};
use crate::model::{DriveInfo, Volume};
use crate::platform::{self, VolumeEnumerator};
use crate::scanner::{ScanEngine, SuspiciousExtensions};
use crate::signatures::{SignatureStore, UpdateSummary};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use events::EventEmitter;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// Maximum number of events that may queue up for subscribers.
///
/// Events beyond this are dropped (and still logged) rather than blocking
/// the monitor thread when nobody drains the channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 2048;

/// Loop timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Sleep between healthy ticks.
    pub poll_interval: Duration,
    /// Sleep after a failed or degraded tick.
    pub error_backoff: Duration,
    /// Window for the "no device connected" notice.
    pub no_volume_interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            error_backoff: Duration::from_secs(5),
            no_volume_interval: throttle::NO_VOLUME_INTERVAL,
        }
    }
}

/// State shared between the `Monitor` handle and its thread.
pub(crate) struct Shared {
    pub(crate) enumerator: Arc<dyn VolumeEnumerator>,
    pub(crate) engine: ScanEngine,
    pub(crate) alert_sink: Option<Arc<dyn AlertSink>>,
    pub(crate) emitter: EventEmitter,
    pub(crate) config: MonitorConfig,
}

struct Worker {
    stop_tx: Sender<()>,
    thread: thread::JoinHandle<()>,
}

/// Handle to the monitor. Dropping it stops the background thread.
pub struct Monitor {
    shared: Arc<Shared>,
    events_rx: Receiver<EventRecord>,
    worker: Mutex<Option<Worker>>,
}

/// Builder for [`Monitor`].
pub struct MonitorBuilder {
    enumerator: Arc<dyn VolumeEnumerator>,
    extensions: SuspiciousExtensions,
    signatures: SignatureStore,
    alert_sink: Option<Arc<dyn AlertSink>>,
    log_sinks: Vec<Arc<dyn LogSink>>,
    config: MonitorConfig,
    event_capacity: usize,
}

impl MonitorBuilder {
    /// Suspicious extensions (default: the built-in list).
    pub fn suspicious_extensions(mut self, extensions: SuspiciousExtensions) -> Self {
        self.extensions = extensions;
        self
    }

    /// Signature database (default: empty).
    pub fn signatures(mut self, signatures: SignatureStore) -> Self {
        self.signatures = signatures;
        self
    }

    pub fn alert_sink(mut self, sink: impl AlertSink + 'static) -> Self {
        self.alert_sink = Some(Arc::new(sink));
        self
    }

    pub fn shared_alert_sink(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.alert_sink = Some(sink);
        self
    }

    pub fn log_sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.log_sinks.push(Arc::new(sink));
        self
    }

    pub fn shared_log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.log_sinks.push(sink);
        self
    }

    pub fn config(mut self, config: MonitorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    pub fn build(self) -> Monitor {
        let (tx, rx) = bounded::<EventRecord>(self.event_capacity);
        let shared = Shared {
            enumerator: self.enumerator,
            engine: ScanEngine::new(self.extensions, self.signatures),
            alert_sink: self.alert_sink,
            emitter: EventEmitter::new(tx, self.log_sinks),
            config: self.config,
        };
        Monitor {
            shared: Arc::new(shared),
            events_rx: rx,
            worker: Mutex::new(None),
        }
    }
}

impl Monitor {
    pub fn builder(enumerator: Arc<dyn VolumeEnumerator>) -> MonitorBuilder {
        MonitorBuilder {
            enumerator,
            extensions: SuspiciousExtensions::defaults(),
            signatures: SignatureStore::new(),
            alert_sink: None,
            log_sinks: Vec::new(),
            config: MonitorConfig::default(),
            event_capacity: EVENT_CHANNEL_CAPACITY,
        }
    }

    /// Start polling on a background thread. No-op when already running.
    pub fn start(&self) -> Result<(), MonitorError> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Ok(());
        }

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let poller = Poller::new(Arc::clone(&self.shared));
        let config = self.shared.config;

        let thread = thread::Builder::new()
            .name("usbsentry-monitor".to_owned())
            .spawn(move || run_monitor(poller, stop_rx, config))
            .map_err(MonitorError::Spawn)?;

        *worker = Some(Worker { stop_tx, thread });
        self.shared
            .emitter
            .emit(MonitorEvent::info("USB monitoring started"));
        Ok(())
    }

    /// Stop polling and wait for the thread to exit. No-op when stopped.
    ///
    /// Blocks until any scan in progress has completed.
    pub fn stop(&self) {
        let Some(worker) = self.worker.lock().take() else {
            return;
        };
        drop(worker.stop_tx);
        if worker.thread.join().is_err() {
            error!("Monitor thread panicked during shutdown");
        }
        self.shared
            .emitter
            .emit(MonitorEvent::info("USB monitoring stopped"));
    }

    pub fn is_running(&self) -> bool {
        self.worker.lock().is_some()
    }

    /// A receiver for emitted events.
    ///
    /// Receivers share one queue: each event goes to exactly one of them.
    /// Events emitted before the first call are traced and logged but not
    /// queued.
    pub fn subscribe(&self) -> Receiver<EventRecord> {
        self.shared.emitter.mark_subscribed();
        self.events_rx.clone()
    }

    /// Removable volumes attached right now. An enumeration failure is
    /// reported as an `Error` event and yields an empty set.
    pub fn list_current_volumes(&self) -> BTreeSet<Volume> {
        match self.shared.enumerator.list_removable_volumes() {
            Ok(volumes) => volumes,
            Err(e) => {
                self.shared
                    .emitter
                    .emit(MonitorEvent::error(format!("Error getting drives: {e}")));
                BTreeSet::new()
            }
        }
    }

    /// Display metadata for `volume`; never fails.
    pub fn drive_info(&self, volume: &Volume) -> DriveInfo {
        platform::drive_info(self.shared.enumerator.as_ref(), &volume.identifier)
    }

    /// Replace the suspicious-extension set for scans started from now on.
    pub fn update_suspicious_extensions<I, S>(&self, extensions: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set = SuspiciousExtensions::new(extensions);
        let listed: Vec<&str> = set.iter().collect();
        let message = format!("Updated suspicious extensions: {}", listed.join(", "));
        self.shared.engine.set_suspicious_extensions(set);
        self.shared.emitter.emit(MonitorEvent::info(message));
    }

    /// Add or overwrite signatures. Scans already running are unaffected.
    pub fn update_signatures<I, K, L>(&self, entries: I) -> UpdateSummary
    where
        I: IntoIterator<Item = (K, L)>,
        K: AsRef<str>,
        L: AsRef<str>,
    {
        let summary = self.shared.engine.signatures().bulk_update(entries);
        if summary.rejected > 0 {
            self.shared.emitter.emit(MonitorEvent::warning(format!(
                "Ignored {} malformed signatures",
                summary.rejected
            )));
        }
        self.shared.emitter.emit(MonitorEvent::info(format!(
            "Signature database updated: {} entries added",
            summary.accepted
        )));
        summary
    }

    pub fn signatures(&self) -> &SignatureStore {
        self.shared.engine.signatures()
    }

    pub fn suspicious_extensions(&self) -> Arc<SuspiciousExtensions> {
        self.shared.engine.suspicious_extensions()
    }

    /// A poller with fresh state that shares this monitor's enumerator,
    /// engine and sinks, for driving ticks by hand.
    pub fn manual_poller(&self) -> Poller {
        Poller::new(Arc::clone(&self.shared))
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.stop();
    }
}

// ─── Background thread ──────────────────────────────────────────────────────

/// Tick, then sleep on the stop channel, until the sender is dropped.
fn run_monitor(mut poller: Poller, stop_rx: Receiver<()>, config: MonitorConfig) {
    debug!("Monitor: starting");

    loop {
        let now = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| poller.tick(now)))
            .unwrap_or_else(|payload| Err(TickError::Panicked(panic_message(&payload))));

        let wait = match outcome {
            Ok(report) if report.is_degraded() => config.error_backoff,
            Ok(_) => config.poll_interval,
            Err(e) => {
                poller.emit(MonitorEvent::error(format!("Error in monitor loop: {e}")));
                config.error_backoff
            }
        };

        match stop_rx.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!("Monitor: stopped");
}

pub(crate) fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}
