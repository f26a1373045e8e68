/// One poll tick: enumerate, diff, scan what is new, report what is gone.
///
/// The [`Poller`] owns the [`MonitorState`]. The background thread keeps
/// one poller for its whole life; [`Monitor::manual_poller`] hands out
/// detached pollers for single-shot runs and tests.
///
/// [`Monitor::manual_poller`]: crate::monitor::Monitor::manual_poller
use crate::error::{ScanError, SinkError, TickError};
use crate::model::Volume;
use crate::monitor::events::MonitorEvent;
use crate::monitor::throttle::EmptinessThrottle;
use crate::monitor::{panic_message, Shared};
use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

/// Volumes known to be attached as of the last completed tick.
///
/// Replaced wholesale at the end of each tick, never edited in place.
#[derive(Debug, Clone, Default)]
pub struct MonitorState {
    known: BTreeSet<Volume>,
}

impl MonitorState {
    pub fn volumes(&self) -> &BTreeSet<Volume> {
        &self.known
    }
}

/// What a tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub attached: usize,
    pub removed: usize,
    pub scans_completed: usize,
    /// Scans that failed to open the volume root. Those volumes are left out
    /// of the known set so the next tick retries them.
    pub scan_failures: usize,
    pub alerts_sent: usize,
    pub no_volume_notice: bool,
}

impl TickReport {
    /// Whether the loop should back off before the next tick.
    pub fn is_degraded(&self) -> bool {
        self.scan_failures > 0
    }
}

pub struct Poller {
    shared: Arc<Shared>,
    state: MonitorState,
    throttle: EmptinessThrottle,
}

impl Poller {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        let throttle = EmptinessThrottle::new(shared.config.no_volume_interval);
        Self {
            shared,
            state: MonitorState::default(),
            throttle,
        }
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    /// Run one tick as of `now`.
    ///
    /// Enumeration failure is the only error; it leaves the state untouched.
    /// Every other problem is emitted as an event and counted in the report.
    pub fn tick(&mut self, now: Instant) -> Result<TickReport, TickError> {
        let current = self.shared.enumerator.list_removable_volumes()?;
        let mut report = TickReport::default();

        if current.is_empty() {
            if self.throttle.observe_empty(now) {
                self.emit(MonitorEvent::NoVolumePresent);
                report.no_volume_notice = true;
            }
        } else {
            self.throttle.reset();
        }

        let new_volumes: Vec<Volume> = current.difference(&self.state.known).cloned().collect();
        let mut failed: BTreeSet<Volume> = BTreeSet::new();

        for volume in new_volumes {
            report.attached += 1;
            self.emit(MonitorEvent::VolumeAttached {
                volume: volume.clone(),
            });
            match self.scan_new_volume(&volume) {
                Ok(alerted) => {
                    report.scans_completed += 1;
                    if alerted {
                        report.alerts_sent += 1;
                    }
                }
                Err(e) => {
                    self.emit(MonitorEvent::error(format!(
                        "Scan of {volume} failed: {e}"
                    )));
                    report.scan_failures += 1;
                    failed.insert(volume);
                }
            }
        }

        for volume in self.state.known.difference(&current) {
            report.removed += 1;
            self.emit(MonitorEvent::VolumeRemoved {
                volume: volume.clone(),
            });
        }

        let next = current.into_iter().filter(|v| !failed.contains(v)).collect();
        self.state = MonitorState { known: next };

        Ok(report)
    }

    /// Scan a freshly attached volume and hand any findings to the alert
    /// sink. Returns whether an alert was delivered.
    fn scan_new_volume(&self, volume: &Volume) -> Result<bool, ScanError> {
        self.emit(MonitorEvent::ScanStarted {
            volume: volume.clone(),
        });

        let result = self
            .shared
            .engine
            .scan(volume, self.shared.enumerator.as_ref())?;

        for warning in &result.warnings {
            self.emit(MonitorEvent::warning(format!(
                "{}: {warning}",
                volume.display_name
            )));
        }

        let clean = result.is_clean();
        self.emit(MonitorEvent::ScanCompleted {
            result: result.clone(),
        });

        if clean {
            self.emit(MonitorEvent::info(format!(
                "Initial scan complete - no suspicious files found on {volume}"
            )));
            return Ok(false);
        }

        let Some(sink) = &self.shared.alert_sink else {
            self.emit(MonitorEvent::warning(format!(
                "No alert sink configured; {} findings on {volume} not delivered",
                result.findings.len()
            )));
            return Ok(false);
        };

        // A panicking sink counts as a failed delivery; the volume is still
        // recorded as scanned.
        let delivery = panic::catch_unwind(AssertUnwindSafe(|| sink.notify(&result)))
            .unwrap_or_else(|payload| Err(SinkError::Rejected(format!(
                "alert sink panicked: {}",
                panic_message(&payload)
            ))));

        match delivery {
            Ok(()) => {
                self.emit(MonitorEvent::info(format!("Alert sent for {volume}")));
                Ok(true)
            }
            Err(e) => {
                self.emit(MonitorEvent::error(format!(
                    "Failed to send alert for {volume}: {e}"
                )));
                Ok(false)
            }
        }
    }

    pub(crate) fn emit(&self, event: MonitorEvent) {
        self.shared.emitter.emit(event);
    }
}
