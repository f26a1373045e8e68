/// Rate limit for the "no device connected" notice.
///
/// The notice fires once a full interval of continuous emptiness has
/// elapsed, then at most once per interval while the host stays empty. Any
/// tick with a volume present resets the window.
use std::time::{Duration, Instant};

/// Default window between notices.
pub const NO_VOLUME_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct EmptinessThrottle {
    interval: Duration,
    /// Start of the current window: first empty tick, or the last notice.
    window_start: Option<Instant>,
}

impl EmptinessThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            window_start: None,
        }
    }

    /// Record an empty tick at `now`; returns `true` when the notice is due.
    pub fn observe_empty(&mut self, now: Instant) -> bool {
        match self.window_start {
            None => {
                self.window_start = Some(now);
                false
            }
            Some(start) if now.saturating_duration_since(start) >= self.interval => {
                self.window_start = Some(now);
                true
            }
            Some(_) => false,
        }
    }

    /// A volume is present; the next empty tick starts a new window.
    pub fn reset(&mut self) {
        self.window_start = None;
    }
}

impl Default for EmptinessThrottle {
    fn default() -> Self {
        Self::new(NO_VOLUME_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn two_empty_ticks_seventy_seconds_apart_notify_once() {
        let t0 = Instant::now();
        let mut throttle = EmptinessThrottle::default();
        let fired = [throttle.observe_empty(t0), throttle.observe_empty(t0 + secs(70))];
        assert_eq!(fired.iter().filter(|f| **f).count(), 1);
    }

    #[test]
    fn one_second_ticks_notify_once_per_minute() {
        let t0 = Instant::now();
        let mut throttle = EmptinessThrottle::default();
        let count = (0..=180)
            .filter(|s| throttle.observe_empty(t0 + secs(*s)))
            .count();
        // Due at 60, 120 and 180.
        assert_eq!(count, 3);
    }

    #[test]
    fn presence_resets_the_window() {
        let t0 = Instant::now();
        let mut throttle = EmptinessThrottle::default();
        assert!(!throttle.observe_empty(t0));
        throttle.reset();
        assert!(!throttle.observe_empty(t0 + secs(59)));
        assert!(!throttle.observe_empty(t0 + secs(100)));
        assert!(throttle.observe_empty(t0 + secs(119)));
    }
}
