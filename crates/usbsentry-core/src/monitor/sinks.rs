/// Collaborator interfaces: where alerts and log lines go.
///
/// The monitor never knows how an alert is transported (mail, webhook,
/// file) or how log lines are displayed. Closures implement both traits, so
/// simple embeddings need no extra types.
use crate::error::SinkError;
use crate::model::ScanResult;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Receives scan results that contain at least one finding.
pub trait AlertSink: Send + Sync {
    fn notify(&self, result: &ScanResult) -> Result<(), SinkError>;
}

impl<F> AlertSink for F
where
    F: Fn(&ScanResult) -> Result<(), SinkError> + Send + Sync,
{
    fn notify(&self, result: &ScanResult) -> Result<(), SinkError> {
        self(result)
    }
}

/// Receives every emitted event as a formatted, timestamped line.
pub trait LogSink: Send + Sync {
    fn write_line(&self, line: &str);
}

impl<F> LogSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn write_line(&self, line: &str) {
        self(line)
    }
}

/// Maximum number of lines retained by a default [`MemoryLogSink`].
///
/// Older lines are evicted first to bound memory usage.
pub const MAX_MEMORY_LOG_LINES: usize = 500;

/// Keeps the most recent log lines in memory, for a UI log pane.
pub struct MemoryLogSink {
    capacity: usize,
    lines: Mutex<VecDeque<String>>,
}

impl Default for MemoryLogSink {
    fn default() -> Self {
        Self::with_capacity(MAX_MEMORY_LOG_LINES)
    }
}

impl MemoryLogSink {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            lines: Mutex::new(VecDeque::with_capacity(capacity.clamp(1, 1024))),
        }
    }

    /// Copy of the retained lines, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }
}

impl LogSink for MemoryLogSink {
    fn write_line(&self, line: &str) {
        let mut lines = self.lines.lock();
        if lines.len() == self.capacity {
            lines.pop_front();
        }
        lines.push_back(line.to_owned());
    }
}
