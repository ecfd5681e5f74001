//! Logging sinks used by the read and write paths.
//!
//! Retry warnings and exhaustion errors go through a [`LogSink`] rather than
//! straight to `tracing`, so hosts can buffer them and tests can count them.

use parking_lot::Mutex;

/// Fire-and-forget log destination
pub trait LogSink: Send + Sync {
    fn debug(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards every message to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn debug(&self, message: &str) {
        tracing::debug!(target: "replay_store", "{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "replay_store", "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "replay_store", "{}", message);
    }
}

/// Holds debug lines back until something goes wrong.
///
/// Debug messages are timestamped and buffered; an error flushes the buffer
/// first so the failure is logged with the context that led to it. Hosts call
/// [`BufferedSink::clear`] at the start of each request.
#[derive(Debug, Default)]
pub struct BufferedSink {
    buffer: Mutex<Vec<String>>,
}

impl BufferedSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop buffered debug lines without emitting them
    pub fn clear(&self) {
        self.buffer.lock().clear();
    }

    /// Number of debug lines waiting for a flush
    pub fn buffered(&self) -> usize {
        self.buffer.lock().len()
    }

    fn flush(&self) -> Vec<String> {
        std::mem::take(&mut *self.buffer.lock())
    }
}

impl LogSink for BufferedSink {
    fn debug(&self, message: &str) {
        let line = format!("{} {}", chrono::Utc::now().to_rfc3339(), message);
        self.buffer.lock().push(line);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "replay_store", "{}", message);
    }

    fn error(&self, message: &str) {
        let lines = self.flush();
        if !lines.is_empty() {
            tracing::info!(target: "replay_store", "debug buffer ({} lines)", lines.len());
            for line in &lines {
                tracing::debug!(target: "replay_store", "{}", line);
            }
            tracing::info!(target: "replay_store", "end debug buffer");
        }
        tracing::error!(target: "replay_store", "{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffered_sink_flushes_on_error() {
        let sink = BufferedSink::new();
        sink.debug("fetching replay");
        sink.debug("payload too short");
        assert_eq!(sink.buffered(), 2);

        sink.warn("warnings are not buffered");
        assert_eq!(sink.buffered(), 2);

        sink.error("could not load replay");
        assert_eq!(sink.buffered(), 0);
    }

    #[test]
    fn test_buffered_sink_clear() {
        let sink = BufferedSink::new();
        sink.debug("stale line");
        sink.clear();
        assert_eq!(sink.buffered(), 0);
    }
}
