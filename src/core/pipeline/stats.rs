//! Counters shared by the producer and consumer threads

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Pipeline statistics
#[derive(Debug, Default)]
pub struct PipelineStats {
    bytes_read: AtomicU64,
    lines_read: AtomicU64,
    binary_chunks: AtomicU64,
    decode_errors: AtomicU64,
    published: AtomicU64,
    consumed: AtomicU64,
    records: AtomicU64,
    errors: AtomicU64,
    dropped_empty: AtomicU64,
    sink_failures: AtomicU64,
    reconnects: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub bytes_read: u64,
    pub lines_read: u64,
    pub binary_chunks: u64,
    pub decode_errors: u64,
    pub published: u64,
    pub consumed: u64,
    pub records: u64,
    pub errors: u64,
    pub dropped_empty: u64,
    pub sink_failures: u64,
    pub reconnects: u64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn read(&self, bytes: usize) {
        self.bytes_read.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn line(&self) {
        bump(&self.lines_read);
    }

    pub(crate) fn binary_chunk(&self) {
        bump(&self.binary_chunks);
    }

    pub(crate) fn decode_error(&self) {
        bump(&self.decode_errors);
    }

    pub(crate) fn published(&self) {
        bump(&self.published);
    }

    pub(crate) fn consumed(&self) {
        bump(&self.consumed);
    }

    pub(crate) fn record(&self) {
        bump(&self.records);
    }

    pub(crate) fn error(&self) {
        bump(&self.errors);
    }

    pub(crate) fn dropped_empty(&self) {
        bump(&self.dropped_empty);
    }

    pub(crate) fn sink_failure(&self) {
        bump(&self.sink_failures);
    }

    pub(crate) fn reconnected(&self) {
        bump(&self.reconnects);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            lines_read: self.lines_read.load(Ordering::Relaxed),
            binary_chunks: self.binary_chunks.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            consumed: self.consumed.load(Ordering::Relaxed),
            records: self.records.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            dropped_empty: self.dropped_empty.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
        }
    }
}

impl StatsSnapshot {
    /// Units still sitting in the queue
    pub fn in_flight(&self) -> u64 {
        self.published.saturating_sub(self.consumed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot() {
        let stats = PipelineStats::new();
        stats.read(12);
        stats.line();
        stats.published();
        stats.published();
        stats.consumed();
        let snap = stats.snapshot();
        assert_eq!(snap.bytes_read, 12);
        assert_eq!(snap.lines_read, 1);
        assert_eq!(snap.in_flight(), 1);
    }
}
