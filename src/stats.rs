//! Per-logger dropped/published counters (spec §4.10).

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters tracked by a [`crate::logger::Logger`] and its
/// children (children share the same counters since they share the same
/// ring/writer).
#[derive(Default)]
pub struct Stats {
    published: AtomicU64,
    dropped_backpressure: AtomicU64,
    dropped_sampler: AtomicU64,
    writer_errors: AtomicU64,
}

/// A point-in-time snapshot returned by [`Stats::snapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub published: u64,
    pub dropped_backpressure: u64,
    pub dropped_sampler: u64,
    pub writer_errors: u64,
}

impl Stats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_published(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped_backpressure(&self) {
        self.dropped_backpressure.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped_sampler(&self) {
        self.dropped_sampler.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_writer_error(&self) {
        self.writer_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            published: self.published.load(Ordering::Relaxed),
            dropped_backpressure: self.dropped_backpressure.load(Ordering::Relaxed),
            dropped_sampler: self.dropped_sampler.load(Ordering::Relaxed),
            writer_errors: self.writer_errors.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_independently() {
        let stats = Stats::new();
        stats.record_published();
        stats.record_published();
        stats.record_dropped_backpressure();
        stats.record_writer_error();
        let snap = stats.snapshot();
        assert_eq!(snap.published, 2);
        assert_eq!(snap.dropped_backpressure, 1);
        assert_eq!(snap.dropped_sampler, 0);
        assert_eq!(snap.writer_errors, 1);
    }
}
