//! The sampler half of the level/sampler gate (spec §4.1, C1).

use crate::field::Field;
use crate::level::Level;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// What a [`Sampler`] decides for one candidate record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleDecision {
    Emit,
    Drop,
}

/// Optional predicate consulted after the level gate passes.
///
/// A panicking sampler is isolated by the caller (see
/// [`sample_with_isolation`]): its panic is caught, reported via the
/// internal error hook, and treated as [`SampleDecision::Emit`] — sampling
/// is a pure optimization, never a correctness gate, so a broken sampler
/// must fail open.
pub trait Sampler: Send + Sync {
    fn sample(&self, level: Level, message: &str, fields: &[Field]) -> SampleDecision;

    /// Snapshot of `{sampled, dropped}` counters, if the sampler tracks
    /// them. The default token-bucket sampler does; a custom sampler may
    /// return `(0, 0)`.
    fn counters(&self) -> (u64, u64) {
        (0, 0)
    }
}

/// Runs `sampler.sample(...)`, catching panics and treating them as
/// "emit" per the fail-open contract. Returns the decision plus an
/// optional panic payload message for the caller to route to the error
/// hook.
pub fn sample_with_isolation(
    sampler: &dyn Sampler,
    level: Level,
    message: &str,
    fields: &[Field],
) -> (SampleDecision, Option<String>) {
    match panic::catch_unwind(AssertUnwindSafe(|| sampler.sample(level, message, fields))) {
        Ok(decision) => (decision, None),
        Err(payload) => {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "sampler panicked".to_string());
            (SampleDecision::Emit, Some(msg))
        }
    }
}

/// Token-bucket sampler: `initial` records pass per `window`, then only
/// 1-in-`thereafter` pass until the window refills.
pub struct TokenBucketSampler {
    initial: u64,
    thereafter: u64,
    window: Duration,
    window_start: std::sync::Mutex<Instant>,
    window_count: AtomicU64,
    sampled: AtomicU64,
    dropped: AtomicU64,
}

impl TokenBucketSampler {
    #[must_use]
    pub fn new(initial: u64, thereafter: u64, window: Duration) -> Self {
        Self {
            initial,
            thereafter: thereafter.max(1),
            window,
            window_start: std::sync::Mutex::new(Instant::now()),
            window_count: AtomicU64::new(0),
            sampled: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Refills the window if it has elapsed, returning the 1-indexed
    /// ordinal of this record within the (possibly just-refilled) window.
    fn advance_window(&self) -> u64 {
        let mut start = self.window_start.lock().unwrap_or_else(|e| e.into_inner());
        if start.elapsed() >= self.window {
            *start = Instant::now();
            self.window_count.store(0, Ordering::Relaxed);
        }
        self.window_count.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl Sampler for TokenBucketSampler {
    fn sample(&self, _level: Level, _message: &str, _fields: &[Field]) -> SampleDecision {
        let ordinal = self.advance_window();
        let decision = if ordinal <= self.initial {
            SampleDecision::Emit
        } else {
            let past_initial = ordinal - self.initial;
            if past_initial % self.thereafter == 1 || self.thereafter == 1 {
                SampleDecision::Emit
            } else {
                SampleDecision::Drop
            }
        };
        match decision {
            SampleDecision::Emit => self.sampled.fetch_add(1, Ordering::Relaxed),
            SampleDecision::Drop => self.dropped.fetch_add(1, Ordering::Relaxed),
        };
        decision
    }

    fn counters(&self) -> (u64, u64) {
        (
            self.sampled.load(Ordering::Relaxed),
            self.dropped.load(Ordering::Relaxed),
        )
    }
}
