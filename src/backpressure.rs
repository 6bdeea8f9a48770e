use crate::idle::IdleStrategy;

/// Producer behavior when the ring is full.
///
/// Grounded in the teacher's `reserve()` (never blocks, returns `None`) vs.
/// `reserve_with_backoff()` (blocks with `Backoff` until success or
/// closed) — the same drop-vs-block distinction, promoted to an explicit
/// named policy type instead of two differently-named methods.
#[derive(Debug, Clone, Copy, Default)]
pub enum BackpressurePolicy {
    /// Producer returns drop immediately; never blocks. Default.
    #[default]
    DropOnFull,
    /// Producer re-enters the claim loop with `idle`'s backoff until the
    /// slot becomes writable or the logger transitions to Closing.
    BlockOnFull { idle: IdleStrategy },
}

impl BackpressurePolicy {
    #[must_use]
    pub fn block_on_full() -> Self {
        BackpressurePolicy::BlockOnFull {
            idle: IdleStrategy::default(),
        }
    }
}
