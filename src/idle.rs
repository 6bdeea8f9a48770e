use std::hint;
use std::thread;
use std::time::Duration;

/// What the idle strategy wants the caller to do on this iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleAction {
    /// Retry immediately.
    Continue,
    /// Yield the thread to the scheduler, then retry.
    Yield,
    /// Sleep (park) for the given duration, then retry.
    Sleep(Duration),
}

/// The consumer's wait policy when the ring is empty, and the backoff loop
/// reused by [`crate::backpressure::BackpressurePolicy::BlockOnFull`].
///
/// Grounded in the teacher's `Backoff` (spin with `hint::spin_loop`, then
/// `thread::yield_now`), generalized into an explicit tagged sum type with
/// the two additional variants the spec requires.
#[derive(Debug, Clone, Copy)]
pub enum IdleStrategy {
    /// Continuous retry. Lowest latency, highest CPU.
    Spinning,
    /// Short busy-loop then hint-to-scheduler yield.
    Yielding,
    /// After `spin_iterations` idle iterations, park for `park`.
    Sleeping {
        spin_iterations: u32,
        park: Duration,
    },
    /// Starts spinning, escalates to yield, then to sleep of growing
    /// duration capped at `ceiling`, resetting to spin on any success.
    Progressive { ceiling: Duration },
}

impl Default for IdleStrategy {
    fn default() -> Self {
        IdleStrategy::Progressive {
            ceiling: Duration::from_micros(500),
        }
    }
}

const SPIN_LIMIT: u32 = 6;
const YIELD_LIMIT: u32 = 10;

/// Per-call mutable cursor, analogous to the teacher's `Backoff { step }`.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdleState {
    step: u32,
}

impl IdleState {
    #[must_use]
    pub fn new() -> Self {
        Self { step: 0 }
    }

    pub fn reset(&mut self) {
        self.step = 0;
    }
}

impl IdleStrategy {
    /// Never allocates; dispatch is a tight match on the tagged variant.
    pub fn on_idle(&self, state: &mut IdleState, iteration: u64) -> IdleAction {
        match self {
            IdleStrategy::Spinning => {
                hint::spin_loop();
                IdleAction::Continue
            }
            IdleStrategy::Yielding => {
                if iteration < 64 {
                    hint::spin_loop();
                    IdleAction::Continue
                } else {
                    IdleAction::Yield
                }
            }
            IdleStrategy::Sleeping {
                spin_iterations,
                park,
            } => {
                if iteration < u64::from(*spin_iterations) {
                    hint::spin_loop();
                    IdleAction::Continue
                } else {
                    IdleAction::Sleep(*park)
                }
            }
            IdleStrategy::Progressive { ceiling } => {
                let step = state.step;
                if step <= SPIN_LIMIT {
                    let spins = 1u32 << step;
                    for _ in 0..spins {
                        hint::spin_loop();
                    }
                    state.step += 1;
                    IdleAction::Continue
                } else if step <= YIELD_LIMIT {
                    state.step += 1;
                    IdleAction::Yield
                } else {
                    let exponent = (step - YIELD_LIMIT).min(10);
                    let nanos = (1u64 << exponent).saturating_mul(1_000);
                    let duration = Duration::from_nanos(nanos).min(*ceiling);
                    state.step = state.step.saturating_add(1);
                    IdleAction::Sleep(duration)
                }
            }
        }
    }

    /// Applies the computed action: yields or parks on the calling thread.
    /// `Continue` performs no wait — the caller's loop re-polls immediately.
    pub fn apply(&self, state: &mut IdleState, iteration: u64) {
        match self.on_idle(state, iteration) {
            IdleAction::Continue => {}
            IdleAction::Yield => thread::yield_now(),
            IdleAction::Sleep(d) => thread::sleep(d),
        }
    }

    /// Resets the state machine to its initial (spinning) phase, called by
    /// the consumer loop after any successful consume.
    pub fn on_success(&self, state: &mut IdleState) {
        state.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progressive_escalates_then_resets() {
        let strategy = IdleStrategy::default();
        let mut state = IdleState::new();
        let mut saw_yield = false;
        let mut saw_sleep = false;
        for i in 0..40 {
            match strategy.on_idle(&mut state, i) {
                IdleAction::Yield => saw_yield = true,
                IdleAction::Sleep(_) => saw_sleep = true,
                IdleAction::Continue => {}
            }
        }
        assert!(saw_yield);
        assert!(saw_sleep);
        strategy.on_success(&mut state);
        assert_eq!(state.step, 0);
    }

    #[test]
    fn spinning_never_yields_or_sleeps() {
        let strategy = IdleStrategy::Spinning;
        let mut state = IdleState::new();
        for i in 0..100 {
            assert_eq!(strategy.on_idle(&mut state, i), IdleAction::Continue);
        }
    }
}
