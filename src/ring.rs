//! The bounded MPSC ring buffer — the core of the core.
//!
//! A single shared ring of `capacity` slots (a power of two), each carrying
//! its own sequence number. Producers race to claim the next slot with a
//! CAS on a shared cursor; the consumer is the sole reader and needs no
//! atomics of its own beyond the slot sequence it polls.
//!
//! # Memory ordering
//!
//! - Slot-sequence loads: `Acquire` — synchronizes with the `Release` store
//!   that published (or re-armed) the slot.
//! - Slot-sequence stores (publish, re-arm): `Release` — makes the written
//!   value visible to whichever side polls next.
//! - Cursor loads: `Relaxed` — the following slot-sequence `Acquire` load
//!   is what actually establishes the happens-before edge; the cursor
//!   itself is just an ever-advancing hint of where to look next.
//! - Cursor CAS (producer): `Relaxed` success/failure orderings are
//!   sufficient because the slot-sequence acquire/release pair is what
//!   carries the data dependency, not the cursor itself.
//!
//! This is the classic single-ring LMAX Disruptor MPSC variant: a slot with
//! sequence `s` is writable by a producer exactly when `s == p` (the
//! producer's claimed cursor value) and readable by the consumer exactly
//! when `s == c + 1`. A consumer that finishes with a slot re-arms it to
//! `c + 1 + capacity`, so the next producer lap (`p == c + capacity`) sees
//! the slot become writable again.

use crate::invariants::{
    debug_assert_monotonic, debug_assert_no_wrap, debug_assert_slot_ready,
    debug_assert_slot_writable,
};
use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Returned by [`Ring::try_claim`]/[`Ring::try_publish`] when every slot is
/// currently occupied — i.e. `producer_cursor - consumer_cursor ==
/// capacity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingFull;

struct Slot<T> {
    seq: CachePadded<AtomicU64>,
    value: UnsafeCell<MaybeUninit<T>>,
}

// Safety: a slot's `value` is written by exactly one producer between a
// successful claim and its publish, and read by exactly one consumer
// between a successful poll and its re-arm; the sequence number is the
// sole coordination mechanism and is always accessed atomically.
unsafe impl<T: Send> Sync for Slot<T> {}

/// A bounded, lock-free multi-producer single-consumer queue of `T`.
///
/// Used by [`crate::logger::Logger`] with `T = Box<Record>`: the record is
/// filled by the producer before the (cheap, pointer-sized) move into the
/// slot, so no large `Record` value is ever copied through the ring.
pub struct Ring<T> {
    slots: Box<[Slot<T>]>,
    mask: u64,
    capacity: u64,
    producer_cursor: CachePadded<AtomicU64>,
    consumer_cursor: CachePadded<AtomicU64>,
    closing: AtomicBool,
}

// Safety: `Ring<T>` hands `T` values between threads strictly through the
// slot-sequence protocol; it never exposes shared mutable access outside
// of it.
unsafe impl<T: Send> Send for Ring<T> {}
unsafe impl<T: Send> Sync for Ring<T> {}

impl<T> Ring<T> {
    /// Builds a ring of `capacity` slots.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is not a power of two or is less than 2.
    /// [`crate::config::Config`] validates this before construction so a
    /// misconfigured `capacity` is reported as a `ConfigError` rather than
    /// a panic in normal use.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 2, "ring capacity must be at least 2");
        assert!(
            capacity.is_power_of_two(),
            "ring capacity must be a power of two, got {capacity}"
        );
        let slots = (0..capacity as u64)
            .map(|i| Slot {
                seq: CachePadded::new(AtomicU64::new(i)),
                value: UnsafeCell::new(MaybeUninit::uninit()),
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            slots,
            mask: capacity as u64 - 1,
            capacity: capacity as u64,
            producer_cursor: CachePadded::new(AtomicU64::new(0)),
            consumer_cursor: CachePadded::new(AtomicU64::new(0)),
            closing: AtomicBool::new(false),
        }
    }

    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }

    /// Producer cursor minus consumer cursor: an instantaneous, possibly
    /// already-stale, count of records awaiting the consumer.
    #[must_use]
    pub fn len(&self) -> usize {
        let p = self.producer_cursor.load(Ordering::Relaxed);
        let c = self.consumer_cursor.load(Ordering::Relaxed);
        p.wrapping_sub(c) as usize
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Marks the ring as closing: existing in-flight slots still drain
    /// normally, but [`Ring::is_closing`] becomes visible to callers
    /// deciding whether to keep retrying a `BlockOnFull` publish.
    pub fn mark_closing(&self) {
        self.closing.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    /// One attempt at the producer claim-publish algorithm (spec §4.3).
    ///
    /// On success, `value` has been moved into the claimed slot and the
    /// slot's sequence has been published; the consumer may now observe
    /// it. On failure (ring full), `value` is handed back unchanged.
    pub fn try_publish(&self, value: T) -> Result<(), T> {
        match self.try_claim() {
            Ok(cursor) => {
                let idx = (cursor & self.mask) as usize;
                unsafe {
                    (*self.slots[idx].value.get()).write(value);
                }
                let new_seq = cursor.wrapping_add(1);
                self.slots[idx].seq.store(new_seq, Ordering::Release);
                Ok(())
            }
            Err(RingFull) => Err(value),
        }
    }

    /// Claims the next writable slot without filling it, returning the
    /// claimed cursor value. The caller must pair a successful claim with
    /// exactly one [`Ring::write_claimed`] followed by
    /// [`Ring::publish_claimed`] — used by [`crate::logger::Logger::log_fn`]
    /// so the fill closure only runs once the slot is actually owned.
    pub fn try_claim(&self) -> Result<u64, RingFull> {
        let mut p = self.producer_cursor.load(Ordering::Relaxed);
        loop {
            let idx = (p & self.mask) as usize;
            let seq = self.slots[idx].seq.load(Ordering::Acquire);
            // seq == p: slot is free for this lap (writable).
            // seq < p (mod wraparound): a lap behind, ring is full.
            // seq > p: another producer has already advanced the cursor
            // past our stale read; reload and retry.
            if seq == p {
                debug_assert_slot_writable!(seq, p);
                match self.producer_cursor.compare_exchange_weak(
                    p,
                    p.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        debug_assert_monotonic!("producer_cursor", p, p.wrapping_add(1));
                        return Ok(p);
                    }
                    Err(actual) => {
                        p = actual;
                        continue;
                    }
                }
            } else if (seq.wrapping_sub(p) as i64) < 0 {
                return Err(RingFull);
            } else {
                p = self.producer_cursor.load(Ordering::Relaxed);
            }
        }
    }

    /// Writes `value` into a slot claimed by [`Ring::try_claim`]. Must be
    /// called exactly once per claimed `cursor`, before
    /// [`Ring::publish_claimed`].
    ///
    /// # Safety
    ///
    /// `cursor` must be a value returned by a `try_claim` call that has not
    /// yet been published, and no other thread may write to the same
    /// claimed slot concurrently (guaranteed because only the claiming
    /// thread holds `cursor`).
    pub unsafe fn write_claimed(&self, cursor: u64, value: T) {
        let idx = (cursor & self.mask) as usize;
        (*self.slots[idx].value.get()).write(value);
    }

    /// Publishes a slot previously claimed and written, making it visible
    /// to the consumer.
    pub fn publish_claimed(&self, cursor: u64) {
        let idx = (cursor & self.mask) as usize;
        self.slots[idx].seq.store(cursor.wrapping_add(1), Ordering::Release);
    }

    /// One attempt at the consumer drain algorithm (spec §4.3). Returns
    /// `None` when the next slot is not yet ready (the ring is empty from
    /// the consumer's point of view).
    pub fn try_consume(&self) -> Option<T> {
        let c = self.consumer_cursor.load(Ordering::Relaxed);
        let idx = (c & self.mask) as usize;
        let seq = self.slots[idx].seq.load(Ordering::Acquire);
        let expected = c.wrapping_add(1);
        if seq == expected {
            debug_assert_slot_ready!(seq, c);
            let value = unsafe { (*self.slots[idx].value.get()).assume_init_read() };
            let rearmed = expected.wrapping_add(self.capacity);
            self.slots[idx].seq.store(rearmed, Ordering::Release);
            let next_c = c.wrapping_add(1);
            debug_assert_monotonic!("consumer_cursor", c, next_c);
            debug_assert_no_wrap!("consumer_cursor", c, next_c);
            self.consumer_cursor.store(next_c, Ordering::Relaxed);
            Some(value)
        } else {
            None
        }
    }
}

impl<T> Drop for Ring<T> {
    fn drop(&mut self) {
        // Drain and drop any values still owned by in-flight slots so a
        // ring holding heap-owning T (e.g. Box<Record>) never leaks.
        while self.try_consume().is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn publish_then_consume_in_order() {
        let ring: Ring<u32> = Ring::new(4);
        for i in 0..4 {
            ring.try_publish(i).unwrap();
        }
        assert!(ring.try_publish(99).is_err());
        for i in 0..4 {
            assert_eq!(ring.try_consume(), Some(i));
        }
        assert_eq!(ring.try_consume(), None);
    }

    #[test]
    fn slot_is_reusable_after_drain() {
        let ring: Ring<u32> = Ring::new(2);
        for lap in 0..10 {
            ring.try_publish(lap).unwrap();
            ring.try_publish(lap + 1).unwrap();
            assert!(ring.try_publish(0).is_err());
            assert_eq!(ring.try_consume(), Some(lap));
            assert_eq!(ring.try_consume(), Some(lap + 1));
        }
    }

    #[test]
    fn claim_write_publish_matches_try_publish() {
        let ring: Ring<u32> = Ring::new(4);
        let cursor = ring.try_claim().unwrap();
        unsafe { ring.write_claimed(cursor, 7) };
        ring.publish_claimed(cursor);
        assert_eq!(ring.try_consume(), Some(7));
    }

    #[test]
    fn dropping_ring_drops_in_flight_values() {
        let counter = Arc::new(AtomicUsize::new(0));

        struct Dropper(Arc<AtomicUsize>);
        impl Drop for Dropper {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let ring: Ring<Dropper> = Ring::new(4);
        ring.try_publish(Dropper(counter.clone())).unwrap();
        ring.try_publish(Dropper(counter.clone())).unwrap();
        drop(ring);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn concurrent_producers_deliver_exactly_once_each() {
        const PRODUCERS: u64 = 8;
        const PER_PRODUCER: u64 = 20_000;
        let ring: Arc<Ring<u64>> = Arc::new(Ring::new(1024));

        let handles: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let ring = ring.clone();
                thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        let value = p * PER_PRODUCER + i;
                        loop {
                            if ring.try_publish(value).is_ok() {
                                break;
                            }
                            std::hint::spin_loop();
                        }
                    }
                })
            })
            .collect();

        let total = PRODUCERS * PER_PRODUCER;
        let mut seen = vec![false; total as usize];
        let mut consumed = 0u64;
        while consumed < total {
            if let Some(v) = ring.try_consume() {
                assert!(!seen[v as usize], "value {v} delivered twice");
                seen[v as usize] = true;
                consumed += 1;
            }
        }
        for h in handles {
            h.join().unwrap();
        }
        assert!(seen.into_iter().all(|s| s));
    }
}
