use crate::record::Record;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

struct Node {
    record: Record,
    next: *mut Node,
}

/// A lock-free free list of pooled [`Record`]s.
///
/// Producers pop a free record to fill and publish; only the consumer
/// pushes records back after they have been encoded and written. The pop
/// side is therefore genuinely multi-producer (any producer thread may
/// race to take the head), while the push side has a single writer — the
/// consumer — so the Treiber-stack CAS loop on push never contends with
/// itself, only with concurrent pops.
pub struct RecordPool {
    head: AtomicPtr<Node>,
}

// Safety: Node<Record> ownership is transferred exclusively through the
// atomic head pointer; no two threads ever observe the same node live.
unsafe impl Send for RecordPool {}
unsafe impl Sync for RecordPool {}

impl RecordPool {
    /// Builds a pool pre-populated with `capacity` empty records.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let pool = Self {
            head: AtomicPtr::new(ptr::null_mut()),
        };
        for _ in 0..capacity {
            pool.release(Record::empty());
        }
        pool
    }

    /// Takes a free record, or allocates a new empty one if the pool is
    /// momentarily exhausted (the pool is a soft cap, not a hard limit —
    /// correctness does not depend on never growing past its initial
    /// size, only the ring's capacity bounds in-flight records).
    pub fn acquire(&self) -> Box<Record> {
        loop {
            let head = self.head.load(Ordering::Acquire);
            if head.is_null() {
                return Box::new(Record::empty());
            }
            let next = unsafe { (*head).next };
            if self
                .head
                .compare_exchange_weak(head, next, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                let node = unsafe { Box::from_raw(head) };
                return Box::new(node.record);
            }
        }
    }

    /// Returns a drained record to the pool after resetting it.
    pub fn release(&self, mut record: Record) {
        record.reset();
        let node = Box::into_raw(Box::new(Node {
            record,
            next: ptr::null_mut(),
        }));
        loop {
            let head = self.head.load(Ordering::Acquire);
            unsafe {
                (*node).next = head;
            }
            if self
                .head
                .compare_exchange_weak(head, node, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return;
            }
        }
    }
}

impl Drop for RecordPool {
    fn drop(&mut self) {
        let mut head = *self.head.get_mut();
        while !head.is_null() {
            let node = unsafe { Box::from_raw(head) };
            head = node.next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;

    #[test]
    fn acquire_release_roundtrip() {
        let pool = RecordPool::new(4);
        let mut r = pool.acquire();
        r.level = Level::Warn;
        r.message.push_str("hi");
        pool.release(*r);

        let r2 = pool.acquire();
        // reset() clears message/level on release
        assert_eq!(r2.message, "");
        assert_eq!(r2.level, Level::Info);
    }

    #[test]
    fn exhausted_pool_allocates_fresh_records() {
        let pool = RecordPool::new(0);
        let r = pool.acquire();
        assert_eq!(r.field_count(), 0);
    }
}
