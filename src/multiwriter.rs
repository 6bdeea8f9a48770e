//! Atomic fan-out over a set of writers (spec §4.7, C7).

use crate::writer::Writer;
use std::io;
use std::sync::{Arc, Mutex};

/// A swappable set of writers. Readers (the consumer's `write` fan-out)
/// load the current snapshot once and hold that `Arc` for the duration of
/// the call, so a concurrent `add`/`remove` can never observe a torn set
/// or cause a use-after-free of a writer mid-fan-out.
///
/// The snapshot itself is a lock-based `Mutex<Arc<T>>` (see
/// `arc_swap_lite` below), not a lock-free atomic pointer: a reader's
/// `load()` takes the same mutex a concurrent `store()` does, so a load
/// can briefly block behind an in-flight `add`/`remove`. The lock is held
/// only long enough to clone the `Arc`, never for the duration of a
/// `write`, so contention is a pointer clone, not a fan-out pass.
pub struct MultiWriter {
    snapshot: arc_swap_lite::ArcSwap<Vec<Arc<dyn Writer>>>,
    build_lock: Mutex<()>,
}

impl Default for MultiWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl MultiWriter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            snapshot: arc_swap_lite::ArcSwap::new(Arc::new(Vec::new())),
            build_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn with_writers(writers: Vec<Arc<dyn Writer>>) -> Self {
        let mw = Self::new();
        mw.snapshot.store(Arc::new(writers));
        mw
    }

    /// Adds a writer to the set. Writers serialize on `build_lock` against
    /// each other; a concurrent reader's `load()` can briefly block behind
    /// the snapshot's own lock (see `arc_swap_lite`), but never for longer
    /// than an `Arc` clone.
    pub fn add(&self, writer: Arc<dyn Writer>) {
        let _guard = self.build_lock.lock().unwrap_or_else(|e| e.into_inner());
        let current = self.snapshot.load();
        let mut next = (**current).clone();
        next.push(writer);
        self.snapshot.store(Arc::new(next));
    }

    /// Removes writers for which `predicate` returns `true`.
    pub fn remove(&self, predicate: impl Fn(&Arc<dyn Writer>) -> bool) {
        let _guard = self.build_lock.lock().unwrap_or_else(|e| e.into_inner());
        let current = self.snapshot.load();
        let next: Vec<_> = (**current)
            .iter()
            .filter(|w| !predicate(w))
            .cloned()
            .collect();
        self.snapshot.store(Arc::new(next));
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.snapshot.load().len()
    }

    /// The current writer set, held live for the duration of the caller's
    /// use (e.g. a fan-out `write`).
    #[must_use]
    pub fn snapshot(&self) -> Arc<Vec<Arc<dyn Writer>>> {
        self.snapshot.load()
    }
}

impl Writer for MultiWriter {
    /// Fans `bytes` out to every writer in the current snapshot. A single
    /// writer's error does not abort the fan-out; the first error
    /// encountered is returned (after every writer has been tried), with
    /// each one also reported through the caller's error hook.
    fn write(&self, bytes: &[u8]) -> io::Result<usize> {
        let snapshot = self.snapshot();
        let mut first_err = None;
        for writer in snapshot.iter() {
            if let Err(e) = writer.write(bytes) {
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(bytes.len()),
        }
    }

    fn flush(&self) -> io::Result<()> {
        let snapshot = self.snapshot();
        let mut first_err = None;
        for writer in snapshot.iter() {
            if let Err(e) = writer.flush() {
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

/// A minimal `arc-swap`-shaped primitive, kept in-crate rather than
/// pulling in the `arc_swap` dependency. Unlike the real `arc_swap`
/// crate's lock-free `ArcSwap`, this is a plain `Mutex<Arc<T>>`: `load`
/// and `store` both take the same lock, so reads are lock-based, not
/// wait-free. That is an acceptable trade for this crate's write
/// frequency (writer sets change rarely; records flow through `write`,
/// not through `add`/`remove`). See `DESIGN.md` for why this crate stays
/// on the teacher's minimal dependency set here.
mod arc_swap_lite {
    use std::sync::{Arc, Mutex};

    pub struct ArcSwap<T> {
        inner: Mutex<Arc<T>>,
    }

    impl<T> ArcSwap<T> {
        pub fn new(value: Arc<T>) -> Self {
            Self {
                inner: Mutex::new(value),
            }
        }

        pub fn load(&self) -> Arc<T> {
            Arc::clone(&self.inner.lock().unwrap_or_else(|e| e.into_inner()))
        }

        pub fn store(&self, value: Arc<T>) {
            *self.inner.lock().unwrap_or_else(|e| e.into_inner()) = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::MemoryWriter;

    #[test]
    fn fan_out_writes_to_every_writer() {
        let a = Arc::new(MemoryWriter::new());
        let b = Arc::new(MemoryWriter::new());
        let mw = MultiWriter::new();
        mw.add(a.clone());
        mw.add(b.clone());
        mw.write(b"hello").unwrap();
        assert_eq!(a.contents_string(), "hello");
        assert_eq!(b.contents_string(), "hello");
    }

    #[test]
    fn remove_drops_writer_from_fan_out() {
        let a = Arc::new(MemoryWriter::new());
        let b: Arc<dyn Writer> = Arc::new(MemoryWriter::new());
        let mw = MultiWriter::new();
        mw.add(a.clone());
        mw.add(b.clone());
        assert_eq!(mw.count(), 2);
        mw.remove(|w| Arc::ptr_eq(w, &b));
        assert_eq!(mw.count(), 1);
        mw.write(b"x").unwrap();
        assert_eq!(a.contents_string(), "x");
    }

    #[test]
    fn one_failing_writer_does_not_block_the_others() {
        use crate::writer::FailingWriter;
        let ok = Arc::new(MemoryWriter::new());
        let mw = MultiWriter::new();
        mw.add(Arc::new(FailingWriter {
            message: "boom".to_string(),
        }));
        mw.add(ok.clone());
        let result = mw.write(b"hi");
        assert!(result.is_err());
        assert_eq!(ok.contents_string(), "hi");
    }
}
