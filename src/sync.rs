//! The items that flow through the ring, and the barrier primitive used by
//! `sync()`/`close()` to block a caller until the consumer has caught up
//! (spec §4.9/§5).

use crate::record::Record;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// One slot's worth of payload: either a real record, or a control
/// message that rides the same FIFO ordering as records so `sync`/`close`
/// observe everything published before them.
pub(crate) enum QueueItem {
    Record(Box<Record>),
    /// Processed in place: flush the writer, then signal.
    Sync(Arc<Barrier>),
    /// Terminal: the consumer drains whatever remains, flushes, signals,
    /// and returns from its loop.
    Close(Arc<Barrier>),
}

/// A one-shot completion signal the consumer fires after processing the
/// barrier item that carries it.
pub(crate) struct Barrier {
    done: Mutex<bool>,
    condvar: Condvar,
}

impl Barrier {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            done: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    pub(crate) fn signal(&self) {
        let mut done = self.done.lock().unwrap_or_else(|e| e.into_inner());
        *done = true;
        self.condvar.notify_all();
    }

    /// Blocks until signaled, or until `timeout` elapses (`None` blocks
    /// indefinitely). Returns `true` if the barrier was signaled.
    pub(crate) fn wait(&self, timeout: Option<Duration>) -> bool {
        let guard = self.done.lock().unwrap_or_else(|e| e.into_inner());
        match timeout {
            None => {
                let guard = self
                    .condvar
                    .wait_while(guard, |done| !*done)
                    .unwrap_or_else(|e| e.into_inner());
                *guard
            }
            Some(timeout) => {
                let (guard, _) = self
                    .condvar
                    .wait_timeout_while(guard, timeout, |done| !*done)
                    .unwrap_or_else(|e| e.into_inner());
                *guard
            }
        }
    }
}
