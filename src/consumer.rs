//! The consumer loop (spec §4.8, C8): the single background thread that
//! drains the ring, batches encoded bytes, writes once per batch, frees
//! records, and handles the close drain-and-flush sequence.

use crate::encoder::Encoder;
use crate::error::{default_error_hook, ErrorCode, InternalError};
use crate::idle::{IdleState, IdleStrategy};
use crate::level::Level;
use crate::pool::RecordPool;
use crate::record::Record;
use crate::ring::Ring;
use crate::stats::Stats;
use crate::sync::{Barrier, QueueItem};
use crate::writer::Writer;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::SystemTime;

pub(crate) struct ConsumerConfig {
    pub ring: Arc<Ring<QueueItem>>,
    pub pool: Arc<RecordPool>,
    pub writer: Arc<dyn Writer>,
    pub encoder: Arc<dyn Encoder>,
    pub idle_strategy: IdleStrategy,
    pub batch_size: usize,
    pub stats: Arc<Stats>,
}

/// Writes `buf` to `writer` once, reporting any error via the error hook
/// and `stats` without aborting the consumer loop.
fn flush_buf(buf: &mut Vec<u8>, writer: &dyn Writer, stats: &Stats) {
    if buf.is_empty() {
        return;
    }
    if let Err(e) = writer.write(buf) {
        stats.record_writer_error();
        (default_error_hook())(InternalError {
            code: ErrorCode::WriterError,
            message: format!("write of {} bytes failed", buf.len()),
            cause: Some(e.to_string()),
            context: String::new(),
        });
    }
    buf.clear();
}

fn sync_writer(writer: &dyn Writer, stats: &Stats) {
    if let Err(e) = writer.flush() {
        stats.record_writer_error();
        (default_error_hook())(InternalError {
            code: ErrorCode::WriterError,
            message: "flush failed".to_string(),
            cause: Some(e.to_string()),
            context: String::new(),
        });
    }
}

/// Encodes `record` into `buf`, isolating encoder panics: a panicking
/// encoder has its panic caught, reported via the error hook, and a
/// synthesized `level=Error msg="encoder failure"` record is encoded in
/// its place so the batch buffer is never left partially written.
fn encode_with_isolation(encoder: &dyn Encoder, record: &Record, now: SystemTime, buf: &mut Vec<u8>) {
    let before = buf.len();
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        encoder.encode(record, now, buf);
    }));
    if result.is_err() {
        buf.truncate(before);
        (default_error_hook())(InternalError {
            code: ErrorCode::EncoderFault,
            message: "encoder failure".to_string(),
            cause: None,
            context: record.message.clone(),
        });
        let synthetic = Record::new(Level::Error, "encoder failure");
        // A second panic here would be a bug in the encoder's error path
        // itself; let it propagate rather than looping forever.
        encoder.encode(&synthetic, now, buf);
    }
}

/// Runs until it processes a [`QueueItem::Close`] barrier, at which point
/// it drains remaining ready slots, flushes the writer, signals the
/// barrier, and returns.
pub(crate) fn run(cfg: ConsumerConfig) {
    let ConsumerConfig {
        ring,
        pool,
        writer,
        encoder,
        idle_strategy,
        batch_size,
        stats,
    } = cfg;

    let mut buf = Vec::with_capacity(8192);
    let mut idle_state = IdleState::new();
    let mut iteration: u64 = 0;

    loop {
        let mut processed = 0usize;
        let mut close_barrier = None;

        while processed < batch_size {
            match ring.try_consume() {
                Some(QueueItem::Record(record)) => {
                    // Panic/Fatal records carry no special handling here:
                    // the producer that logged them retries the publish
                    // itself (never dropped), then blocks on its own sync
                    // barrier and performs the abort/exit on the calling
                    // thread (see `Logger::publish_terminal`). The
                    // consumer just encodes and frees them like any other
                    // record, so it never stops draining and `close()`
                    // is never left waiting on a barrier nobody signals.
                    let now = SystemTime::now();
                    encode_with_isolation(encoder.as_ref(), &record, now, &mut buf);
                    processed += 1;
                    pool.release(*record);
                }
                Some(QueueItem::Sync(barrier)) => {
                    flush_buf(&mut buf, writer.as_ref(), &stats);
                    sync_writer(writer.as_ref(), &stats);
                    barrier.signal();
                }
                Some(QueueItem::Close(barrier)) => {
                    close_barrier = Some(barrier);
                    break;
                }
                None => break,
            }
        }

        flush_buf(&mut buf, writer.as_ref(), &stats);

        if let Some(barrier) = close_barrier {
            drain_remaining(&ring, &pool, encoder.as_ref(), &mut buf);
            flush_buf(&mut buf, writer.as_ref(), &stats);
            sync_writer(writer.as_ref(), &stats);
            barrier.signal();
            return;
        }

        if processed == 0 {
            idle_strategy.apply(&mut idle_state, iteration);
            iteration += 1;
        } else {
            idle_strategy.on_success(&mut idle_state);
            iteration = 0;
        }
    }
}

fn drain_remaining(ring: &Ring<QueueItem>, pool: &RecordPool, encoder: &dyn Encoder, buf: &mut Vec<u8>) {
    while let Some(item) = ring.try_consume() {
        match item {
            QueueItem::Record(record) => {
                encode_with_isolation(encoder, &record, SystemTime::now(), buf);
                pool.release(*record);
            }
            QueueItem::Sync(barrier) => {
                barrier.signal();
            }
            QueueItem::Close(barrier) => {
                // A second close racing in: honor it too, after everything
                // already drained ahead of it.
                barrier.signal();
            }
        }
    }
}
