//! The logger facade (spec §4.9, C9): binds a level gate, sampler,
//! encoder, writer, ring, and base fields into the public logging API.

use crate::backpressure::BackpressurePolicy;
use crate::config::Config;
use crate::config::ConfigError;
use crate::consumer::{self, ConsumerConfig};
use crate::encoder::Encoder;
use crate::error::{default_error_hook, ErrorCode, InternalError, LogError, TimeoutError};
use crate::field::Field;
use crate::idle::IdleState;
use crate::level::{Level, LevelGate};
use crate::pool::RecordPool;
use crate::record::Record;
use crate::ring::Ring;
use crate::sampler::{sample_with_isolation, SampleDecision, Sampler};
use crate::stats::{Stats, StatsSnapshot};
use crate::sync::{Barrier, QueueItem};
use crate::writer::Writer;
use std::panic::Location;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

const CREATED: u8 = 0;
const STARTED: u8 = 1;
const CLOSING: u8 = 2;
const CLOSED: u8 = 3;

struct LoggerInner {
    ring: Arc<Ring<QueueItem>>,
    pool: Arc<RecordPool>,
    writer: Arc<dyn Writer>,
    encoder: Arc<dyn Encoder>,
    sampler: Option<Arc<dyn Sampler>>,
    level_gate: LevelGate,
    backpressure_policy: BackpressurePolicy,
    enable_caller: bool,
    stack_trace_level: Level,
    stats: Arc<Stats>,
    state: AtomicU8,
    consumer: Mutex<Option<JoinHandle<()>>>,
}

/// A cheap, `Arc`-backed handle to the logging pipeline.
///
/// Cloning a `Logger` or calling [`Logger::with`] never duplicates the
/// ring, writer, encoder, sampler, or consumer thread — every handle
/// sharing an `inner` sees the same pipeline and the same [`Stats`]
/// counters; only the base-field set varies per handle.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
    base_fields: Arc<Vec<Field>>,
}

impl Logger {
    /// Builds and starts a logger from `config`: the ring and record pool
    /// are allocated and the consumer thread is spawned before this
    /// returns, i.e. construction performs the spec's `Created -> Started`
    /// transition in one step.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let Config {
            level,
            encoder,
            output,
            capacity,
            batch_size,
            idle_strategy,
            backpressure_policy,
            enable_caller,
            stack_trace_level,
            sampler,
            base_fields,
        } = config;

        let ring: Arc<Ring<QueueItem>> = Arc::new(Ring::new(capacity));
        let pool = Arc::new(RecordPool::new(capacity.min(4096)));
        let encoder: Arc<dyn Encoder> = Arc::from(encoder.build());
        let stats = Arc::new(Stats::new());

        let consumer_cfg = ConsumerConfig {
            ring: ring.clone(),
            pool: pool.clone(),
            writer: output.clone(),
            encoder: encoder.clone(),
            idle_strategy,
            batch_size,
            stats: stats.clone(),
        };
        let handle = std::thread::Builder::new()
            .name("ringlog-consumer".to_string())
            .spawn(move || consumer::run(consumer_cfg))
            .expect("failed to spawn ringlog consumer thread");

        let inner = Arc::new(LoggerInner {
            ring,
            pool,
            writer: output,
            encoder,
            sampler,
            level_gate: LevelGate::new(level),
            backpressure_policy,
            enable_caller,
            stack_trace_level,
            stats,
            state: AtomicU8::new(STARTED),
            consumer: Mutex::new(Some(handle)),
        });

        Ok(Self {
            inner,
            base_fields: Arc::new(base_fields),
        })
    }

    /// Cheap predicate matching [`crate::level::LevelGate::enabled`]; lets
    /// callers skip building fields entirely when a level is disabled.
    #[must_use]
    pub fn enabled(&self, level: Level) -> bool {
        self.inner.level_gate.enabled(level)
    }

    #[track_caller]
    pub fn log(&self, level: Level, message: impl Into<String>, fields: &[Field]) -> bool {
        let location = Location::caller();
        self.log_impl(level, message.into(), fields, location)
    }

    #[track_caller]
    fn log_impl(
        &self,
        level: Level,
        message: String,
        fields: &[Field],
        location: &'static Location<'static>,
    ) -> bool {
        if self.is_closed() {
            return false;
        }
        if !self.inner.level_gate.enabled(level) {
            return false;
        }
        if let Some(decision) = self.check_sampler(level, &message, fields) {
            if decision == SampleDecision::Drop {
                return false;
            }
        }

        let mut record = self.inner.pool.acquire();
        record.level = level;
        record.message.push_str(&message);
        self.stamp_common(&mut record, fields, location);

        if matches!(level, Level::Panic | Level::Fatal) {
            self.publish_terminal(level, record);
        }
        self.publish(QueueItem::Record(record))
    }

    /// Fills a pooled record in place via `fill`, avoiding the
    /// intermediate `String`/`Vec<Field>` construction `log` performs —
    /// `fill` only runs once the level gate has already passed.
    #[track_caller]
    pub fn log_fn(&self, level: Level, fill: impl FnOnce(&mut Record)) -> bool {
        let location = Location::caller();
        if self.is_closed() {
            return false;
        }
        if !self.inner.level_gate.enabled(level) {
            return false;
        }
        let mut record = self.inner.pool.acquire();
        record.level = level;
        for f in self.base_fields.iter() {
            record.add_field(f.clone());
        }
        fill(&mut record);

        if let Some(decision) = self.check_sampler(level, &record.message.clone(), record.fields())
        {
            if decision == SampleDecision::Drop {
                self.inner.pool.release(*record);
                return false;
            }
        }
        self.stamp_caller_and_stack(&mut record, location);

        if matches!(level, Level::Panic | Level::Fatal) {
            self.publish_terminal(level, record);
        }
        self.publish(QueueItem::Record(record))
    }

    fn check_sampler(&self, level: Level, message: &str, fields: &[Field]) -> Option<SampleDecision> {
        let sampler = self.inner.sampler.as_ref()?;
        let (decision, panic_msg) = sample_with_isolation(sampler.as_ref(), level, message, fields);
        if let Some(panic_msg) = panic_msg {
            (default_error_hook())(InternalError {
                code: ErrorCode::SamplerPanic,
                message: panic_msg,
                cause: None,
                context: message.to_string(),
            });
        }
        if decision == SampleDecision::Drop {
            self.inner.stats.record_dropped_sampler();
        }
        Some(decision)
    }

    fn stamp_common(
        &self,
        record: &mut Record,
        fields: &[Field],
        location: &'static Location<'static>,
    ) {
        for f in self.base_fields.iter().chain(fields.iter()) {
            record.add_field(f.clone());
        }
        self.stamp_caller_and_stack(record, location);
    }

    fn stamp_caller_and_stack(&self, record: &mut Record, location: &'static Location<'static>) {
        if self.inner.enable_caller && record.caller.is_none() {
            record.caller = Some(format!("{}:{}", location.file(), location.line()));
        }
        if record.level >= self.inner.stack_trace_level && record.stack.is_none() {
            record.stack = Some(std::backtrace::Backtrace::force_capture().to_string());
        }
    }

    /// Publishes a `Panic`/`Fatal` record and carries out its side effect
    /// on the **calling** thread, per spec §3 ("Panic terminates the
    /// calling thread... Fatal terminates the process"). Never drops the
    /// record regardless of the configured backpressure policy — retries
    /// the claim/publish loop like a control barrier — then blocks on a
    /// per-record sync barrier so the record is guaranteed flushed to the
    /// writer before the calling thread aborts or the process exits.
    ///
    /// The consumer thread is never the one that panics or exits here: it
    /// keeps draining normally, so `close()` (which joins the consumer)
    /// is never left blocked on a barrier nobody will signal.
    fn publish_terminal(&self, level: Level, record: Box<Record>) -> ! {
        self.publish_control(QueueItem::Record(record));
        self.inner.stats.record_published();
        let _ = self.sync(None);
        match level {
            Level::Panic => {
                eprintln!("ringlog: panic record flushed, aborting calling thread");
                panic!("ringlog: Panic-level record logged");
            }
            Level::Fatal => {
                eprintln!("ringlog: fatal record flushed, terminating process");
                std::process::exit(1);
            }
            _ => unreachable!("publish_terminal is only called for Panic/Fatal levels"),
        }
    }

    /// Applies the configured backpressure policy. On `DropOnFull`, a
    /// dropped record is released back to the pool rather than leaked.
    fn publish(&self, item: QueueItem) -> bool {
        match self.inner.backpressure_policy {
            BackpressurePolicy::DropOnFull => match self.inner.ring.try_publish(item) {
                Ok(()) => {
                    self.inner.stats.record_published();
                    true
                }
                Err(QueueItem::Record(record)) => {
                    self.inner.pool.release(*record);
                    self.inner.stats.record_dropped_backpressure();
                    false
                }
                Err(_) => false,
            },
            BackpressurePolicy::BlockOnFull { idle } => {
                let mut state = IdleState::new();
                let mut iteration = 0u64;
                let mut item = item;
                loop {
                    match self.inner.ring.try_publish(item) {
                        Ok(()) => {
                            self.inner.stats.record_published();
                            return true;
                        }
                        Err(returned) => {
                            if self.inner.ring.is_closing() {
                                if let QueueItem::Record(record) = returned {
                                    self.inner.pool.release(*record);
                                }
                                self.inner.stats.record_dropped_backpressure();
                                return false;
                            }
                            item = returned;
                            idle.apply(&mut state, iteration);
                            iteration += 1;
                        }
                    }
                }
            }
        }
    }

    /// Publishes a control item (`Sync`/`Close`), retrying indefinitely
    /// regardless of the configured backpressure policy — a barrier must
    /// never be silently dropped.
    fn publish_control(&self, item: QueueItem) {
        let mut state = IdleState::new();
        let mut iteration = 0u64;
        let mut item = item;
        loop {
            match self.inner.ring.try_publish(item) {
                Ok(()) => return,
                Err(returned) => {
                    item = returned;
                    crate::idle::IdleStrategy::default().apply(&mut state, iteration);
                    iteration += 1;
                }
            }
        }
    }

    /// Returns a child logger sharing the ring, writer, encoder, sampler,
    /// and level with `self`, with `fields` appended to the base-field
    /// set. Children never hold exclusive state — they are cheap `Arc`
    /// clones.
    #[must_use]
    pub fn with(&self, fields: &[Field]) -> Self {
        let mut merged = (*self.base_fields).clone();
        merged.extend(fields.iter().cloned());
        Self {
            inner: self.inner.clone(),
            base_fields: Arc::new(merged),
        }
    }

    pub fn set_level(&self, level: Level) {
        self.inner.level_gate.set(level);
    }

    #[must_use]
    pub fn level(&self) -> Level {
        self.inner.level_gate.get()
    }

    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// Publishes an internal barrier record and blocks until the consumer
    /// has processed it and flushed the writer. A no-op success once the
    /// logger is `Closed`.
    pub fn sync(&self, timeout: Option<Duration>) -> Result<(), LogError> {
        if self.inner.state.load(Ordering::Acquire) == CLOSED {
            return Ok(());
        }
        let barrier = Arc::new(Barrier::new());
        self.publish_control(QueueItem::Sync(barrier.clone()));
        if barrier.wait(timeout) {
            Ok(())
        } else {
            Err(LogError::Timeout(TimeoutError))
        }
    }

    /// Transitions to `Closing`, publishes a shutdown barrier, joins the
    /// consumer, and transitions to `Closed`. Idempotent: a second call
    /// (from any thread) simply waits for/observes the first call's
    /// completion and returns success.
    pub fn close(&self) -> Result<(), LogError> {
        match self
            .inner
            .state
            .compare_exchange(STARTED, CLOSING, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {}
            Err(CLOSED) => return Ok(()),
            Err(_) => {
                // Another thread is already closing; wait for it.
                while self.inner.state.load(Ordering::Acquire) != CLOSED {
                    std::thread::yield_now();
                }
                return Ok(());
            }
        }

        self.inner.ring.mark_closing();
        let barrier = Arc::new(Barrier::new());
        self.publish_control(QueueItem::Close(barrier.clone()));
        barrier.wait(None);

        if let Some(handle) = self
            .inner
            .consumer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            let _ = handle.join();
        }

        self.inner.state.store(CLOSED, Ordering::Release);
        Ok(())
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.state.load(Ordering::Acquire) == CLOSED
    }
}

macro_rules! level_method {
    ($name:ident, $level:expr) => {
        impl Logger {
            #[track_caller]
            pub fn $name(&self, message: impl Into<String>, fields: &[Field]) -> bool {
                self.log($level, message, fields)
            }
        }
    };
}

level_method!(debug, Level::Debug);
level_method!(info, Level::Info);
level_method!(warn, Level::Warn);
level_method!(error, Level::Error);
level_method!(dpanic, Level::DPanic);
level_method!(panic, Level::Panic);
level_method!(fatal, Level::Fatal);

macro_rules! formatted_level_method {
    ($name:ident, $level:expr) => {
        impl Logger {
            /// Builds the message via `format!` only if the gate for this
            /// level is enabled, preserving zero-cost-when-disabled.
            #[track_caller]
            pub fn $name(&self, args: std::fmt::Arguments<'_>) -> bool {
                if !self.inner.level_gate.enabled($level) {
                    return false;
                }
                self.log($level, args.to_string(), &[])
            }
        }
    };
}

formatted_level_method!(debugf, Level::Debug);
formatted_level_method!(infof, Level::Info);
formatted_level_method!(warnf, Level::Warn);
formatted_level_method!(errorf, Level::Error);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::encoder::EncoderKind;
    use crate::writer::MemoryWriter;
    use std::sync::Arc;

    fn test_logger(writer: Arc<MemoryWriter>) -> Logger {
        let config = Config::builder()
            .output(writer)
            .encoder(EncoderKind::Json)
            .capacity(8)
            .build()
            .unwrap();
        Logger::new(config).unwrap()
    }

    #[test]
    fn json_simple_scenario() {
        let writer = Arc::new(MemoryWriter::new());
        let logger = test_logger(writer.clone());
        assert!(logger.log(Level::Info, "hello", &[Field::str("k", "v")]));
        logger.sync(Some(Duration::from_secs(1))).unwrap();
        let out = writer.contents_string();
        assert!(out.contains("\"level\":\"info\""));
        assert!(out.contains("\"msg\":\"hello\""));
        assert!(out.contains("\"k\":\"v\""));
        logger.close().unwrap();
    }

    #[test]
    fn level_gate_filters_records() {
        let writer = Arc::new(MemoryWriter::new());
        let config = Config::builder()
            .output(writer.clone())
            .level(Level::Warn)
            .capacity(8)
            .build()
            .unwrap();
        let logger = Logger::new(config).unwrap();
        assert!(!logger.log(Level::Info, "x", &[]));
        assert!(logger.log(Level::Warn, "y", &[]));
        logger.sync(Some(Duration::from_secs(1))).unwrap();
        let out = writer.contents_string();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("\"msg\":\"y\""));
        logger.close().unwrap();
    }

    #[test]
    fn secret_redaction_scenario() {
        let writer = Arc::new(MemoryWriter::new());
        let logger = test_logger(writer.clone());
        logger.log(Level::Info, "login", &[Field::secret("password", "s3cr3t")]);
        logger.sync(Some(Duration::from_secs(1))).unwrap();
        let out = writer.contents_string();
        assert!(out.contains("\"password\":\"[REDACTED]\""));
        assert!(!out.contains("s3cr3t"));
        logger.close().unwrap();
    }

    #[test]
    fn with_extends_base_fields_without_sharing_mutable_state() {
        let writer = Arc::new(MemoryWriter::new());
        let logger = test_logger(writer.clone());
        let child = logger.with(&[Field::str("request_id", "abc")]);
        child.log(Level::Info, "handled", &[]);
        logger.sync(Some(Duration::from_secs(1))).unwrap();
        let out = writer.contents_string();
        assert!(out.contains("\"request_id\":\"abc\""));
        logger.close().unwrap();
    }

    #[test]
    fn close_is_idempotent() {
        let writer = Arc::new(MemoryWriter::new());
        let logger = test_logger(writer);
        logger.close().unwrap();
        logger.close().unwrap();
        assert!(logger.is_closed());
    }

    #[test]
    fn sync_after_close_is_a_no_op_success() {
        let writer = Arc::new(MemoryWriter::new());
        let logger = test_logger(writer);
        logger.close().unwrap();
        logger.sync(Some(Duration::from_millis(100))).unwrap();
    }

    #[test]
    fn drop_on_full_counts_published_and_dropped() {
        let writer = Arc::new(MemoryWriter::new());
        let config = Config::builder()
            .output(writer)
            .capacity(2)
            .backpressure_policy(BackpressurePolicy::DropOnFull)
            .build()
            .unwrap();
        let logger = Logger::new(config).unwrap();
        for i in 0..50 {
            logger.log(Level::Info, format!("msg{i}"), &[]);
        }
        logger.sync(Some(Duration::from_secs(2))).unwrap();
        let stats = logger.stats();
        assert_eq!(stats.published + stats.dropped_backpressure, 50);
        logger.close().unwrap();
    }

    #[test]
    fn block_on_full_never_drops() {
        let writer = Arc::new(MemoryWriter::new());
        let config = Config::builder()
            .output(writer)
            .capacity(2)
            .backpressure_policy(BackpressurePolicy::block_on_full())
            .build()
            .unwrap();
        let logger = Logger::new(config).unwrap();
        for i in 0..50 {
            assert!(logger.log(Level::Info, format!("msg{i}"), &[]));
        }
        logger.sync(Some(Duration::from_secs(2))).unwrap();
        let stats = logger.stats();
        assert_eq!(stats.published, 50);
        assert_eq!(stats.dropped_backpressure, 0);
        logger.close().unwrap();
    }
}
