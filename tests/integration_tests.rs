//! End-to-end scenarios 1-6 from spec.md §8, exercised against the public
//! `Logger` facade rather than any individual component in isolation.

use ringlog::writer::{FailingWriter, MemoryWriter, SlowWriter};
use ringlog::{BackpressurePolicy, Config, Field, Level, Logger};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Scenario 1: JSON simple.
#[test]
fn json_simple() {
    let writer = Arc::new(MemoryWriter::new());
    let logger = Logger::new(
        Config::builder()
            .level(Level::Info)
            .output(writer.clone())
            .capacity(8)
            .build()
            .unwrap(),
    )
    .unwrap();

    assert!(logger.log(Level::Info, "hello", &[Field::str("k", "v")]));
    logger.sync(Some(Duration::from_secs(1))).unwrap();

    let out = writer.contents_string();
    let line = out.lines().next().expect("one line emitted");
    assert!(line.starts_with("{\"ts\":\""));
    assert!(line.contains("\"level\":\"info\""));
    assert!(line.contains("\"msg\":\"hello\""));
    assert!(line.contains("\"k\":\"v\""));
    assert!(line.ends_with('}'));

    logger.close().unwrap();
}

/// Scenario 2: level gate.
#[test]
fn level_gate_drops_below_threshold() {
    let writer = Arc::new(MemoryWriter::new());
    let logger = Logger::new(
        Config::builder()
            .level(Level::Warn)
            .output(writer.clone())
            .capacity(8)
            .build()
            .unwrap(),
    )
    .unwrap();

    assert!(!logger.log(Level::Info, "x", &[]));
    assert!(logger.log(Level::Warn, "y", &[]));
    logger.sync(Some(Duration::from_secs(1))).unwrap();

    let out = writer.contents_string();
    let lines: Vec<_> = out.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("\"msg\":\"y\""));

    logger.close().unwrap();
}

/// Scenario 3: secret redaction.
#[test]
fn secret_field_never_leaks_its_payload() {
    let writer = Arc::new(MemoryWriter::new());
    let logger = Logger::new(Config::builder().output(writer.clone()).capacity(8).build().unwrap())
        .unwrap();

    logger.log(Level::Info, "login", &[Field::secret("password", "s3cr3t")]);
    logger.sync(Some(Duration::from_secs(1))).unwrap();

    let out = writer.contents_string();
    assert!(out.contains("\"password\":\"[REDACTED]\""));
    assert!(!out.contains("s3cr3t"));

    logger.close().unwrap();
}

/// Scenario 4: DropOnFull under a slow writer and many producers.
/// `published + dropped_backpressure == N` and at least `capacity` records
/// got through before the ring saturated.
#[test]
fn drop_on_full_accounts_for_every_record() {
    let writer = Arc::new(SlowWriter::new(MemoryWriter::new(), Duration::from_millis(5)));
    let logger = Logger::new(
        Config::builder()
            .output(writer)
            .capacity(2)
            .backpressure_policy(BackpressurePolicy::DropOnFull)
            .build()
            .unwrap(),
    )
    .unwrap();

    let handles: Vec<_> = (0..100)
        .map(|i| {
            let logger = logger.clone();
            thread::spawn(move || {
                logger.log(Level::Info, format!("msg{i}"), &[]);
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    logger.sync(Some(Duration::from_secs(2))).unwrap();
    let stats = logger.stats();
    assert_eq!(stats.published + stats.dropped_backpressure, 100);
    assert!(stats.published >= 2);

    logger.close().unwrap();
}

/// Scenario 5: BlockOnFull never drops, regardless of a slow writer.
#[test]
fn block_on_full_delivers_every_record() {
    let writer = Arc::new(SlowWriter::new(MemoryWriter::new(), Duration::from_millis(5)));
    let logger = Logger::new(
        Config::builder()
            .output(writer)
            .capacity(2)
            .backpressure_policy(BackpressurePolicy::block_on_full())
            .build()
            .unwrap(),
    )
    .unwrap();

    let handles: Vec<_> = (0..50)
        .map(|i| {
            let logger = logger.clone();
            thread::spawn(move || {
                assert!(logger.log(Level::Info, format!("msg{i}"), &[]));
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    logger.sync(Some(Duration::from_secs(5))).unwrap();
    let stats = logger.stats();
    assert_eq!(stats.published, 50);
    assert_eq!(stats.dropped_backpressure, 0);

    logger.close().unwrap();
}

/// Scenario 6: binary framing begins with the documented magic/version
/// bytes (byte-exact content is covered per-encoder in `encoder::binary`).
#[test]
fn binary_encoder_output_begins_with_magic_and_version() {
    let writer = Arc::new(MemoryWriter::new());
    let logger = Logger::new(
        Config::builder()
            .output(writer.clone())
            .encoder(ringlog::EncoderKind::Binary)
            .capacity(8)
            .build()
            .unwrap(),
    )
    .unwrap();

    logger.log(Level::Error, "oops", &[Field::i64("n", -1)]);
    logger.sync(Some(Duration::from_secs(1))).unwrap();

    let bytes = writer.contents();
    assert_eq!(&bytes[0..3], &[0x52, 0x49, 0x01]);

    logger.close().unwrap();
}

/// Ordering: two records published by the same thread appear in the same
/// order in the writer, even across an intervening `sync`.
#[test]
fn same_thread_publish_order_is_preserved() {
    let writer = Arc::new(MemoryWriter::new());
    let logger = Logger::new(Config::builder().output(writer.clone()).capacity(64).build().unwrap())
        .unwrap();

    for i in 0..200 {
        logger.log(Level::Info, format!("m{i}"), &[]);
    }
    logger.sync(Some(Duration::from_secs(2))).unwrap();

    let out = writer.contents_string();
    for (i, line) in out.lines().enumerate() {
        assert!(line.contains(&format!("\"msg\":\"m{i}\"")), "line {i}: {line}");
    }

    logger.close().unwrap();
}

/// Idempotence: `close()` twice is success both times; `sync()` after
/// `close()` is a no-op success.
#[test]
fn close_is_idempotent_and_sync_after_close_succeeds() {
    let writer = Arc::new(MemoryWriter::new());
    let logger = Logger::new(Config::builder().output(writer).capacity(8).build().unwrap()).unwrap();

    logger.close().unwrap();
    logger.close().unwrap();
    assert!(logger.is_closed());
    logger.sync(Some(Duration::from_millis(50))).unwrap();
}

/// `with()` children extend base fields without sharing exclusive state;
/// both the parent and a child publish into the same ring/writer.
#[test]
fn with_children_share_pipeline_but_not_base_fields() {
    let writer = Arc::new(MemoryWriter::new());
    let logger = Logger::new(Config::builder().output(writer.clone()).capacity(16).build().unwrap())
        .unwrap();
    let child = logger.with(&[Field::str("request_id", "abc-123")]);

    logger.log(Level::Info, "parent event", &[]);
    child.log(Level::Info, "child event", &[]);
    logger.sync(Some(Duration::from_secs(1))).unwrap();

    let out = writer.contents_string();
    let parent_line = out.lines().find(|l| l.contains("parent event")).unwrap();
    let child_line = out.lines().find(|l| l.contains("child event")).unwrap();
    assert!(!parent_line.contains("request_id"));
    assert!(child_line.contains("\"request_id\":\"abc-123\""));

    logger.close().unwrap();
}

/// Writer errors are reported via stats, not returned from `log`/`sync`,
/// and do not prevent a clean shutdown.
#[test]
fn writer_errors_are_counted_not_propagated() {
    let writer = Arc::new(FailingWriter {
        message: "disk full".to_string(),
    });
    let logger = Logger::new(Config::builder().output(writer).capacity(8).build().unwrap()).unwrap();

    assert!(logger.log(Level::Info, "x", &[]));
    logger.sync(Some(Duration::from_secs(1))).unwrap();
    assert!(logger.stats().writer_errors >= 1);

    logger.close().unwrap();
}

/// Stress: many producers against a small ring under BlockOnFull never
/// loses a record and never double-delivers one.
#[test]
fn concurrent_stress_block_on_full_exactly_once() {
    const PRODUCERS: usize = 8;
    const PER_PRODUCER: usize = 2_000;

    let writer = Arc::new(MemoryWriter::new());
    let logger = Logger::new(
        Config::builder()
            .output(writer.clone())
            .capacity(16)
            .backpressure_policy(BackpressurePolicy::block_on_full())
            .build()
            .unwrap(),
    )
    .unwrap();

    let handles: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let logger = logger.clone();
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    logger.log_fn(Level::Info, |record| {
                        record.message.push_str("hit");
                        record.add_field(Field::i64("producer", p as i64));
                        record.add_field(Field::i64("seq", i as i64));
                    });
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    logger.sync(Some(Duration::from_secs(10))).unwrap();
    let out = writer.contents_string();
    assert_eq!(out.lines().count(), PRODUCERS * PER_PRODUCER);
    assert_eq!(logger.stats().published, (PRODUCERS * PER_PRODUCER) as u64);

    logger.close().unwrap();
}
