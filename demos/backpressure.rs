//! Compares `DropOnFull` against `BlockOnFull` under a deliberately slow
//! writer and a burst of producer threads, printing how many records each
//! policy actually delivers.

use ringlog::writer::{MemoryWriter, SlowWriter};
use ringlog::{BackpressurePolicy, Config, Field, Level, Logger};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn run_burst(policy: BackpressurePolicy, label: &str) {
    let writer = Arc::new(SlowWriter::new(MemoryWriter::new(), Duration::from_millis(5)));
    let config = Config::builder()
        .output(writer)
        .capacity(64)
        .batch_size(8)
        .backpressure_policy(policy)
        .build()
        .expect("valid config");
    let logger = Logger::new(config).expect("logger starts");

    let handles: Vec<_> = (0..8)
        .map(|producer| {
            let logger = logger.clone();
            thread::spawn(move || {
                for i in 0..200 {
                    logger.log(
                        Level::Info,
                        "burst record",
                        &[Field::i64("producer", producer), Field::i64("seq", i)],
                    );
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    logger.sync(Some(Duration::from_secs(5))).expect("sync succeeds");
    let stats = logger.stats();
    println!(
        "{label}: published={} dropped_backpressure={}",
        stats.published, stats.dropped_backpressure
    );
    logger.close().expect("close succeeds");
}

fn main() {
    run_burst(BackpressurePolicy::DropOnFull, "DropOnFull");
    run_burst(BackpressurePolicy::block_on_full(), "BlockOnFull");
}
