//! Minimal end-to-end usage: build a logger with the default JSON encoder
//! writing to stdout, log at a few levels, then shut down cleanly.

use ringlog::{Config, Field, Level, Logger};

fn main() {
    let config = Config::builder()
        .level(Level::Debug)
        .enable_caller(true)
        .base_field(Field::str("service", "demo"))
        .build()
        .expect("valid config");

    let logger = Logger::new(config).expect("logger starts");

    logger.info("server starting", &[Field::u32("port", 8080)]);
    logger.debug("connection pool warmed", &[Field::i64("size", 16)]);

    for i in 0..5 {
        logger.log(
            Level::Info,
            "handled request",
            &[
                Field::i64("request_id", i),
                Field::duration_ns("latency", 1_500_000 + i * 10_000),
            ],
        );
    }

    logger.warn("cache miss rate elevated", &[Field::f64("rate", 0.42)]);

    logger.sync(None).expect("sync succeeds");
    logger.close().expect("close succeeds");
}
