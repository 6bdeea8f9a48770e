//! Fans every record out to both stdout and an in-memory buffer, then
//! prints the buffered copy to show the fan-out actually happened.

use ringlog::writer::{MemoryWriter, StdoutWriter};
use ringlog::{Config, Field, Level, Logger, MultiWriter};
use std::sync::Arc;

fn main() {
    let memory = Arc::new(MemoryWriter::new());
    let fan_out = Arc::new(MultiWriter::with_writers(vec![
        Arc::new(StdoutWriter) as Arc<dyn ringlog::Writer>,
        memory.clone() as Arc<dyn ringlog::Writer>,
    ]));

    let config = Config::builder()
        .output(fan_out)
        .base_field(Field::str("service", "fan-out-demo"))
        .build()
        .expect("valid config");

    let logger = Logger::new(config).expect("logger starts");
    logger.info("hello from both sinks", &[]);
    logger.sync(None).expect("sync succeeds");
    logger.close().expect("close succeeds");

    println!("---");
    println!("captured in memory writer:");
    print!("{}", memory.contents_string());
}
