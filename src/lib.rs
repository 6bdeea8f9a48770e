//! ringlog - a high-throughput structured logging core
//!
//! Producers publish pooled, fixed-capacity [`Record`]s into a bounded
//! lock-free MPSC ring; a single background consumer thread drains the
//! ring, encodes each batch with a pluggable [`Encoder`], and writes it
//! through a [`Writer`]. Backpressure, idle polling, sampling, and the
//! `Fatal`/`Panic` side effects are all explicit, named policies rather
//! than hidden defaults.
//!
//! # Example
//!
//! ```
//! use ringlog::{Config, Field, Level, Logger};
//! use ringlog::writer::MemoryWriter;
//! use std::sync::Arc;
//!
//! let writer = Arc::new(MemoryWriter::new());
//! let config = Config::builder()
//!     .output(writer.clone())
//!     .level(Level::Info)
//!     .build()
//!     .unwrap();
//! let logger = Logger::new(config).unwrap();
//!
//! logger.log(Level::Info, "server started", &[Field::u32("port", 8080)]);
//! logger.sync(None).unwrap();
//! logger.close().unwrap();
//! ```

mod backpressure;
mod config;
mod consumer;
pub mod encoder;
mod error;
mod field;
mod idle;
mod invariants;
mod level;
mod logger;
mod multiwriter;
mod pool;
mod record;
mod ring;
mod sampler;
mod stats;
mod sync;
pub mod writer;

pub use backpressure::BackpressurePolicy;
pub use config::{Config, ConfigBuilder, ConfigError};
pub use encoder::{BinaryEncoder, Encoder, EncoderKind, JsonEncoder, TextEncoder};
pub use error::{
    default_error_hook, set_default_error_hook, ErrorCode, ErrorHook, InternalError, LogError,
    StateError, TimeoutError,
};
pub use field::{Field, FieldValue, FormatObject, IntWidth};
pub use idle::{IdleAction, IdleState, IdleStrategy};
pub use level::{Level, LevelGate};
pub use logger::Logger;
pub use multiwriter::MultiWriter;
pub use record::{Record, MAX_FIELDS};
pub use ring::{Ring, RingFull};
pub use sampler::{SampleDecision, Sampler, TokenBucketSampler};
pub use stats::{Stats, StatsSnapshot};
pub use writer::Writer;
