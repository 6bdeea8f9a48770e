//! The configuration surface consumed by the core (spec §6, C11).

use crate::backpressure::BackpressurePolicy;
use crate::encoder::EncoderKind;
use crate::field::Field;
use crate::idle::IdleStrategy;
use crate::level::Level;
use crate::sampler::Sampler;
use crate::writer::{StdoutWriter, Writer};
use std::sync::Arc;
use thiserror::Error;

/// Construction-time validation failures (spec §7, "ConfigError").
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("ring capacity {0} is not a power of two")]
    CapacityNotPowerOfTwo(usize),
    #[error("ring capacity {0} is below the minimum of 2")]
    CapacityTooSmall(usize),
    #[error("batch_size must be at least 1, got {0}")]
    InvalidBatchSize(usize),
}

/// Construction parameters for a [`crate::logger::Logger`].
///
/// Built with [`ConfigBuilder`]; `Config::builder()` is the entry point.
pub struct Config {
    pub level: Level,
    pub encoder: EncoderKind,
    pub output: Arc<dyn Writer>,
    pub capacity: usize,
    pub batch_size: usize,
    pub idle_strategy: IdleStrategy,
    pub backpressure_policy: BackpressurePolicy,
    pub enable_caller: bool,
    pub stack_trace_level: Level,
    pub sampler: Option<Arc<dyn Sampler>>,
    pub base_fields: Vec<Field>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            level: Level::Info,
            encoder: EncoderKind::Json,
            output: Arc::new(StdoutWriter),
            capacity: 8192,
            batch_size: 64,
            idle_strategy: IdleStrategy::default(),
            backpressure_policy: BackpressurePolicy::default(),
            enable_caller: false,
            stack_trace_level: Level::DPanic,
            sampler: None,
            base_fields: Vec::new(),
        }
    }
}

impl Config {
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Validates the surface documented in spec §7 before a
    /// [`crate::logger::Logger`] is constructed from it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity < 2 {
            return Err(ConfigError::CapacityTooSmall(self.capacity));
        }
        if !self.capacity.is_power_of_two() {
            return Err(ConfigError::CapacityNotPowerOfTwo(self.capacity));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }
        Ok(())
    }
}

/// Builder for [`Config`], following the teacher's `CollectorConfig`-style
/// builder shape. `capacity` is rounded up to the next power of two rather
/// than rejected, per spec §6; `build()` still validates the final shape.
#[derive(Default)]
pub struct ConfigBuilder {
    inner: PartialConfig,
}

#[derive(Default)]
struct PartialConfig {
    level: Option<Level>,
    encoder: Option<EncoderKind>,
    output: Option<Arc<dyn Writer>>,
    capacity: Option<usize>,
    batch_size: Option<usize>,
    idle_strategy: Option<IdleStrategy>,
    backpressure_policy: Option<BackpressurePolicy>,
    enable_caller: Option<bool>,
    stack_trace_level: Option<Level>,
    sampler: Option<Arc<dyn Sampler>>,
    base_fields: Vec<Field>,
}

impl ConfigBuilder {
    #[must_use]
    pub fn level(mut self, level: Level) -> Self {
        self.inner.level = Some(level);
        self
    }

    #[must_use]
    pub fn encoder(mut self, encoder: EncoderKind) -> Self {
        self.inner.encoder = Some(encoder);
        self
    }

    #[must_use]
    pub fn output(mut self, output: Arc<dyn Writer>) -> Self {
        self.inner.output = Some(output);
        self
    }

    /// Rounded up to the next power of two.
    #[must_use]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.inner.capacity = Some(capacity.max(2).next_power_of_two());
        self
    }

    #[must_use]
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.inner.batch_size = Some(batch_size);
        self
    }

    #[must_use]
    pub fn idle_strategy(mut self, idle_strategy: IdleStrategy) -> Self {
        self.inner.idle_strategy = Some(idle_strategy);
        self
    }

    #[must_use]
    pub fn backpressure_policy(mut self, policy: BackpressurePolicy) -> Self {
        self.inner.backpressure_policy = Some(policy);
        self
    }

    #[must_use]
    pub fn enable_caller(mut self, enable: bool) -> Self {
        self.inner.enable_caller = Some(enable);
        self
    }

    #[must_use]
    pub fn stack_trace_level(mut self, level: Level) -> Self {
        self.inner.stack_trace_level = Some(level);
        self
    }

    #[must_use]
    pub fn sampler(mut self, sampler: Arc<dyn Sampler>) -> Self {
        self.inner.sampler = Some(sampler);
        self
    }

    #[must_use]
    pub fn base_field(mut self, field: Field) -> Self {
        self.inner.base_fields.push(field);
        self
    }

    #[must_use]
    pub fn base_fields(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.inner.base_fields.extend(fields);
        self
    }

    /// Finishes the builder, applying spec-documented defaults for any
    /// field not explicitly set, and validates the result.
    pub fn build(self) -> Result<Config, ConfigError> {
        let defaults = Config::default();
        let config = Config {
            level: self.inner.level.unwrap_or(defaults.level),
            encoder: self.inner.encoder.unwrap_or(defaults.encoder),
            output: self.inner.output.unwrap_or(defaults.output),
            capacity: self.inner.capacity.unwrap_or(defaults.capacity),
            batch_size: self.inner.batch_size.unwrap_or(defaults.batch_size),
            idle_strategy: self.inner.idle_strategy.unwrap_or(defaults.idle_strategy),
            backpressure_policy: self
                .inner
                .backpressure_policy
                .unwrap_or(defaults.backpressure_policy),
            enable_caller: self.inner.enable_caller.unwrap_or(defaults.enable_caller),
            stack_trace_level: self
                .inner
                .stack_trace_level
                .unwrap_or(defaults.stack_trace_level),
            sampler: self.inner.sampler,
            base_fields: self.inner.base_fields,
        };
        config.validate()?;
        Ok(config)
    }
}
