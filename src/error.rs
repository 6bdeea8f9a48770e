//! Lifecycle & error path (spec §4.10/§7, C10).

use std::fmt;
use std::io::Write as _;
use std::sync::{Arc, Mutex, OnceLock};
use thiserror::Error;

/// `sync(timeout)` expired before the consumer caught up (spec §7,
/// "TimeoutError"). Does not abort the consumer; the barrier is still
/// signaled eventually.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("sync timed out before the consumer caught up")]
pub struct TimeoutError;

/// An operation other than `sync` was attempted on a `Closed` logger
/// (spec §7, "StateError").
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("logger is closed")]
pub struct StateError;

/// Aggregates the few fallible public operations on [`crate::logger::Logger`]
/// (`close()`'s flush error, `sync(timeout)`), mirroring the teacher's
/// `ChannelError`/`SubmitError`/`ExportError` thiserror enums.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LogError {
    #[error(transparent)]
    Timeout(#[from] TimeoutError),
    #[error(transparent)]
    State(#[from] StateError),
}

/// A structured payload describing an internal failure — a writer error,
/// an encoder panic, or a dropped record — routed to the (process-wide,
/// atomically-replaceable) [`ErrorHook`] rather than returned from `log`.
#[derive(Debug, Clone)]
pub struct InternalError {
    pub code: ErrorCode,
    pub message: String,
    pub cause: Option<String>,
    pub context: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    WriterError,
    EncoderFault,
    BackpressureDrop,
    SamplerPanic,
}

impl ErrorCode {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ErrorCode::WriterError => "writer_error",
            ErrorCode::EncoderFault => "encoder_fault",
            ErrorCode::BackpressureDrop => "backpressure_drop",
            ErrorCode::SamplerPanic => "sampler_panic",
        }
    }
}

impl fmt::Display for InternalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.name(), self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, ": {cause}")?;
        }
        if !self.context.is_empty() {
            write!(f, " ({})", self.context)?;
        }
        Ok(())
    }
}

impl std::error::Error for InternalError {}

/// A process-wide, atomically-replaceable error hook.
pub type ErrorHook = Arc<dyn Fn(InternalError) + Send + Sync>;

fn default_hook_slot() -> &'static Mutex<ErrorHook> {
    static HOOK: OnceLock<Mutex<ErrorHook>> = OnceLock::new();
    HOOK.get_or_init(|| Mutex::new(Arc::new(default_hook)))
}

/// Writes a single line to standard error. Deliberately side-effect-free
/// beyond that, so there is no hidden initialization-order dependency.
fn default_hook(err: InternalError) {
    let mut stderr = std::io::stderr();
    let _ = writeln!(stderr, "ringlog: {err}");
}

/// Replaces the process-wide default error hook.
pub fn set_default_error_hook(hook: ErrorHook) {
    *default_hook_slot()
        .lock()
        .unwrap_or_else(|e| e.into_inner()) = hook;
}

/// Returns the currently-installed process-wide error hook.
#[must_use]
pub fn default_error_hook() -> ErrorHook {
    Arc::clone(&default_hook_slot().lock().unwrap_or_else(|e| e.into_inner()))
}
