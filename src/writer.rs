//! The writer (sink) contract (spec §4.7, C7).

use std::io::{self, Write as _};
use std::sync::Mutex;

/// A byte sink with flush. A writer need not be internally thread-safe —
/// the consumer loop guarantees all calls are serialized from its single
/// background thread.
pub trait Writer: Send + Sync {
    /// Writes `bytes`, returning the number of bytes actually written.
    fn write(&self, bytes: &[u8]) -> io::Result<usize>;
    fn flush(&self) -> io::Result<()>;
}

/// Writes to the process's standard output.
pub struct StdoutWriter;

impl Writer for StdoutWriter {
    fn write(&self, bytes: &[u8]) -> io::Result<usize> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(bytes)?;
        Ok(bytes.len())
    }

    fn flush(&self) -> io::Result<()> {
        io::stdout().lock().flush()
    }
}

/// Writes to the process's standard error.
pub struct StderrWriter;

impl Writer for StderrWriter {
    fn write(&self, bytes: &[u8]) -> io::Result<usize> {
        let mut stderr = io::stderr().lock();
        stderr.write_all(bytes)?;
        Ok(bytes.len())
    }

    fn flush(&self) -> io::Result<()> {
        io::stderr().lock().flush()
    }
}

/// An in-memory writer, primarily a test double: records every byte slice
/// it receives so tests can assert on exact emitted bytes.
#[derive(Default)]
pub struct MemoryWriter {
    buf: Mutex<Vec<u8>>,
}

impl MemoryWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything written so far.
    #[must_use]
    pub fn contents(&self) -> Vec<u8> {
        self.buf.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    #[must_use]
    pub fn contents_string(&self) -> String {
        String::from_utf8_lossy(&self.contents()).into_owned()
    }
}

impl Writer for MemoryWriter {
    fn write(&self, bytes: &[u8]) -> io::Result<usize> {
        self.buf
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Test double that always fails, for exercising the writer-error path.
pub struct FailingWriter {
    pub message: String,
}

impl Writer for FailingWriter {
    fn write(&self, _bytes: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Other, self.message.clone()))
    }

    fn flush(&self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Other, self.message.clone()))
    }
}

/// Test double that sleeps before every write, for exercising backpressure
/// under a slow sink (spec §8 scenarios 4-5).
pub struct SlowWriter<W: Writer> {
    inner: W,
    delay: std::time::Duration,
}

impl<W: Writer> SlowWriter<W> {
    pub fn new(inner: W, delay: std::time::Duration) -> Self {
        Self { inner, delay }
    }
}

impl<W: Writer> Writer for SlowWriter<W> {
    fn write(&self, bytes: &[u8]) -> io::Result<usize> {
        std::thread::sleep(self.delay);
        self.inner.write(bytes)
    }

    fn flush(&self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_writer_accumulates_bytes() {
        let w = MemoryWriter::new();
        w.write(b"abc").unwrap();
        w.write(b"def").unwrap();
        assert_eq!(w.contents_string(), "abcdef");
    }

    #[test]
    fn failing_writer_errors() {
        let w = FailingWriter {
            message: "disk full".to_string(),
        };
        assert!(w.write(b"x").is_err());
        assert!(w.flush().is_err());
    }
}
