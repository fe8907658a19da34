//! Write destinations for encoded records

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

/// A destination that accepts whole encoded records
///
/// Implementations must write each record in one piece so records from
/// concurrent callers never interleave.
pub trait Sink: Send + Sync {
    fn write_record(&self, record: &[u8]) -> io::Result<()>;

    /// Flush anything buffered
    fn sync(&self) -> io::Result<()>;
}

impl<S: Sink + ?Sized> Sink for Arc<S> {
    fn write_record(&self, record: &[u8]) -> io::Result<()> {
        (**self).write_record(record)
    }

    fn sync(&self) -> io::Result<()> {
        (**self).sync()
    }
}

/// Process standard output
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl Sink for StdoutSink {
    fn write_record(&self, record: &[u8]) -> io::Result<()> {
        io::stdout().lock().write_all(record)
    }

    fn sync(&self) -> io::Result<()> {
        io::stdout().lock().flush()
    }
}

/// Drops every record; used when no output is enabled
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl Sink for Discard {
    fn write_record(&self, _record: &[u8]) -> io::Result<()> {
        Ok(())
    }

    fn sync(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Any `Write` implementation behind a mutex
pub struct LockedWriter<W> {
    inner: Mutex<W>,
}

impl<W: Write + Send> LockedWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            inner: Mutex::new(writer),
        }
    }
}

impl<W: Write + Send> Sink for LockedWriter<W> {
    fn write_record(&self, record: &[u8]) -> io::Result<()> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write_all(record)
    }

    fn sync(&self) -> io::Result<()> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flush()
    }
}

/// Writes every record to each inner sink
#[derive(Clone, Default)]
pub struct FanOut {
    sinks: Vec<Arc<dyn Sink>>,
}

impl FanOut {
    pub fn new(sinks: Vec<Arc<dyn Sink>>) -> Self {
        Self { sinks }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Collapse into the simplest equivalent sink
    pub fn into_sink(mut self) -> Arc<dyn Sink> {
        match self.sinks.len() {
            0 => Arc::new(Discard),
            1 => self.sinks.remove(0),
            _ => Arc::new(self),
        }
    }
}

impl Sink for FanOut {
    /// Every sink is attempted; the first failure is reported
    fn write_record(&self, record: &[u8]) -> io::Result<()> {
        let mut result = Ok(());
        for sink in &self.sinks {
            if let Err(e) = sink.write_record(record) {
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }

    fn sync(&self) -> io::Result<()> {
        let mut result = Ok(());
        for sink in &self.sinks {
            if let Err(e) = sink.sync() {
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }
}

/// In-memory capture of encoded records
///
/// Clones share the same buffer, so one clone can be handed to a logger and
/// another kept to inspect what was written.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        let buf = self.buf.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buf).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    pub fn clear(&self) {
        self.buf.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl Sink for MemorySink {
    fn write_record(&self, record: &[u8]) -> io::Result<()> {
        self.buf
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(record);
        Ok(())
    }

    fn sync(&self) -> io::Result<()> {
        Ok(())
    }
}
