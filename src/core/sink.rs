//! Record sinks
//!
//! The consumer hands every record and every classified failure to a
//! [`RecordSink`]. Sink failures are reported back but never retried; the
//! pipeline logs them and moves on.

use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use super::record::{ParseError, TypedRecord};

/// Sink write failures
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("sink rejected item: {0}")]
    Rejected(String),
}

/// Destination for decoded records and parse failures
pub trait RecordSink: Send {
    fn on_record(&mut self, record: TypedRecord) -> Result<(), SinkError>;

    fn on_error(&mut self, error: ParseError) -> Result<(), SinkError>;

    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<S: RecordSink + ?Sized> RecordSink for Box<S> {
    fn on_record(&mut self, record: TypedRecord) -> Result<(), SinkError> {
        (**self).on_record(record)
    }

    fn on_error(&mut self, error: ParseError) -> Result<(), SinkError> {
        (**self).on_error(error)
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        (**self).flush()
    }
}

#[derive(serde::Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Line<'a> {
    Record(&'a TypedRecord),
    Error(&'a ParseError),
}

/// One JSON object per line
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
    lines: usize,
    flush_every: usize,
}

impl JsonLinesSink<BufWriter<std::fs::File>> {
    /// Append to a file, creating it if needed
    pub fn append(path: &Path) -> Result<Self, SinkError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl JsonLinesSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout()).flush_every(1)
    }
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            lines: 0,
            flush_every: 100,
        }
    }

    /// Flush after every `n` lines (0 disables periodic flushing)
    pub fn flush_every(mut self, n: usize) -> Self {
        self.flush_every = n;
        self
    }

    pub fn lines_written(&self) -> usize {
        self.lines
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, line: &Line<'_>) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.writer, line)?;
        self.writer.write_all(b"\n")?;
        self.lines += 1;
        if self.flush_every > 0 && self.lines % self.flush_every == 0 {
            self.writer.flush()?;
        }
        Ok(())
    }
}

impl<W: Write + Send> RecordSink for JsonLinesSink<W> {
    fn on_record(&mut self, record: TypedRecord) -> Result<(), SinkError> {
        self.write_line(&Line::Record(&record))
    }

    fn on_error(&mut self, error: ParseError) -> Result<(), SinkError> {
        self.write_line(&Line::Error(&error))
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Item observed by a [`MemorySink`], in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum SinkItem {
    Record(TypedRecord),
    Error(ParseError),
}

/// In-memory collector; clones share the same buffer
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    items: Arc<Mutex<Vec<SinkItem>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> Vec<SinkItem> {
        self.items.lock().clone()
    }

    pub fn records(&self) -> Vec<TypedRecord> {
        self.items
            .lock()
            .iter()
            .filter_map(|item| match item {
                SinkItem::Record(r) => Some(r.clone()),
                SinkItem::Error(_) => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<ParseError> {
        self.items
            .lock()
            .iter()
            .filter_map(|item| match item {
                SinkItem::Error(e) => Some(e.clone()),
                SinkItem::Record(_) => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn clear(&self) {
        self.items.lock().clear();
    }
}

impl RecordSink for MemorySink {
    fn on_record(&mut self, record: TypedRecord) -> Result<(), SinkError> {
        self.items.lock().push(SinkItem::Record(record));
        Ok(())
    }

    fn on_error(&mut self, error: ParseError) -> Result<(), SinkError> {
        self.items.lock().push(SinkItem::Error(error));
        Ok(())
    }
}
