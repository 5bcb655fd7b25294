//! Line-oriented output sinks shared by the logger and the metric writer.

use std::io::Write;
use std::sync::{Mutex, PoisonError};

/// A sink that receives pre-formatted, newline-terminated lines.
pub trait LineSink: Send + Sync {
    /// Write a line to the sink.
    fn write_line(&self, line: &str);
}

/// Line sink that writes to stderr.
#[derive(Debug, Default)]
pub struct StderrLineSink;

impl LineSink for StderrLineSink {
    fn write_line(&self, line: &str) {
        let mut stderr = std::io::stderr().lock();
        if let Err(error) = stderr.write_all(line.as_bytes()) {
            eprintln!("line sink write failed: {error}");
        }
    }
}

/// Line sink that writes to stdout.
#[derive(Debug, Default)]
pub struct StdoutLineSink;

impl LineSink for StdoutLineSink {
    fn write_line(&self, line: &str) {
        let mut stdout = std::io::stdout().lock();
        if let Err(error) = stdout.write_all(line.as_bytes()) {
            eprintln!("line sink write failed: {error}");
        }
    }
}

/// Line sink that keeps every line in memory.
#[derive(Debug, Default)]
pub struct MemoryLineSink {
    lines: Mutex<Vec<String>>,
}

impl MemoryLineSink {
    /// Empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the captured lines.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drain the captured lines.
    pub fn take(&self) -> Vec<String> {
        let mut guard = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *guard)
    }
}

impl LineSink for MemoryLineSink {
    fn write_line(&self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
    }
}
