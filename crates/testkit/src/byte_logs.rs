//! Capture rendered log output in memory and inspect it as parsed records.
//!
//! A [`SharedBuffer`] is handed to the logger under test as its sink (or to a
//! `tracing_subscriber` as its writer). [`ByteLogs`] then parses the captured
//! newline-delimited JSON and answers questions about it.

use scoped_log_adapters::LogSink;
use serde_json::{Map, Value};
use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use tracing_subscriber::fmt::MakeWriter;

/// Messages that mark a consumer task as finished.
pub const DEFAULT_END_MESSAGES: [&str; 2] = [
    "task-consumer: successfully processed message",
    "task-consumer: failed to process message",
];

/// One parsed log line.
pub type LogRecord = Map<String, Value>;

/// Clonable byte buffer; every clone appends to the same storage.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    /// Empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes.
    pub fn append(&self, bytes: &[u8]) {
        self.bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(bytes);
    }

    /// Copy of everything written so far.
    pub fn contents(&self) -> Vec<u8> {
        self.bytes.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Contents decoded as UTF-8, replacing invalid sequences.
    pub fn to_string_lossy(&self) -> String {
        let bytes = self.bytes.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Returns true when nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.bytes.lock().unwrap_or_else(PoisonError::into_inner).is_empty()
    }

    /// Drop everything written so far.
    pub fn clear(&self) {
        self.bytes.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl LogSink for SharedBuffer {
    fn write_line(&self, line: &str) {
        self.append(line.as_bytes());
    }
}

impl io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.append(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for SharedBuffer {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Parsed view over captured JSON log output.
///
/// Only newline-terminated lines are considered; a line still being written
/// shows up on the first [`ByteLogs::parse`] after its newline lands. Lines
/// that are not JSON objects are skipped.
#[derive(Debug, Clone, Default)]
pub struct ByteLogs {
    log: Option<SharedBuffer>,
    parsed: Vec<LogRecord>,
}

impl ByteLogs {
    /// Capture bound to `log`, parsed once up front.
    pub fn new(log: SharedBuffer) -> Self {
        let mut logs = Self {
            log: Some(log),
            parsed: Vec::new(),
        };
        logs.parse(None);
        logs
    }

    /// Re-read the buffer and replace the parsed records.
    ///
    /// `log` rebinds the capture to another buffer first. Parsing is
    /// idempotent: the records always mirror the buffer's current complete
    /// lines, so repeated calls never duplicate entries.
    pub fn parse(&mut self, log: Option<&SharedBuffer>) {
        if let Some(log) = log {
            self.log = Some(log.clone());
        }
        let text = self.log.as_ref().map(SharedBuffer::to_string_lossy).unwrap_or_default();
        self.parsed = parse_complete_lines(&text);
    }

    /// Records from the most recent parse.
    pub fn records(&self) -> &[LogRecord] {
        &self.parsed
    }

    /// Returns true when any record maps `key` to exactly `value`.
    pub fn log_in_logs(&self, key: &str, value: &Value) -> bool {
        self.parsed.iter().any(|record| record.get(key) == Some(value))
    }

    /// Returns true once any parsed record's `msg` is one of `messages`, or
    /// of [`DEFAULT_END_MESSAGES`] when `messages` is empty.
    ///
    /// Lines logged after the sentinel do not change the answer.
    pub fn check_for_log_end_message(&self, messages: &[&str]) -> bool {
        let candidates: &[&str] = if messages.is_empty() {
            &DEFAULT_END_MESSAGES
        } else {
            messages
        };
        candidates
            .iter()
            .any(|msg| self.log_in_logs("msg", &Value::from(*msg)))
    }
}

fn parse_complete_lines(text: &str) -> Vec<LogRecord> {
    let complete = text.rfind('\n').map_or("", |end| &text[..end]);
    complete
        .lines()
        .filter_map(|line| serde_json::from_str::<LogRecord>(line.trim()).ok())
        .collect()
}
