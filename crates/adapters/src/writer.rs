//! `io::Write` adapter that turns written lines into log events.
//!
//! Useful for handing a logger to code that only knows how to write bytes,
//! such as a child process's stderr pump.

use scoped_log_ports::{LogLevel, LoggerPort};
use std::io;
use std::sync::Arc;

/// Emits one event per complete line written to it.
///
/// Bytes after the last newline stay buffered until more input completes the
/// line, [`io::Write::flush`] is called, or the writer is dropped. Blank lines
/// and a trailing `\r` are dropped. Events are emitted at the chosen level
/// without terminating or unwinding, even for `fatal` and `panic`.
pub struct LogWriter {
    logger: Arc<dyn LoggerPort>,
    level: LogLevel,
    pending: Vec<u8>,
}

impl LogWriter {
    /// Writer emitting at `info`.
    pub fn new(logger: Arc<dyn LoggerPort>) -> Self {
        Self::with_level(logger, LogLevel::Info)
    }

    /// Writer emitting at `level`.
    pub fn with_level(logger: Arc<dyn LoggerPort>, level: LogLevel) -> Self {
        Self {
            logger,
            level,
            pending: Vec::new(),
        }
    }

    fn emit_line(&self, line: &[u8]) {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.iter().all(u8::is_ascii_whitespace) {
            return;
        }
        let text = String::from_utf8_lossy(line);
        self.logger.emit(self.level, None, format_args!("{text}"));
    }
}

impl io::Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        while let Some(newline) = self.pending.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            self.emit_line(line.strip_suffix(b"\n").unwrap_or(&line));
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            self.emit_line(&line);
        }
        Ok(())
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        let _ = io::Write::flush(self);
    }
}
