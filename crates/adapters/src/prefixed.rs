//! Decorator that labels every message with a component prefix.

use crate::default::default_logger;
use scoped_log_ports::{LogEvent, LogFields, LogLevel, LoggerPort};
use std::error::Error;
use std::fmt;
use std::sync::Arc;

type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Error wrapped with a component prefix; the original stays reachable through `source()`.
#[derive(Debug, thiserror::Error)]
#[error("{context}: {source}")]
pub struct WrappedError {
    context: Box<str>,
    #[source]
    source: BoxError,
}

impl WrappedError {
    /// The prefix and message placed in front of the source error.
    #[must_use]
    pub fn context(&self) -> &str {
        &self.context
    }
}

/// Logger that renders every message as `"<prefix>: <message>"`.
#[derive(Clone)]
pub struct PrefixedLogger {
    prefix: Arc<str>,
    inner: Arc<dyn LoggerPort>,
}

impl PrefixedLogger {
    /// Wrap `inner`, or the process-wide default logger when `None`.
    pub fn new(prefix: impl Into<Arc<str>>, inner: Option<Arc<dyn LoggerPort>>) -> Self {
        Self {
            prefix: prefix.into(),
            inner: inner.unwrap_or_else(default_logger),
        }
    }

    /// The label placed in front of messages.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Wrap `err` as `"<prefix>: <message>: <err>"` without logging it.
    pub fn prefix_error(&self, err: impl Into<BoxError>, message: &str) -> WrappedError {
        WrappedError {
            context: format!("{}: {message}", self.prefix).into_boxed_str(),
            source: err.into(),
        }
    }

    /// Wrap `err` as `"<prefix>: <err>"` without logging it.
    pub fn wrap_error(&self, err: impl Into<BoxError>) -> WrappedError {
        WrappedError {
            context: self.prefix.as_ref().into(),
            source: err.into(),
        }
    }

    fn prefixed(&self, message: &str) -> Box<str> {
        format!("{}: {message}", self.prefix).into_boxed_str()
    }
}

impl fmt::Debug for PrefixedLogger {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("PrefixedLogger")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl LoggerPort for PrefixedLogger {
    fn log(&self, event: LogEvent) {
        self.inner.log(LogEvent {
            message: self.prefixed(&event.message),
            ..event
        });
    }

    fn child(&self, fields: LogFields) -> Box<dyn LoggerPort> {
        Box::new(Self {
            prefix: Arc::clone(&self.prefix),
            inner: Arc::from(self.inner.child(fields)),
        })
    }

    fn enabled(&self, level: LogLevel) -> bool {
        self.inner.enabled(level)
    }

    fn terminate(&self) -> ! {
        self.inner.terminate()
    }

    #[expect(
        clippy::panic,
        reason = "panic-level events unwind by contract; the payload carries the prefix too"
    )]
    fn panic_with_fields_fmt(&self, fields: LogFields, args: fmt::Arguments<'_>) -> ! {
        let message = self.prefixed(&args.to_string());
        self.inner.log(LogEvent {
            level: LogLevel::Panic,
            message: message.clone(),
            fields: (!fields.is_empty()).then_some(fields),
        });
        panic!("{message}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_sink::LogSink;
    use crate::logger::StructuredLogger;
    use scoped_log_domain::LogFormat;
    use serde_json::{Value, json};
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct MemorySink {
        lines: Mutex<Vec<String>>,
    }

    impl MemorySink {
        fn parsed(&self) -> Vec<Value> {
            self.lines
                .lock()
                .map(|lines| {
                    lines
                        .iter()
                        .filter_map(|line| serde_json::from_str(line.trim()).ok())
                        .collect()
                })
                .unwrap_or_default()
        }
    }

    impl LogSink for MemorySink {
        fn write_line(&self, line: &str) {
            if let Ok(mut guard) = self.lines.lock() {
                guard.push(line.to_string());
            }
        }
    }

    fn json_logger(sink: &Arc<MemorySink>) -> Arc<dyn LoggerPort> {
        Arc::new(
            StructuredLogger::new(sink.clone())
                .with_format(LogFormat::Json)
                .with_min_level(LogLevel::Debug),
        )
    }

    #[test]
    fn messages_carry_the_prefix() {
        let sink = Arc::new(MemorySink::default());
        let logger = PrefixedLogger::new("Test", Some(json_logger(&sink)));

        logger.info("info log");
        let count = 2;
        logger.debug_fmt(format_args!("{count} items"));

        let records = sink.parsed();
        assert_eq!(records[0]["msg"], json!("Test: info log"));
        assert_eq!(records[1]["msg"], json!("Test: 2 items"));
        assert_eq!(records[1]["level"], json!("debug"));
    }

    #[test]
    fn field_variants_forward_fields() {
        let sink = Arc::new(MemorySink::default());
        let logger = PrefixedLogger::new("Foo", Some(json_logger(&sink)));

        let mut fields = LogFields::new();
        fields.insert("jobId".into(), json!(12));
        logger.warn_with_fields(fields, "a warning log");

        let records = sink.parsed();
        assert_eq!(records[0]["msg"], json!("Foo: a warning log"));
        assert_eq!(records[0]["jobId"], json!(12));
    }

    #[test]
    fn child_keeps_prefix_and_adds_fields() {
        let sink = Arc::new(MemorySink::default());
        let logger = PrefixedLogger::new("worker", Some(json_logger(&sink)));

        let mut fields = LogFields::new();
        fields.insert("shard".into(), json!("b"));
        logger.child(fields).error("stalled");

        let records = sink.parsed();
        assert_eq!(records[0]["msg"], json!("worker: stalled"));
        assert_eq!(records[0]["shard"], json!("b"));
    }

    #[test]
    fn level_filter_comes_from_inner_logger() {
        let sink = Arc::new(MemorySink::default());
        let inner = Arc::new(StructuredLogger::new(sink.clone()).with_format(LogFormat::Json));
        let logger = PrefixedLogger::new("quiet", Some(inner));

        assert!(!logger.enabled(LogLevel::Debug));
        logger.debug("hidden");
        assert!(sink.parsed().is_empty());
    }

    #[test]
    fn panic_payload_and_record_both_carry_the_prefix() {
        let sink = Arc::new(MemorySink::default());
        let logger = PrefixedLogger::new("Svc", Some(json_logger(&sink)));

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            logger.panic_fmt(format_args!("boom {}", 7))
        }));

        let payload = outcome.err().and_then(|err| err.downcast::<String>().ok());
        assert_eq!(payload.as_deref().map(String::as_str), Some("Svc: boom 7"));
        let records = sink.parsed();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["msg"], json!("Svc: boom 7"));
        assert_eq!(records[0]["level"], json!("panic"));
    }

    #[test]
    fn new_error_returns_the_unprefixed_message_and_logs_prefixed() {
        let sink = Arc::new(MemorySink::default());
        let logger = PrefixedLogger::new("db", Some(json_logger(&sink)));

        let error = logger.new_error("connection lost");
        assert_eq!(error.message(), "connection lost");
        assert_eq!(sink.parsed()[0]["msg"], json!("db: connection lost"));
    }

    #[test]
    fn prefix_error_and_wrap_error_keep_the_source() {
        let sink = Arc::new(MemorySink::default());
        let logger = PrefixedLogger::new("sync", Some(json_logger(&sink)));
        let cause = std::io::Error::other("disk full");

        let wrapped = logger.prefix_error(cause, "write failed");
        assert_eq!(wrapped.to_string(), "sync: write failed: disk full");
        assert!(wrapped.source().is_some());

        let wrapped = logger.wrap_error("timeout");
        assert_eq!(wrapped.to_string(), "sync: timeout");
        assert_eq!(wrapped.context(), "sync");
        assert!(sink.parsed().is_empty());
    }
}
