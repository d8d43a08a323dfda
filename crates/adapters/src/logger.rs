//! Structured logger backend rendering text or JSON lines.

use crate::log_sink::LogSink;
use scoped_log_config::LoggerConfig;
use scoped_log_domain::LogFormat;
use scoped_log_ports::{LogEvent, LogFields, LogLevel, LoggerPort};
use scoped_log_shared::redaction::{REDACTED, is_secret_key, redact_value};
use serde_json::Value;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Top-level keys written by the backend itself.
pub const RESERVED_KEYS: [&str; 3] = ["time", "level", "msg"];

/// Logger emitting one line per event.
///
/// JSON lines look like `{"level":"info","msg":"…","time":<epoch ms>,…}` with
/// event fields flattened to the top level. Text lines look like
/// `time=<ms> level=info msg="…" key=value`, keys sorted. In both formats a
/// field whose name collides with a reserved key is written as
/// `fields.<name>`.
#[derive(Clone)]
pub struct StructuredLogger {
    sink: Arc<dyn LogSink>,
    format: LogFormat,
    base_fields: LogFields,
    min_level: LogLevel,
    redact: bool,
}

impl StructuredLogger {
    /// Create a text logger at `info` backed by the provided sink.
    #[must_use]
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            format: LogFormat::Text,
            base_fields: LogFields::new(),
            min_level: LogLevel::Info,
            redact: false,
        }
    }

    /// Create a logger from config.
    #[must_use]
    pub fn from_config(config: &LoggerConfig, sink: Arc<dyn LogSink>) -> Self {
        Self::new(sink)
            .with_format(config.format)
            .with_min_level(config.level)
    }

    /// Set the output format.
    #[must_use]
    pub const fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set base fields applied to every event.
    #[must_use]
    pub fn with_base_fields(mut self, fields: LogFields) -> Self {
        self.base_fields = fields;
        self
    }

    /// Set the minimum log level.
    #[must_use]
    pub const fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Replace values under secret-looking keys with `[REDACTED]`.
    #[must_use]
    pub const fn with_redaction(mut self, redact: bool) -> Self {
        self.redact = redact;
        self
    }

    /// Configured format.
    #[must_use]
    pub const fn format(&self) -> LogFormat {
        self.format
    }

    /// Configured minimum level.
    #[must_use]
    pub const fn min_level(&self) -> LogLevel {
        self.min_level
    }

    fn render(&self, event: LogEvent) -> String {
        let mut fields = self.base_fields.clone();
        if let Some(extra) = event.fields {
            fields.extend(extra);
        }
        if self.redact {
            redact_fields(&mut fields);
        }

        let time = now_epoch_ms();
        match self.format {
            LogFormat::Json => render_json(time, event.level, &event.message, fields),
            LogFormat::Text => render_text(time, event.level, &event.message, &fields),
        }
    }
}

impl LoggerPort for StructuredLogger {
    fn log(&self, event: LogEvent) {
        if !self.enabled(event.level) {
            return;
        }
        let line = self.render(event);
        self.sink.write_line(&line);
    }

    fn child(&self, fields: LogFields) -> Box<dyn LoggerPort> {
        let mut merged = self.base_fields.clone();
        merged.extend(fields);
        Box::new(Self {
            base_fields: merged,
            ..self.clone()
        })
    }

    fn enabled(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }
}

fn output_key(name: &str) -> String {
    if RESERVED_KEYS.contains(&name) {
        format!("fields.{name}")
    } else {
        name.to_string()
    }
}

fn render_json(time: u64, level: LogLevel, message: &str, fields: LogFields) -> String {
    let mut payload = serde_json::Map::new();
    for (name, value) in fields {
        payload.insert(output_key(&name), value);
    }
    payload.insert("time".to_string(), Value::from(time));
    payload.insert("level".to_string(), Value::from(level.as_str()));
    payload.insert("msg".to_string(), Value::from(message));

    serde_json::to_string(&Value::Object(payload)).map_or_else(
        |_| format!("{{\"level\":\"error\",\"msg\":\"log serialization failed\",\"time\":{time}}}\n"),
        |mut encoded| {
            encoded.push('\n');
            encoded
        },
    )
}

fn render_text(time: u64, level: LogLevel, message: &str, fields: &LogFields) -> String {
    let mut line = format!("time={time} level={level} msg={}", quote(message));
    let mut entries: Vec<(String, &Value)> = fields
        .iter()
        .map(|(name, value)| (output_key(name), value))
        .collect();
    entries.sort_by(|left, right| left.0.cmp(&right.0));

    for (key, value) in entries {
        let rendered = match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        let _ = write!(line, " {key}={}", quote_if_needed(&rendered));
    }
    line.push('\n');
    line
}

fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{text}\""))
}

fn quote_if_needed(text: &str) -> String {
    let needs_quotes = text.is_empty()
        || text
            .chars()
            .any(|ch| ch.is_whitespace() || ch == '=' || ch == '"');
    if needs_quotes {
        quote(text)
    } else {
        text.to_string()
    }
}

fn redact_fields(fields: &mut LogFields) {
    for (key, value) in fields.iter_mut() {
        if is_secret_key(key) {
            *value = Value::String(REDACTED.to_string());
        } else {
            redact_value(value);
        }
    }
}

fn now_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|duration| u64::try_from(duration.as_millis()).ok())
        .unwrap_or_default()
}
