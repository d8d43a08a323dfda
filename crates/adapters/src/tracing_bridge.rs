//! Logger backend that forwards events to the `tracing` ecosystem.
//!
//! Lets a host that already installed a `tracing` subscriber receive scoped
//! fields without a second output stream. Fields are attached as one
//! JSON-encoded `fields` value; `fatal` and `panic` map to `ERROR`.

use scoped_log_ports::{LogEvent, LogFields, LogLevel, LoggerPort};
use serde_json::Value;

/// `tracing` target used for every forwarded event.
pub const TRACING_TARGET: &str = "scoped_log";

/// Forwards events to the current `tracing` dispatcher.
#[derive(Debug, Clone, Default)]
pub struct TracingLogger {
    base_fields: LogFields,
}

impl TracingLogger {
    /// Create a bridge with no base fields.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoggerPort for TracingLogger {
    fn log(&self, event: LogEvent) {
        let mut fields = self.base_fields.clone();
        if let Some(extra) = event.fields {
            fields.extend(extra);
        }
        let encoded = if fields.is_empty() {
            String::new()
        } else {
            let object: serde_json::Map<String, Value> = fields
                .into_iter()
                .map(|(name, value)| (name.into_string(), value))
                .collect();
            Value::Object(object).to_string()
        };
        let message = &*event.message;
        let level = event.level.as_str();

        match event.level {
            LogLevel::Trace => {
                tracing::trace!(target: TRACING_TARGET, level, fields = %encoded, "{message}");
            },
            LogLevel::Debug => {
                tracing::debug!(target: TRACING_TARGET, level, fields = %encoded, "{message}");
            },
            LogLevel::Info => {
                tracing::info!(target: TRACING_TARGET, level, fields = %encoded, "{message}");
            },
            LogLevel::Warn => {
                tracing::warn!(target: TRACING_TARGET, level, fields = %encoded, "{message}");
            },
            LogLevel::Error | LogLevel::Fatal | LogLevel::Panic => {
                tracing::error!(target: TRACING_TARGET, level, fields = %encoded, "{message}");
            },
        }
    }

    fn child(&self, fields: LogFields) -> Box<dyn LoggerPort> {
        let mut merged = self.base_fields.clone();
        merged.extend(fields);
        Box::new(Self {
            base_fields: merged,
        })
    }

    fn enabled(&self, level: LogLevel) -> bool {
        match level {
            LogLevel::Trace => tracing::enabled!(target: TRACING_TARGET, tracing::Level::TRACE),
            LogLevel::Debug => tracing::enabled!(target: TRACING_TARGET, tracing::Level::DEBUG),
            LogLevel::Info => tracing::enabled!(target: TRACING_TARGET, tracing::Level::INFO),
            LogLevel::Warn => tracing::enabled!(target: TRACING_TARGET, tracing::Level::WARN),
            LogLevel::Error | LogLevel::Fatal | LogLevel::Panic => {
                tracing::enabled!(target: TRACING_TARGET, tracing::Level::ERROR)
            },
        }
    }
}
