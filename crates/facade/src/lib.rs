//! # scoped-log
//!
//! Structured logging with fields scoped to a request context.
//!
//! ```ignore
//! use scoped_log::{Field, LoggerPort, RequestContext, establish_scope, enter_scope};
//!
//! let ctx = establish_scope(&RequestContext::new_request(), [Field::new("tenant", "acme")])?;
//! let _job = enter_scope(&ctx, [Field::new("job", 7)])?;
//! let logger = scoped_log::default_logger().with_context(&ctx)?;
//! scoped_log::info!(logger, "processing {} items", 3);
//! ```
//!
//! The pieces live in separate crates and are re-exported here:
//! fields and scopes from `domain`, the [`LoggerPort`] contract from `ports`,
//! backends and decorators from `adapters`, configuration from `config`, and
//! request middleware under [`middleware`].

pub use scoped_log_adapters::{
    LogSink, LogWriter, PrefixedLogger, StderrLogSink, StdoutLogSink, StructuredLogger,
    TracingLogger, WrappedError, WriterSink, default_is_initialized, default_logger, init_default,
    init_default_with_sink, install_default,
};
pub use scoped_log_config::{
    ConfigFormat, EnvParseError, LoggerConfig, LoggerEnv, load_logger_config_from_path,
    load_logger_config_from_sources, load_logger_config_std_env,
};
pub use scoped_log_domain::{
    CONTEXT_KEY_LOG_FIELDS, Field, FieldBatch, FieldStack, FieldValue, LogFields, LogFormat,
    LogLevel, ScopeBinding, ScopeError, ScopeGuard, ScopePolicy, current_fields, enter_scope,
    establish_scope, fields_from_map, install_scope_policy, pop_scope, process_scope_policy,
    push_scope,
};
pub use scoped_log_ports::{LogError, LogEvent, LoggerPort, REQUEST_ID_FIELD};
pub use scoped_log_shared::{CorrelationId, ErrorCode, ErrorEnvelope, RequestContext};

/// HTTP and GraphQL request logging.
pub mod middleware {
    pub use scoped_log_middleware::*;
}

/// A [`PrefixedLogger`] over the default logger.
pub fn prefixed(prefix: &str) -> PrefixedLogger {
    PrefixedLogger::new(prefix, None)
}

/// Returns the facade crate version.
#[must_use]
pub const fn facade_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[doc(hidden)]
#[macro_export]
macro_rules! __log_at {
    ($logger:expr, $level:expr, fields: $fields:expr, $($arg:tt)+) => {{
        use $crate::LoggerPort as _;
        $logger.emit($level, Some($fields), format_args!($($arg)+))
    }};
    ($logger:expr, $level:expr, $($arg:tt)+) => {{
        use $crate::LoggerPort as _;
        $logger.emit($level, None, format_args!($($arg)+))
    }};
}

/// Log at trace: `trace!(logger, "x = {}", x)` or `trace!(logger, fields: f, "..")`.
#[macro_export]
macro_rules! trace {
    ($logger:expr, $($rest:tt)+) => { $crate::__log_at!($logger, $crate::LogLevel::Trace, $($rest)+) };
}

/// Log at debug.
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($rest:tt)+) => { $crate::__log_at!($logger, $crate::LogLevel::Debug, $($rest)+) };
}

/// Log at info.
#[macro_export]
macro_rules! info {
    ($logger:expr, $($rest:tt)+) => { $crate::__log_at!($logger, $crate::LogLevel::Info, $($rest)+) };
}

/// Log at warn.
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($rest:tt)+) => { $crate::__log_at!($logger, $crate::LogLevel::Warn, $($rest)+) };
}

/// Log at error.
#[macro_export]
macro_rules! error {
    ($logger:expr, $($rest:tt)+) => { $crate::__log_at!($logger, $crate::LogLevel::Error, $($rest)+) };
}

#[cfg(test)]
mod tests {
    use super::*;
    use scoped_log_testkit::RecordingLogger;
    use serde_json::json;

    #[test]
    fn facade_crate_compiles() {
        assert!(!facade_crate_version().is_empty());
    }

    #[test]
    fn macros_format_and_attach_fields() {
        let recorder = RecordingLogger::new();
        let count = 3;
        crate::info!(recorder, "processing {count} items");

        let mut fields = LogFields::new();
        fields.insert("job".into(), json!(7));
        crate::warn!(&recorder, fields: fields, "slow job {}", 7);
        crate::trace!(recorder, "plain");

        let events = recorder.events();
        assert_eq!(events.len(), 3);
        assert_eq!(&*events[0].message, "processing 3 items");
        assert_eq!(events[0].level, LogLevel::Info);
        assert_eq!(&*events[1].message, "slow job 7");
        assert_eq!(events[1].fields.as_ref().and_then(|f| f.get("job")), Some(&json!(7)));
        assert_eq!(events[2].level, LogLevel::Trace);
    }

    #[test]
    fn boxed_loggers_work_with_macros() -> Result<(), Box<dyn std::error::Error>> {
        let recorder = RecordingLogger::new();
        let ctx = establish_scope(
            &RequestContext::new(CorrelationId::parse("req_1")?),
            [Field::new("tenant", "acme")],
        )?;
        let scoped = recorder.with_context(&ctx)?;
        crate::error!(scoped, "failed: {}", "disk full");

        let events = recorder.events();
        assert_eq!(&*events[0].message, "failed: disk full");
        assert_eq!(
            events[0].fields.as_ref().and_then(|f| f.get("tenant")),
            Some(&json!("acme"))
        );
        Ok(())
    }
}
