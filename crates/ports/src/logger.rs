//! Structured logging boundary contract.

use scoped_log_domain::{Field, LogFields, LogLevel, ScopeError, current_fields};
use scoped_log_shared::{ErrorCode, ErrorEnvelope, RequestContext};
use std::fmt;
use std::sync::Arc;

/// Field name used for the request correlation id.
pub const REQUEST_ID_FIELD: &str = "requestID";

/// Structured log event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    /// Severity.
    pub level: LogLevel,
    /// Rendered message.
    pub message: Box<str>,
    /// Optional structured fields.
    pub fields: Option<LogFields>,
}

impl LogEvent {
    /// Create an event without fields.
    pub fn new(level: LogLevel, message: impl Into<Box<str>>) -> Self {
        Self {
            level,
            message: message.into(),
            fields: None,
        }
    }

    /// Attach fields to the event.
    #[must_use]
    pub fn with_fields(mut self, fields: LogFields) -> Self {
        self.fields = Some(fields);
        self
    }
}

/// Error returned by the log-and-return helpers; carries the logged message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct LogError {
    message: Box<str>,
}

impl LogError {
    /// Create an error from a rendered message.
    pub fn new(message: impl Into<Box<str>>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The logged message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<LogError> for ErrorEnvelope {
    fn from(error: LogError) -> Self {
        Self::expected(ErrorCode::new("log", "error"), error.message)
    }
}

fn render(args: fmt::Arguments<'_>) -> String {
    args.as_str()
        .map_or_else(|| args.to_string(), ToOwned::to_owned)
}

/// Boundary contract for structured logging.
///
/// Implementors supply [`LoggerPort::log`] and [`LoggerPort::child`]; every
/// level helper funnels through [`LoggerPort::emit`], which checks
/// [`LoggerPort::enabled`] before rendering the message.
pub trait LoggerPort: Send + Sync {
    /// Emit a structured event.
    fn log(&self, event: LogEvent);

    /// Create a child logger with base fields applied to every event.
    fn child(&self, fields: LogFields) -> Box<dyn LoggerPort>;

    /// Returns false when events at `level` would be dropped.
    fn enabled(&self, _level: LogLevel) -> bool {
        true
    }

    /// Called after a fatal event has been written.
    fn terminate(&self) -> ! {
        std::process::exit(1)
    }

    /// Render and emit one event if `level` is enabled.
    fn emit(&self, level: LogLevel, fields: Option<LogFields>, args: fmt::Arguments<'_>) {
        if !self.enabled(level) {
            return;
        }
        self.log(LogEvent {
            level,
            message: render(args).into_boxed_str(),
            fields,
        });
    }

    /// Trace event.
    fn trace(&self, message: &str) {
        self.emit(LogLevel::Trace, None, format_args!("{message}"));
    }

    /// Trace event from format arguments.
    fn trace_fmt(&self, args: fmt::Arguments<'_>) {
        self.emit(LogLevel::Trace, None, args);
    }

    /// Trace event with fields.
    fn trace_with_fields(&self, fields: LogFields, message: &str) {
        self.emit(LogLevel::Trace, Some(fields), format_args!("{message}"));
    }

    /// Trace event with fields from format arguments.
    fn trace_with_fields_fmt(&self, fields: LogFields, args: fmt::Arguments<'_>) {
        self.emit(LogLevel::Trace, Some(fields), args);
    }

    /// Debug event.
    fn debug(&self, message: &str) {
        self.emit(LogLevel::Debug, None, format_args!("{message}"));
    }

    /// Debug event from format arguments.
    fn debug_fmt(&self, args: fmt::Arguments<'_>) {
        self.emit(LogLevel::Debug, None, args);
    }

    /// Debug event with fields.
    fn debug_with_fields(&self, fields: LogFields, message: &str) {
        self.emit(LogLevel::Debug, Some(fields), format_args!("{message}"));
    }

    /// Debug event with fields from format arguments.
    fn debug_with_fields_fmt(&self, fields: LogFields, args: fmt::Arguments<'_>) {
        self.emit(LogLevel::Debug, Some(fields), args);
    }

    /// Info event.
    fn info(&self, message: &str) {
        self.emit(LogLevel::Info, None, format_args!("{message}"));
    }

    /// Info event from format arguments.
    fn info_fmt(&self, args: fmt::Arguments<'_>) {
        self.emit(LogLevel::Info, None, args);
    }

    /// Info event with fields.
    fn info_with_fields(&self, fields: LogFields, message: &str) {
        self.emit(LogLevel::Info, Some(fields), format_args!("{message}"));
    }

    /// Info event with fields from format arguments.
    fn info_with_fields_fmt(&self, fields: LogFields, args: fmt::Arguments<'_>) {
        self.emit(LogLevel::Info, Some(fields), args);
    }

    /// Warn event.
    fn warn(&self, message: &str) {
        self.emit(LogLevel::Warn, None, format_args!("{message}"));
    }

    /// Warn event from format arguments.
    fn warn_fmt(&self, args: fmt::Arguments<'_>) {
        self.emit(LogLevel::Warn, None, args);
    }

    /// Warn event with fields.
    fn warn_with_fields(&self, fields: LogFields, message: &str) {
        self.emit(LogLevel::Warn, Some(fields), format_args!("{message}"));
    }

    /// Warn event with fields from format arguments.
    fn warn_with_fields_fmt(&self, fields: LogFields, args: fmt::Arguments<'_>) {
        self.emit(LogLevel::Warn, Some(fields), args);
    }

    /// Error event.
    fn error(&self, message: &str) {
        self.emit(LogLevel::Error, None, format_args!("{message}"));
    }

    /// Error event from format arguments.
    fn error_fmt(&self, args: fmt::Arguments<'_>) {
        self.emit(LogLevel::Error, None, args);
    }

    /// Error event with fields.
    fn error_with_fields(&self, fields: LogFields, message: &str) {
        self.emit(LogLevel::Error, Some(fields), format_args!("{message}"));
    }

    /// Error event with fields from format arguments.
    fn error_with_fields_fmt(&self, fields: LogFields, args: fmt::Arguments<'_>) {
        self.emit(LogLevel::Error, Some(fields), args);
    }

    /// Fatal event, then [`LoggerPort::terminate`].
    fn fatal(&self, message: &str) -> ! {
        self.fatal_with_fields_fmt(LogFields::new(), format_args!("{message}"))
    }

    /// Fatal event from format arguments.
    fn fatal_fmt(&self, args: fmt::Arguments<'_>) -> ! {
        self.fatal_with_fields_fmt(LogFields::new(), args)
    }

    /// Fatal event with fields.
    fn fatal_with_fields(&self, fields: LogFields, message: &str) -> ! {
        self.fatal_with_fields_fmt(fields, format_args!("{message}"))
    }

    /// Fatal event with fields from format arguments.
    fn fatal_with_fields_fmt(&self, fields: LogFields, args: fmt::Arguments<'_>) -> ! {
        let fields = (!fields.is_empty()).then_some(fields);
        self.emit(LogLevel::Fatal, fields, args);
        self.terminate()
    }

    /// Panic event, then unwind with the message.
    fn panic(&self, message: &str) -> ! {
        self.panic_with_fields_fmt(LogFields::new(), format_args!("{message}"))
    }

    /// Panic event from format arguments.
    fn panic_fmt(&self, args: fmt::Arguments<'_>) -> ! {
        self.panic_with_fields_fmt(LogFields::new(), args)
    }

    /// Panic event with fields.
    fn panic_with_fields(&self, fields: LogFields, message: &str) -> ! {
        self.panic_with_fields_fmt(fields, format_args!("{message}"))
    }

    /// Panic event with fields from format arguments.
    #[expect(
        clippy::panic,
        reason = "panic-level events unwind by contract so scope guards still run"
    )]
    fn panic_with_fields_fmt(&self, fields: LogFields, args: fmt::Arguments<'_>) -> ! {
        let message = render(args);
        let fields = (!fields.is_empty()).then_some(fields);
        self.log(LogEvent {
            level: LogLevel::Panic,
            message: message.clone().into_boxed_str(),
            fields,
        });
        panic!("{message}")
    }

    /// Error event; returns an error carrying the same message.
    fn new_error(&self, message: &str) -> LogError {
        self.new_error_with_fields_fmt(LogFields::new(), format_args!("{message}"))
    }

    /// [`LoggerPort::new_error`] from format arguments.
    fn new_error_fmt(&self, args: fmt::Arguments<'_>) -> LogError {
        self.new_error_with_fields_fmt(LogFields::new(), args)
    }

    /// [`LoggerPort::new_error`] with fields.
    fn new_error_with_fields(&self, fields: LogFields, message: &str) -> LogError {
        self.new_error_with_fields_fmt(fields, format_args!("{message}"))
    }

    /// [`LoggerPort::new_error`] with fields from format arguments.
    fn new_error_with_fields_fmt(&self, fields: LogFields, args: fmt::Arguments<'_>) -> LogError {
        let message = render(args);
        let fields = (!fields.is_empty()).then_some(fields);
        if self.enabled(LogLevel::Error) {
            self.log(LogEvent {
                level: LogLevel::Error,
                message: message.clone().into_boxed_str(),
                fields,
            });
        }
        LogError::new(message)
    }

    /// Child logger carrying the context's correlation id as `requestID`.
    fn for_request(&self, ctx: &RequestContext) -> Box<dyn LoggerPort> {
        let mut fields = LogFields::new();
        fields.insert(
            REQUEST_ID_FIELD.into(),
            ctx.correlation_id().as_str().into(),
        );
        self.child(fields)
    }

    /// Child logger carrying every field currently scoped on `ctx`.
    fn with_context(&self, ctx: &RequestContext) -> Result<Box<dyn LoggerPort>, ScopeError> {
        let fields = current_fields(ctx, std::iter::empty::<Field>())?;
        Ok(self.child(fields))
    }
}

impl<T: LoggerPort + ?Sized> LoggerPort for Arc<T> {
    fn log(&self, event: LogEvent) {
        (**self).log(event);
    }

    fn child(&self, fields: LogFields) -> Box<dyn LoggerPort> {
        (**self).child(fields)
    }

    fn enabled(&self, level: LogLevel) -> bool {
        (**self).enabled(level)
    }

    fn terminate(&self) -> ! {
        (**self).terminate()
    }
}

impl<T: LoggerPort + ?Sized> LoggerPort for Box<T> {
    fn log(&self, event: LogEvent) {
        (**self).log(event);
    }

    fn child(&self, fields: LogFields) -> Box<dyn LoggerPort> {
        (**self).child(fields)
    }

    fn enabled(&self, level: LogLevel) -> bool {
        (**self).enabled(level)
    }

    fn terminate(&self) -> ! {
        (**self).terminate()
    }
}

impl<T: LoggerPort + ?Sized> LoggerPort for &T {
    fn log(&self, event: LogEvent) {
        (**self).log(event);
    }

    fn child(&self, fields: LogFields) -> Box<dyn LoggerPort> {
        (**self).child(fields)
    }

    fn enabled(&self, level: LogLevel) -> bool {
        (**self).enabled(level)
    }

    fn terminate(&self) -> ! {
        (**self).terminate()
    }
}
