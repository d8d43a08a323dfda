//! # scoped-log-adapters
//!
//! Implementations of the logger port: the structured text/JSON backend, a
//! `tracing` bridge, the prefixing decorator, and an `io::Write` adapter.
//! This crate depends on `ports`, `config`, `domain`, and `shared`.

pub mod default;
pub mod log_sink;
pub mod logger;
pub mod prefixed;
pub mod tracing_bridge;
pub mod writer;

pub use default::{
    default_is_initialized, default_logger, init_default, init_default_with_sink,
    install_default,
};
pub use log_sink::{LogSink, StderrLogSink, StdoutLogSink, WriterSink};
pub use logger::{RESERVED_KEYS, StructuredLogger};
pub use prefixed::{PrefixedLogger, WrappedError};
pub use tracing_bridge::{TRACING_TARGET, TracingLogger};
pub use writer::LogWriter;

/// Returns the adapters crate version.
#[must_use]
pub const fn adapters_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
