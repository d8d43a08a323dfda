//! # scoped-log-ports
//!
//! The logger contract shared by every backend and decorator.
//!
//! This crate depends only on `domain` and `shared`.

pub mod logger;

pub use logger::{LogError, LogEvent, LoggerPort, REQUEST_ID_FIELD};

// Re-export the domain types used in port signatures, so adapter crates can
// implement the port without directly depending on `scoped-log-domain`.
pub use scoped_log_domain::{LogFields, LogLevel, ScopeError};

/// Returns the ports crate version.
#[must_use]
pub const fn ports_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
