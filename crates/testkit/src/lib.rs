//! # scoped-log-testkit
//!
//! Log capture and recording helpers.
//! This crate depends on `adapters` and `ports`.

pub mod byte_logs;
pub mod in_memory;

pub use byte_logs::{ByteLogs, DEFAULT_END_MESSAGES, LogRecord, SharedBuffer};
pub use in_memory::{MemorySink, NoopLogger, RecordingLogger};

/// Returns the testkit crate version.
#[must_use]
pub const fn testkit_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use scoped_log_ports::{LogLevel, LoggerPort, ports_crate_version};
    use scoped_log_shared::shared_crate_version;

    #[test]
    fn testkit_crate_compiles() {
        let version = testkit_crate_version();
        assert!(!version.is_empty());
    }

    #[test]
    fn testkit_can_use_ports_and_shared() {
        assert!(!ports_crate_version().is_empty());
        assert!(!shared_crate_version().is_empty());
    }

    #[test]
    fn noop_logger_reports_everything_disabled() {
        let logger = NoopLogger;
        assert!(!logger.enabled(LogLevel::Panic));
        logger.info("ignored");
    }
}
