//! The process-wide default logger.
//!
//! Library code takes an `Arc<dyn LoggerPort>` explicitly. The default exists
//! for top-level wiring and for decorators built without an inner logger. It
//! is installed at most once; later attempts are rejected.
//!
//! Installing through a `LoggerConfig` also fixes the process-wide scope
//! policy, so the free scope functions follow `scope_policy` from config.

use crate::log_sink::{LogSink, StdoutLogSink};
use crate::logger::StructuredLogger;
use scoped_log_config::LoggerConfig;
use scoped_log_domain::install_scope_policy;
use scoped_log_ports::LoggerPort;
use scoped_log_shared::{ErrorCode, ErrorEnvelope};
use std::sync::{Arc, OnceLock};

static DEFAULT_LOGGER: OnceLock<Arc<dyn LoggerPort>> = OnceLock::new();

/// Install a logger built from `config` writing to stdout.
pub fn init_default(config: &LoggerConfig) -> Result<Arc<dyn LoggerPort>, ErrorEnvelope> {
    init_default_with_sink(config, Arc::new(StdoutLogSink))
}

/// Install a logger built from `config` writing to `sink`, then fix
/// `config.scope_policy` as the process-wide scope policy.
pub fn init_default_with_sink(
    config: &LoggerConfig,
    sink: Arc<dyn LogSink>,
) -> Result<Arc<dyn LoggerPort>, ErrorEnvelope> {
    let logger = install_default(Arc::new(StructuredLogger::from_config(config, sink)))?;
    install_scope_policy(config.scope_policy).map_err(|current| {
        ErrorEnvelope::expected(
            ErrorCode::scope_policy_conflict(),
            "a different scope policy is already in effect",
        )
        .with_metadata("current", format!("{current:?}").to_lowercase())
    })?;
    Ok(logger)
}

/// Install an arbitrary logger as the default.
pub fn install_default(logger: Arc<dyn LoggerPort>) -> Result<Arc<dyn LoggerPort>, ErrorEnvelope> {
    let mut installed = false;
    let current = DEFAULT_LOGGER.get_or_init(|| {
        installed = true;
        logger
    });
    if installed {
        Ok(Arc::clone(current))
    } else {
        Err(ErrorEnvelope::expected(
            ErrorCode::default_already_initialized(),
            "the default logger has already been initialized",
        ))
    }
}

/// The default logger; installs JSON at `info` on stdout when none was set.
pub fn default_logger() -> Arc<dyn LoggerPort> {
    Arc::clone(DEFAULT_LOGGER.get_or_init(|| {
        Arc::new(StructuredLogger::from_config(
            &LoggerConfig::json_info(),
            Arc::new(StdoutLogSink),
        ))
    }))
}

/// Returns true once a default has been installed or lazily created.
pub fn default_is_initialized() -> bool {
    DEFAULT_LOGGER.get().is_some()
}
