//! # scoped-log-config
//!
//! Logger configuration schema and loading.
//! This crate depends on `domain` and `shared` only.

/// Environment variable parsing and merging.
pub mod env;
/// Config loading helpers (defaults + file + env).
pub mod load;
/// Configuration schema types.
pub mod schema;

pub use env::{
    ENV_LOG_FORMAT, ENV_LOG_LEVEL, ENV_LOG_SCOPE_POLICY, EnvParseError, LoggerEnv,
    apply_env_overrides,
};
pub use load::{
    ConfigFormat, load_logger_config_from_path, load_logger_config_from_sources,
    load_logger_config_std_env, to_pretty_toml,
};
pub use schema::{LoggerConfig, LoggerConfigFile, LoggingSection};

/// Returns the config crate version.
#[must_use]
pub const fn config_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
