//! Environment variable parsing and env-to-config merging.
//!
//! Level and format values follow the lenient name parsing used everywhere
//! else. The scope policy is strict: an unknown policy fails fast instead of
//! silently flipping between loud and quiet missing-scope handling.

use crate::schema::LoggerConfig;
use scoped_log_domain::{LogFormat, LogLevel, ScopePolicy};
use scoped_log_shared::{ErrorCode, ErrorEnvelope};
use std::collections::BTreeMap;
use std::fmt;

/// Env var: output format (`text` or `json`).
pub const ENV_LOG_FORMAT: &str = "SCOPED_LOG_FORMAT";
/// Env var: minimum level.
pub const ENV_LOG_LEVEL: &str = "SCOPED_LOG_LEVEL";
/// Env var: missing-scope policy (`strict` or `lenient`).
pub const ENV_LOG_SCOPE_POLICY: &str = "SCOPED_LOG_SCOPE_POLICY";

/// Logger overrides read from the environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoggerEnv {
    /// Output format override.
    pub format: Option<LogFormat>,
    /// Level override.
    pub level: Option<LogLevel>,
    /// Scope policy override.
    pub scope_policy: Option<ScopePolicy>,
}

impl LoggerEnv {
    /// Parse env overrides from a key/value map (useful for tests and fixtures).
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self, EnvParseError> {
        Ok(Self {
            format: parse_optional_trimmed(map, ENV_LOG_FORMAT)?.map(LogFormat::parse_or_text),
            level: parse_optional_trimmed(map, ENV_LOG_LEVEL)?.map(LogLevel::parse_or_info),
            scope_policy: parse_optional_policy(map, ENV_LOG_SCOPE_POLICY)?,
        })
    }

    /// Parse env overrides from the current process environment.
    pub fn from_std_env() -> Result<Self, EnvParseError> {
        let mut map = BTreeMap::new();
        for name in [ENV_LOG_FORMAT, ENV_LOG_LEVEL, ENV_LOG_SCOPE_POLICY] {
            if let Ok(value) = std::env::var(name) {
                map.insert(name.to_string(), value);
            }
        }
        Self::from_map(&map)
    }
}

/// Apply env overrides to a base config (env wins over file/default values).
#[must_use]
pub fn apply_env_overrides(mut base: LoggerConfig, env: &LoggerEnv) -> LoggerConfig {
    if let Some(format) = env.format {
        base.format = format;
    }
    if let Some(level) = env.level {
        base.level = level;
    }
    if let Some(policy) = env.scope_policy {
        base.scope_policy = policy;
    }
    base
}

fn parse_optional_trimmed<'a>(
    map: &'a BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<&'a str>, EnvParseError> {
    match map.get(var) {
        None => Ok(None),
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Err(EnvParseError::EmptyValue { var });
            }
            Ok(Some(trimmed))
        },
    }
}

fn parse_optional_policy(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<ScopePolicy>, EnvParseError> {
    let Some(value) = parse_optional_trimmed(map, var)? else {
        return Ok(None);
    };
    match value.to_ascii_lowercase().as_str() {
        "strict" => Ok(Some(ScopePolicy::Strict)),
        "lenient" => Ok(Some(ScopePolicy::Lenient)),
        _ => Err(EnvParseError::InvalidEnum {
            var,
            value: value.to_string(),
        }),
    }
}

/// Validation failures when parsing env variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvParseError {
    /// An env var was present but empty after trimming.
    EmptyValue {
        /// Env var name.
        var: &'static str,
    },
    /// Enum env var had an invalid value.
    InvalidEnum {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
}

impl EnvParseError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::EmptyValue { .. } => ErrorCode::new("config", "empty_env_var"),
            Self::InvalidEnum { .. } => ErrorCode::new("config", "invalid_env_enum"),
        }
    }
}

impl fmt::Display for EnvParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyValue { var } => write!(formatter, "{var} must be non-empty"),
            Self::InvalidEnum { var, .. } => write!(formatter, "{var} has an unsupported value"),
        }
    }
}

impl std::error::Error for EnvParseError {}

impl From<EnvParseError> for ErrorEnvelope {
    fn from(error: EnvParseError) -> Self {
        let envelope = Self::expected(error.error_code(), error.to_string());
        match error {
            EnvParseError::EmptyValue { var } => envelope.with_metadata("env_var", var),
            EnvParseError::InvalidEnum { var, value } => envelope
                .with_metadata("env_var", var)
                .with_metadata("value", value),
        }
    }
}
