//! Logger configuration schema.

use scoped_log_domain::{LogFormat, LogLevel, ScopeBinding, ScopePolicy};
use serde::{Deserialize, Serialize};

/// Logger configuration.
///
/// Level and format names are parsed leniently: unrecognized levels become
/// `info` and unrecognized formats become `text`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggerConfig {
    /// Output rendering.
    pub format: LogFormat,
    /// Minimum level written.
    pub level: LogLevel,
    /// Missing-scope behavior for push/pop.
    pub scope_policy: ScopePolicy,
}

impl LoggerConfig {
    /// Build from the `formatted`/`level` pair used by simple call sites.
    #[must_use]
    pub fn new(json: bool, level: &str) -> Self {
        Self {
            format: LogFormat::from_json_flag(json),
            level: LogLevel::parse_or_info(level),
            scope_policy: ScopePolicy::default(),
        }
    }

    /// JSON output at `info`; the shape used by the process-wide default.
    #[must_use]
    pub fn json_info() -> Self {
        Self::new(true, "info")
    }

    /// Scope binding for the configured policy.
    #[must_use]
    pub const fn scope_binding(&self) -> ScopeBinding {
        ScopeBinding::new(self.scope_policy)
    }
}

/// On-disk layout: settings live under a `[logging]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfigFile {
    /// Logger settings.
    pub logging: LoggingSection,
}

/// Partial logger settings as read from a file; absent keys keep defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct LoggingSection {
    /// Output rendering.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<LogFormat>,
    /// Minimum level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<LogLevel>,
    /// Missing-scope behavior.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope_policy: Option<ScopePolicy>,
}

impl LoggingSection {
    /// Overlay the present keys onto `config`.
    pub fn apply_to(&self, config: &mut LoggerConfig) {
        if let Some(format) = self.format {
            config.format = format;
        }
        if let Some(level) = self.level {
            config.level = level;
        }
        if let Some(policy) = self.scope_policy {
            config.scope_policy = policy;
        }
    }
}
