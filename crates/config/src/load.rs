//! Config loading helpers (defaults + file + env).
//!
//! The loader is responsible for deterministic merge order and surfacing
//! user-facing errors as typed `ErrorEnvelope`s.

use crate::{LoggerConfig, LoggerConfigFile, LoggerEnv, apply_env_overrides};
use scoped_log_shared::{ErrorCode, ErrorEnvelope, ResultExt};
use std::path::Path;

/// Config file encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON document with a `logging` object.
    Json,
    /// TOML document with a `[logging]` table.
    Toml,
}

/// Load the logger config from in-memory sources.
///
/// Precedence (highest wins):
/// - env overrides (`LoggerEnv`)
/// - config file content
/// - defaults (`LoggerConfig::default()`)
pub fn load_logger_config_from_sources(
    config_text: Option<(&str, ConfigFormat)>,
    env: &LoggerEnv,
) -> Result<LoggerConfig, ErrorEnvelope> {
    let mut config = LoggerConfig::default();
    if let Some((input, format)) = config_text {
        parse_config_file(input, format)?
            .logging
            .apply_to(&mut config);
    }
    Ok(apply_env_overrides(config, env))
}

/// Load the logger config from an optional file path.
pub fn load_logger_config_from_path(
    config_path: Option<&Path>,
    env: &LoggerEnv,
) -> Result<LoggerConfig, ErrorEnvelope> {
    match config_path {
        None => load_logger_config_from_sources(None, env),
        Some(path) => {
            let text = read_config_file(path)?;
            let format = detect_config_format(path)?;
            load_logger_config_from_sources(Some((&text, format)), env)
                .with_error_metadata("path", path.to_string_lossy())
        },
    }
}

/// Load the logger config from std env and an optional file path.
pub fn load_logger_config_std_env(config_path: Option<&Path>) -> Result<LoggerConfig, ErrorEnvelope> {
    let env = LoggerEnv::from_std_env().map_err(ErrorEnvelope::from)?;
    load_logger_config_from_path(config_path, &env)
}

/// Serialize the config as a pretty TOML `[logging]` table (with trailing newline).
pub fn to_pretty_toml(config: &LoggerConfig) -> Result<String, ErrorEnvelope> {
    #[derive(serde::Serialize)]
    struct Wrapper<'a> {
        logging: &'a LoggerConfig,
    }

    let mut output = toml::to_string_pretty(&Wrapper { logging: config }).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::new("config", "serialize_toml"),
            format!("failed to serialize config TOML: {error}"),
        )
    })?;
    output.push('\n');
    Ok(output)
}

fn parse_config_file(input: &str, format: ConfigFormat) -> Result<LoggerConfigFile, ErrorEnvelope> {
    match format {
        ConfigFormat::Json => serde_json::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_json"),
                format!("invalid config JSON: {error}"),
            )
            .with_metadata("source", "config")
        }),
        ConfigFormat::Toml => toml::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_toml"),
                format!("invalid config TOML: {error}"),
            )
            .with_metadata("source", "config")
        }),
    }
}

fn read_config_file(path: &Path) -> Result<String, ErrorEnvelope> {
    std::fs::read_to_string(path).map_err(|error| {
        let code = match error.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::new("config", "config_file_not_found"),
            std::io::ErrorKind::PermissionDenied => {
                ErrorCode::new("config", "config_file_permission_denied")
            },
            _ => ErrorCode::new("config", "config_file_io"),
        };

        ErrorEnvelope::expected(code, format!("failed to read config file: {error}"))
            .with_metadata("path", path.to_string_lossy().to_string())
    })
}

fn detect_config_format(path: &Path) -> Result<ConfigFormat, ErrorEnvelope> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        None | Some("json") => Ok(ConfigFormat::Json),
        Some("toml") => Ok(ConfigFormat::Toml),
        Some(other) => Err(ErrorEnvelope::expected(
            ErrorCode::new("config", "unsupported_format"),
            "unsupported config format; use .json or .toml",
        )
        .with_metadata("extension", other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scoped_log_domain::{LogFormat, LogLevel, ScopePolicy};

    #[test]
    fn override_precedence_is_deterministic() -> Result<(), Box<dyn std::error::Error>> {
        let file = "[logging]\nformat = \"json\"\nlevel = \"debug\"\n";
        let env = LoggerEnv {
            level: Some(LogLevel::Error),
            ..LoggerEnv::default()
        };

        let config = load_logger_config_from_sources(Some((file, ConfigFormat::Toml)), &env)?;
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, LogLevel::Error);
        Ok(())
    }

    #[test]
    fn missing_file_content_uses_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let config = load_logger_config_from_sources(None, &LoggerEnv::default())?;
        assert_eq!(config, LoggerConfig::default());
        Ok(())
    }

    #[test]
    fn malformed_file_is_an_envelope() {
        let result =
            load_logger_config_from_sources(Some(("{not json", ConfigFormat::Json)), &LoggerEnv::default());
        assert_eq!(
            result.err().map(|error| error.code),
            Some(ErrorCode::new("config", "invalid_json"))
        );
    }

    #[test]
    fn unknown_logging_key_is_rejected() {
        let file = "[logging]\nverbosity = 3\n";
        let result = load_logger_config_from_sources(Some((file, ConfigFormat::Toml)), &LoggerEnv::default());
        assert_eq!(
            result.err().map(|error| error.code),
            Some(ErrorCode::new("config", "invalid_toml"))
        );
    }

    #[test]
    fn serialized_toml_reloads() -> Result<(), Box<dyn std::error::Error>> {
        let config = LoggerConfig {
            scope_policy: ScopePolicy::Lenient,
            ..LoggerConfig::new(true, "warn")
        };
        let text = to_pretty_toml(&config)?;
        let reloaded =
            load_logger_config_from_sources(Some((&text, ConfigFormat::Toml)), &LoggerEnv::default())?;
        assert_eq!(reloaded, config);
        Ok(())
    }
}
