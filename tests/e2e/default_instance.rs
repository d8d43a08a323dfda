//! The process-wide default logger is installed once.

use scoped_log::{LogFormat, LogLevel, LoggerConfig, LoggerPort, ScopePolicy, init_default, init_default_with_sink};
use scoped_log_testkit::{ByteLogs, SharedBuffer};
use serde_json::json;
use std::sync::Arc;

#[test]
fn default_is_set_once_and_used_by_prefixed_loggers() -> Result<(), Box<dyn std::error::Error>> {
    assert!(!scoped_log::default_is_initialized());

    let buffer = SharedBuffer::new();
    let config = LoggerConfig {
        format: LogFormat::Json,
        level: LogLevel::Debug,
        scope_policy: ScopePolicy::Lenient,
    };
    let installed = init_default_with_sink(&config, Arc::new(buffer.clone()))?;
    assert!(scoped_log::default_is_initialized());

    installed.debug("installed");
    scoped_log::prefixed("Boot").info("ready");
    scoped_log::info!(scoped_log::default_logger(), "port {}", 8080);

    let logs = ByteLogs::new(buffer.clone());
    let messages: Vec<_> = logs.records().iter().map(|record| record["msg"].clone()).collect();
    assert_eq!(messages, vec![json!("installed"), json!("Boot: ready"), json!("port 8080")]);

    let error = match init_default(&LoggerConfig::json_info()) {
        Ok(_) => return Err("second init should fail".into()),
        Err(error) => error,
    };
    assert_eq!(error.code.to_string(), "logger:default_already_initialized");

    scoped_log::default_logger().info("still captured");
    let logs = ByteLogs::new(buffer);
    assert!(logs.log_in_logs("msg", &json!("still captured")));
    Ok(())
}
