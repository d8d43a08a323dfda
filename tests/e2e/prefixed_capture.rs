//! Captured JSON output from a root logger and prefixed component loggers.

use scoped_log::{LogFormat, LogLevel, LoggerPort, PrefixedLogger, StructuredLogger};
use scoped_log_testkit::{ByteLogs, SharedBuffer};
use serde_json::json;
use std::sync::Arc;

fn capture() -> (Arc<dyn LoggerPort>, SharedBuffer) {
    let buffer = SharedBuffer::new();
    let logger = StructuredLogger::new(Arc::new(buffer.clone()))
        .with_format(LogFormat::Json)
        .with_min_level(LogLevel::Info);
    (Arc::new(logger), buffer)
}

#[test]
fn three_messages_through_two_prefixes() {
    let (logger, buffer) = capture();
    let test_logger = PrefixedLogger::new("Test", Some(Arc::clone(&logger)));
    let foo_logger = PrefixedLogger::new("Foo", Some(Arc::clone(&logger)));

    logger.info("msg");
    test_logger.info("info log");
    foo_logger.warn("a warning log");
    foo_logger.debug("below threshold");

    let logs = ByteLogs::new(buffer);
    let messages: Vec<_> = logs.records().iter().map(|record| record["msg"].clone()).collect();
    assert_eq!(
        messages,
        vec![json!("msg"), json!("Test: info log"), json!("Foo: a warning log")]
    );
    assert!(logs.log_in_logs("level", &json!("warn")));
}

#[test]
fn partial_line_is_excluded_until_completed() {
    let (logger, buffer) = capture();
    logger.info("first");

    let mut logs = ByteLogs::new(buffer.clone());
    assert_eq!(logs.records().len(), 1);

    buffer.append(br#"{"level":"info","msg":"sec"#);
    logs.parse(None);
    assert_eq!(logs.records().len(), 1);
    assert!(!logs.log_in_logs("msg", &json!("second")));

    buffer.append(b"ond\"}\n");
    logs.parse(None);
    assert_eq!(logs.records().len(), 2);
    assert!(logs.log_in_logs("msg", &json!("second")));
}

#[test]
fn end_message_predicate_waits_for_a_sentinel() {
    let (logger, buffer) = capture();
    let consumer = PrefixedLogger::new("task-consumer", Some(Arc::clone(&logger)));
    let mut logs = ByteLogs::new(buffer.clone());

    consumer.info("received message");
    logs.parse(None);
    assert!(!logs.check_for_log_end_message(&[]));

    consumer.error("failed to process message");
    logs.parse(None);
    assert!(logs.check_for_log_end_message(&[]));
    assert!(!logs.check_for_log_end_message(&["task-consumer: shutdown"]));

    consumer.info("shutdown");
    logs.parse(None);
    assert!(logs.check_for_log_end_message(&["task-consumer: shutdown"]));
    assert!(logs.check_for_log_end_message(&[]));
}

#[test]
fn wrapped_errors_keep_their_source() {
    let (logger, _buffer) = capture();
    let store = PrefixedLogger::new("store", Some(logger));
    let io_error = std::io::Error::other("disk full");

    let wrapped = store.prefix_error(io_error, "flush failed");
    assert_eq!(wrapped.to_string(), "store: flush failed: disk full");
    assert!(std::error::Error::source(&wrapped).is_some());

    let wrapped = store.wrap_error("timeout");
    assert_eq!(wrapped.to_string(), "store: timeout");
}
