//! The scope policy from config governs the free scope functions.

use scoped_log::{
    Field, LoggerEnv, LoggerPort, RequestContext, ScopeBinding, ScopeError, ScopePolicy,
    current_fields, enter_scope, init_default_with_sink, load_logger_config_from_sources,
    pop_scope, process_scope_policy, push_scope,
};
use scoped_log_testkit::{ByteLogs, SharedBuffer};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

#[test]
fn lenient_config_lets_bare_contexts_push_and_pop() -> Result<(), Box<dyn std::error::Error>> {
    let env = LoggerEnv::from_map(&BTreeMap::from([
        ("SCOPED_LOG_FORMAT".to_string(), "json".to_string()),
        ("SCOPED_LOG_SCOPE_POLICY".to_string(), "lenient".to_string()),
    ]))?;
    let config = load_logger_config_from_sources(None, &env)?;
    assert_eq!(config.scope_policy, ScopePolicy::Lenient);

    let buffer = SharedBuffer::new();
    let logger = init_default_with_sink(&config, Arc::new(buffer.clone()))?;
    assert_eq!(process_scope_policy(), ScopePolicy::Lenient);
    assert_eq!(ScopeBinding::default().policy(), ScopePolicy::Lenient);

    let bare = RequestContext::new_request();
    push_scope(&bare, [Field::new("ignored", 1)])?;
    pop_scope(&bare)?;
    let guard = enter_scope(&bare, [Field::new("ignored", 2)])?;
    assert!(!guard.is_active());
    drop(guard);
    assert!(current_fields(&bare, Vec::<Field>::new())?.is_empty());

    logger.with_context(&bare)?.info("bare context");
    let logs = ByteLogs::new(buffer);
    assert!(logs.log_in_logs("msg", &json!("bare context")));

    let strict = ScopeBinding::new(ScopePolicy::Strict);
    assert_eq!(strict.push(&bare, [Field::new("a", 1)]), Err(ScopeError::NotEstablished));
    Ok(())
}
