//! Scoped fields flowing from a request context into emitted records.

use scoped_log::{
    CorrelationId, Field, LogFormat, LoggerPort, RequestContext, ScopeBinding, ScopeError,
    ScopePolicy, StructuredLogger, current_fields, enter_scope, establish_scope,
};
use scoped_log_testkit::{ByteLogs, SharedBuffer};
use serde_json::json;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

fn capture() -> (Arc<dyn LoggerPort>, SharedBuffer) {
    let buffer = SharedBuffer::new();
    let logger = StructuredLogger::new(Arc::new(buffer.clone())).with_format(LogFormat::Json);
    (Arc::new(logger), buffer)
}

fn request(id: &str) -> Result<RequestContext, Box<dyn std::error::Error>> {
    Ok(RequestContext::new(CorrelationId::parse(id)?))
}

fn load_job(ctx: &RequestContext, logger: &dyn LoggerPort, fail: bool) -> Result<(), Box<dyn std::error::Error>> {
    let _job = enter_scope(ctx, [Field::new("job", 7)])?;
    logger.with_context(ctx)?.info("loading");
    if fail {
        return Err("job missing".into());
    }
    logger.with_context(ctx)?.info("loaded");
    Ok(())
}

#[test]
fn nested_scopes_appear_and_disappear_in_records() -> Result<(), Box<dyn std::error::Error>> {
    let (logger, buffer) = capture();
    let ctx = establish_scope(&request("req_1")?, [Field::new("tenant", "acme")])?;

    load_job(&ctx, logger.as_ref(), false)?;
    assert!(load_job(&ctx, logger.as_ref(), true).is_err());
    logger.with_context(&ctx)?.info("after");

    let logs = ByteLogs::new(buffer);
    let records = logs.records();
    assert_eq!(records.len(), 4);
    for record in &records[..3] {
        assert_eq!(record["job"], json!(7));
        assert_eq!(record["tenant"], json!("acme"));
    }
    assert_eq!(records[3]["msg"], json!("after"));
    assert!(records[3].get("job").is_none());
    Ok(())
}

#[test]
fn panic_helper_unwinds_through_scope_guards() -> Result<(), Box<dyn std::error::Error>> {
    let (logger, buffer) = capture();
    let ctx = establish_scope(&request("req_2")?, [Field::new("stage", "outer")])?;

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        if let Ok(_guard) = enter_scope(&ctx, [Field::new("stage", "inner")]) {
            if let Ok(scoped) = logger.with_context(&ctx) {
                scoped.panic("invariant broken");
            }
        }
    }));
    assert!(outcome.is_err());

    let fields = current_fields(&ctx, Vec::<Field>::new())?;
    assert_eq!(fields.get("stage"), Some(&json!("outer")));
    let logs = ByteLogs::new(buffer);
    assert!(logs.log_in_logs("level", &json!("panic")));
    assert!(logs.log_in_logs("stage", &json!("inner")));
    Ok(())
}

#[test]
fn contexts_from_one_base_share_a_stack() -> Result<(), Box<dyn std::error::Error>> {
    let base = request("req_3")?;
    let first = establish_scope(&base, [Field::new("a", 1)])?;
    let second = establish_scope(&first, [Field::new("b", 2)])?;

    let fields = current_fields(&first, [Field::new("a", 99)])?;
    assert_eq!(fields.get("a"), Some(&json!(99)));
    assert_eq!(fields.get("b"), Some(&json!(2)));
    assert_eq!(current_fields(&second, Vec::<Field>::new())?.get("a"), Some(&json!(1)));
    Ok(())
}

#[test]
fn missing_scope_follows_the_configured_policy() -> Result<(), Box<dyn std::error::Error>> {
    let bare = request("req_4")?;
    let strict = ScopeBinding::new(ScopePolicy::Strict);
    let lenient = ScopeBinding::new(ScopePolicy::Lenient);

    assert_eq!(strict.push(&bare, [Field::new("a", 1)]), Err(ScopeError::NotEstablished));
    assert_eq!(lenient.push(&bare, [Field::new("a", 1)]), Ok(()));
    assert!(current_fields(&bare, Vec::<Field>::new())?.is_empty());
    Ok(())
}

#[tokio::test]
async fn concurrent_requests_keep_their_own_fields() -> Result<(), Box<dyn std::error::Error>> {
    let (logger, buffer) = capture();
    let mut tasks = Vec::new();
    for index in 0..8 {
        let logger = Arc::clone(&logger);
        let ctx = establish_scope(&request(&format!("req_{index}"))?, [Field::new("worker", index)])?;
        tasks.push(tokio::spawn(async move {
            let _step = enter_scope(&ctx, [Field::new("step", "run")])?;
            tokio::task::yield_now().await;
            logger.for_request(&ctx).info("tick");
            logger.with_context(&ctx)?.info("scoped tick");
            Ok::<_, ScopeError>(())
        }));
    }
    for task in tasks {
        task.await??;
    }

    let logs = ByteLogs::new(buffer);
    for index in 0..8 {
        let scoped = logs
            .records()
            .iter()
            .filter(|record| {
                record.get("msg") == Some(&json!("scoped tick"))
                    && record.get("worker") == Some(&json!(index))
            })
            .count();
        assert_eq!(scoped, 1);
        assert!(logs.log_in_logs("requestID", &json!(format!("req_{index}"))));
    }
    Ok(())
}
