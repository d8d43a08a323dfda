//! Attach a scoped `RequestContext` to every inbound request.

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use scoped_log_domain::{Field, establish_scope};
use scoped_log_ports::REQUEST_ID_FIELD;
use scoped_log_shared::{CorrelationId, RequestContext};

use crate::http::X_REQUEST_ID;

/// Build the context for `request`: correlation id from `x-request-id` or a
/// fresh UUID, with a field scope already holding `requestID`.
pub fn context_for_request(request: &Request) -> RequestContext {
    let correlation_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| CorrelationId::parse(value).ok())
        .or_else(|| CorrelationId::parse(uuid::Uuid::new_v4().to_string()).ok())
        .unwrap_or_else(CorrelationId::new_request_id);

    let base = RequestContext::new(correlation_id.clone());
    let field = Field::new(REQUEST_ID_FIELD, correlation_id.as_str());
    establish_scope(&base, [field]).unwrap_or(base)
}

/// axum middleware inserting a [`RequestContext`] extension and echoing the
/// correlation id in the `x-request-id` response header.
///
/// Handlers read it with `Extension<RequestContext>`; loggers pick up its
/// scoped fields through `LoggerPort::with_context`.
pub async fn attach_request_context(mut request: Request, next: Next) -> Response {
    let ctx = context_for_request(&request);
    let header = HeaderValue::from_str(ctx.correlation_id().as_str()).ok();
    request.extensions_mut().insert(ctx);

    let mut response = next.run(request).await;
    if let Some(value) = header {
        response.headers_mut().entry(X_REQUEST_ID).or_insert(value);
    }
    response
}
