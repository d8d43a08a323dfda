//! # scoped-log-middleware
//!
//! Request-logging middleware built on the logger port:
//!
//! - **HTTP** - axum/tower middleware writing `HTTP Request Served` per request
//! - **Request context** - attaches a scoped `RequestContext` carrying `requestID`
//! - **GraphQL** - wraps operation execution and writes `GraphQL Request Served`
//! - **Scrubbers** - control which GraphQL variables reach the log

pub mod graphql;
pub mod http;
pub mod request_context;
pub mod scrubber;

pub use graphql::{
    GRAPHQL_REQUEST_SERVED, GraphQlError, GraphQlLocation, GraphQlOperation, GraphQlResponse,
    GraphQlResponseLogger, INTROSPECTION_OPERATION, render_errors,
};
pub use http::{
    CountingBody, HTTP_REQUEST_SERVED, RequestLogLayer, RequestLogService, RequestSummary,
    X_REQUEST_ID, request_log_middleware,
};
pub use request_context::{attach_request_context, context_for_request};
pub use scrubber::{
    NoopVariablesScrubber, RedactingVariablesScrubber, Variables, VariablesScrubber,
};

/// Returns the middleware crate version.
#[must_use]
pub const fn middleware_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
