//! One info entry per served HTTP request.
//!
//! Available both as a tower layer ([`RequestLogLayer`]) and as an axum
//! `from_fn_with_state` function ([`request_log_middleware`]). Either way the
//! response body is wrapped in a [`CountingBody`] and the entry is written
//! once the body has been streamed out (or dropped), so `size` is the number
//! of bytes actually sent. Status, headers and body bytes pass through
//! untouched.

use axum::body::{Body, Bytes, HttpBody};
use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use http_body::{Frame, SizeHint};
use scoped_log_domain::LogFields;
use scoped_log_ports::{LoggerPort, REQUEST_ID_FIELD};
use scoped_log_shared::RequestContext;
use serde_json::Value;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tower::{Layer, Service};
use tower_http::request_id::RequestId;

/// Message of the per-request entry.
pub const HTTP_REQUEST_SERVED: &str = "HTTP Request Served";

/// Header consulted for the correlation id when no context is attached.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Boxed future returned by [`RequestLogService`].
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Request facts captured before the request is handed to the inner service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSummary {
    /// Protocol version, e.g. `HTTP/1.1`.
    pub proto: String,
    /// URI path.
    pub path: String,
    /// Client socket address, empty when unknown.
    pub ip: String,
    /// Correlation id, empty when unknown.
    pub request_id: String,
}

impl RequestSummary {
    /// Capture the loggable parts of `request`.
    ///
    /// The correlation id comes from an attached [`RequestContext`], then a
    /// tower-http [`RequestId`], then the raw `x-request-id` header.
    pub fn from_request<B>(request: &axum::http::Request<B>) -> Self {
        let extensions = request.extensions();
        let ip = extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.to_string())
            .unwrap_or_default();

        let request_id = extensions
            .get::<RequestContext>()
            .map(|ctx| ctx.correlation_id().as_str().to_string())
            .or_else(|| {
                extensions
                    .get::<RequestId>()
                    .and_then(|id| id.header_value().to_str().ok())
                    .map(str::to_string)
            })
            .or_else(|| {
                request
                    .headers()
                    .get(X_REQUEST_ID)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_string)
            })
            .unwrap_or_default();

        Self {
            proto: format!("{:?}", request.version()),
            path: request.uri().path().to_string(),
            ip,
            request_id,
        }
    }

    /// Fields for the served entry.
    #[must_use]
    pub fn fields(&self, status: u16, size: u64, elapsed: Duration) -> LogFields {
        let duration = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        let mut fields = LogFields::new();
        fields.insert("proto".into(), Value::from(self.proto.as_str()));
        fields.insert("path".into(), Value::from(self.path.as_str()));
        fields.insert("duration".into(), Value::from(duration));
        fields.insert("status".into(), Value::from(status));
        fields.insert("size".into(), Value::from(size));
        fields.insert("ip".into(), Value::from(self.ip.as_str()));
        fields.insert(REQUEST_ID_FIELD.into(), Value::from(self.request_id.as_str()));
        fields
    }
}

/// Entry waiting for its response body to finish.
struct PendingEntry {
    logger: Arc<dyn LoggerPort>,
    summary: RequestSummary,
    status: u16,
    started: Instant,
}

impl PendingEntry {
    fn emit(self, size: u64) {
        let fields = self.summary.fields(self.status, size, self.started.elapsed());
        self.logger.info_with_fields(fields, HTTP_REQUEST_SERVED);
    }
}

/// Response body that counts the data bytes it yields and writes the served
/// entry at end of stream, on a body error, or when dropped unfinished.
pub struct CountingBody {
    inner: Body,
    written: u64,
    entry: Option<PendingEntry>,
}

impl CountingBody {
    fn new(inner: Body, entry: PendingEntry) -> Self {
        Self {
            inner,
            written: 0,
            entry: Some(entry),
        }
    }

    /// Data bytes yielded so far.
    pub const fn written(&self) -> u64 {
        self.written
    }

    fn finish(&mut self) {
        if let Some(entry) = self.entry.take() {
            entry.emit(self.written);
        }
    }
}

impl HttpBody for CountingBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);
        match &polled {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    let len = u64::try_from(data.len()).unwrap_or(u64::MAX);
                    this.written = this.written.saturating_add(len);
                }
            },
            Poll::Ready(Some(Err(_)) | None) => this.finish(),
            Poll::Pending => {},
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for CountingBody {
    fn drop(&mut self) {
        self.finish();
    }
}

fn count_served(
    logger: Arc<dyn LoggerPort>,
    summary: RequestSummary,
    response: Response,
    started: Instant,
) -> Response {
    let entry = PendingEntry {
        logger,
        summary,
        status: response.status().as_u16(),
        started,
    };
    response.map(|body| Body::new(CountingBody::new(body, entry)))
}

/// axum middleware writing one entry per request.
///
/// ```ignore
/// Router::new()
///     .route("/", get(handler))
///     .layer(axum::middleware::from_fn_with_state(logger, request_log_middleware));
/// ```
pub async fn request_log_middleware(
    State(logger): State<Arc<dyn LoggerPort>>,
    request: Request,
    next: Next,
) -> Response {
    let summary = RequestSummary::from_request(&request);
    let started = Instant::now();
    let response = next.run(request).await;
    count_served(logger, summary, response, started)
}

/// Tower layer writing one entry per request.
#[derive(Clone)]
pub struct RequestLogLayer {
    logger: Arc<dyn LoggerPort>,
}

impl RequestLogLayer {
    /// Log through `logger`.
    pub fn new(logger: Arc<dyn LoggerPort>) -> Self {
        Self { logger }
    }
}

impl<S> Layer<S> for RequestLogLayer {
    type Service = RequestLogService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLogService {
            inner,
            logger: Arc::clone(&self.logger),
        }
    }
}

/// Service produced by [`RequestLogLayer`].
#[derive(Clone)]
pub struct RequestLogService<S> {
    inner: S,
    logger: Arc<dyn LoggerPort>,
}

impl<S> Service<Request<Body>> for RequestLogService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let summary = RequestSummary::from_request(&request);
        let logger = Arc::clone(&self.logger);
        // The clone may not be ready; keep the driven service and leave the clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let started = Instant::now();

        Box::pin(async move {
            let response = inner.call(request).await?;
            Ok(count_served(logger, summary, response, started))
        })
    }
}
