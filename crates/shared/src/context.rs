//! Request-scoped context handle.
//!
//! A `RequestContext` carries a correlation id and a small map of opaque
//! values keyed by well-known `&'static str` keys.
//!
//! Values propagate to derived contexts by reference: `with_value` copies the
//! map of `Arc`s, never the values behind them. Dropping the last context that
//! references a value drops the value; there is no explicit teardown.

use crate::{ErrorCode, ErrorEnvelope, Result};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque value stored in a context under a well-known key.
pub type ContextValue = Arc<dyn Any + Send + Sync>;

/// A correlation identifier used for logging/telemetry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(Arc<str>);

impl CorrelationId {
    /// Parse a correlation identifier from user input.
    ///
    /// The value is trimmed; empty values are rejected.
    pub fn parse(value: impl AsRef<str>) -> Result<Self> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                "correlationId must be non-empty",
            ));
        }
        Ok(Self(Arc::<str>::from(trimmed)))
    }

    /// Create a new request id, best-effort unique within this process.
    #[must_use]
    pub fn new_request_id() -> Self {
        let n = REQUEST_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(Arc::<str>::from(format!("req_{n}")))
    }

    /// Borrow the identifier as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

static REQUEST_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Request-scoped context passed across boundaries.
#[derive(Clone)]
pub struct RequestContext {
    correlation_id: CorrelationId,
    values: Arc<BTreeMap<&'static str, ContextValue>>,
}

impl RequestContext {
    /// Context with no values attached.
    #[must_use]
    pub fn new(correlation_id: CorrelationId) -> Self {
        Self {
            correlation_id,
            values: Arc::new(BTreeMap::new()),
        }
    }

    /// Convenience constructor: create a context with an auto-generated `req_*` id.
    #[must_use]
    pub fn new_request() -> Self {
        Self::new(CorrelationId::new_request_id())
    }

    /// Return the correlation id.
    #[must_use]
    pub const fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    /// Derive a child context that additionally carries `value` under `key`.
    ///
    /// Existing values are shared with the parent. A value already present
    /// under `key` is shadowed in the child only.
    #[must_use]
    pub fn with_value(&self, key: &'static str, value: ContextValue) -> Self {
        let mut values = (*self.values).clone();
        values.insert(key, value);
        Self {
            correlation_id: self.correlation_id.clone(),
            values: Arc::new(values),
        }
    }

    /// Look up the opaque value stored under `key`.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<&ContextValue> {
        self.values.get(key)
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("RequestContext")
            .field("correlation_id", &self.correlation_id)
            .field("keys", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}
