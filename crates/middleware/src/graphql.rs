//! One info entry per executed GraphQL operation.
//!
//! The entry carries a nested `graphql` group:
//!
//! ```json
//! {"graphql":{"req":{"query":"…","variables":null},"res":{"errors":"input: boom\n"},"duration":1234}}
//! ```

use crate::scrubber::{NoopVariablesScrubber, Variables, VariablesScrubber};
use scoped_log_domain::LogFields;
use scoped_log_ports::LoggerPort;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};
use std::fmt::{self, Write as _};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

/// Message of the per-operation entry.
pub const GRAPHQL_REQUEST_SERVED: &str = "GraphQL Request Served";

/// Operation name whose executions are never logged.
pub const INTROSPECTION_OPERATION: &str = "IntrospectionQuery";

/// The executed operation as received from the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlOperation {
    /// Operation name, when the client sent one.
    #[serde(default)]
    pub operation_name: Option<String>,
    /// Raw query text.
    pub query: String,
    /// Request variables; `null` reads as empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub variables: Variables,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Variables, D::Error> {
    Ok(Option::<Variables>::deserialize(deserializer)?.unwrap_or_default())
}

impl GraphQlOperation {
    /// Operation with a query and no variables.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// The client's `operationName`, else the name of the first operation
    /// defined in the query text.
    #[must_use]
    pub fn resolved_operation_name(&self) -> Option<&str> {
        self.operation_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or_else(|| operation_name_in(&self.query))
    }

    /// Returns true for the schema introspection operation.
    #[must_use]
    pub fn is_introspection(&self) -> bool {
        self.resolved_operation_name() == Some(INTROSPECTION_OPERATION)
    }
}

/// Name of the first named operation at the top level of `query`.
///
/// Comments, strings and anything nested in braces or parentheses are
/// skipped. Anonymous operations yield `None`.
fn operation_name_in(query: &str) -> Option<&str> {
    let mut chars = query.char_indices().peekable();
    let mut depth = 0_usize;
    let mut after_keyword = false;

    while let Some((start, ch)) = chars.next() {
        match ch {
            '#' => while chars.next_if(|&(_, next)| next != '\n').is_some() {},
            '"' => {
                let mut escaped = false;
                for (_, next) in chars.by_ref() {
                    match (escaped, next) {
                        (true, _) => escaped = false,
                        (false, '\\') => escaped = true,
                        (false, '"') => break,
                        (false, _) => {},
                    }
                }
            },
            '{' | '(' | '[' => {
                depth += 1;
                after_keyword = false;
            },
            '}' | ')' | ']' => depth = depth.saturating_sub(1),
            _ if ch == '_' || ch.is_ascii_alphabetic() => {
                let mut end = start + 1;
                while let Some((index, _)) =
                    chars.next_if(|&(_, next)| next == '_' || next.is_ascii_alphanumeric())
                {
                    end = index + 1;
                }
                if depth > 0 {
                    continue;
                }
                let word = query.get(start..end)?;
                if after_keyword {
                    return Some(word);
                }
                after_keyword = matches!(word, "query" | "mutation" | "subscription");
            },
            _ => {},
        }
    }
    None
}

/// Source position of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphQlLocation {
    /// 1-based line.
    pub line: u32,
    /// 1-based column.
    pub column: u32,
}

/// One GraphQL error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphQlError {
    /// Error message.
    pub message: String,
    /// Response path segments: field names and list indices.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<Value>,
    /// Source locations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<GraphQlLocation>,
}

impl GraphQlError {
    /// Error with only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    fn path_string(&self) -> String {
        let mut rendered = String::new();
        for segment in &self.path {
            match segment {
                Value::Number(index) => {
                    let _ = write!(rendered, "[{index}]");
                },
                Value::String(name) => {
                    if !rendered.is_empty() {
                        rendered.push('.');
                    }
                    rendered.push_str(name);
                },
                _ => {},
            }
        }
        rendered
    }
}

/// Rendered as `input[:line]: [path ]message`.
impl fmt::Display for GraphQlError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("input")?;
        if let Some(location) = self.locations.first() {
            write!(formatter, ":{}", location.line)?;
        }
        formatter.write_str(": ")?;
        let path = self.path_string();
        if !path.is_empty() {
            write!(formatter, "{path} ")?;
        }
        formatter.write_str(&self.message)
    }
}

/// Execution result handed back to the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphQlResponse {
    /// Result data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Errors raised during execution.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQlError>,
}

/// Every error rendered on its own line, each terminated by `\n`.
#[must_use]
pub fn render_errors(errors: &[GraphQlError]) -> String {
    errors.iter().fold(String::new(), |mut rendered, error| {
        let _ = writeln!(rendered, "{error}");
        rendered
    })
}

/// Wraps GraphQL execution and logs each operation.
#[derive(Clone)]
pub struct GraphQlResponseLogger {
    logger: Arc<dyn LoggerPort>,
    scrubber: Arc<dyn VariablesScrubber>,
}

impl GraphQlResponseLogger {
    /// Log through `logger`; variables pass through `scrubber`, which
    /// defaults to logging none.
    pub fn new(logger: Arc<dyn LoggerPort>, scrubber: Option<Arc<dyn VariablesScrubber>>) -> Self {
        Self {
            logger,
            scrubber: scrubber.unwrap_or_else(|| Arc::new(NoopVariablesScrubber)),
        }
    }

    /// Run `handler` and log the operation it served.
    ///
    /// The response is returned unchanged. Introspection operations are not
    /// logged.
    pub async fn log_response<F, Fut>(&self, operation: &GraphQlOperation, handler: F) -> GraphQlResponse
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = GraphQlResponse>,
    {
        let started = Instant::now();
        let response = handler().await;
        if !operation.is_introspection() {
            self.log_served(operation, &response, started);
        }
        response
    }

    fn log_served(&self, operation: &GraphQlOperation, response: &GraphQlResponse, started: Instant) {
        let duration = u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX);
        let variables = self
            .scrubber
            .scrub(&operation.variables)
            .map_or(Value::Null, Value::Object);

        let mut fields = LogFields::new();
        fields.insert(
            "graphql".into(),
            json!({
                "req": {
                    "query": operation.query,
                    "variables": variables,
                },
                "res": {
                    "errors": render_errors(&response.errors),
                },
                "duration": duration,
            }),
        );
        self.logger.info_with_fields(fields, GRAPHQL_REQUEST_SERVED);
    }
}
