//! Variable scrubbing for GraphQL request logging.

use scoped_log_shared::redact_object;
use serde_json::{Map, Value};

/// GraphQL variables as received.
pub type Variables = Map<String, Value>;

/// Decides what, if anything, of a request's variables reaches the log.
pub trait VariablesScrubber: Send + Sync {
    /// Return the loggable variables, or `None` to log `null`.
    fn scrub(&self, variables: &Variables) -> Option<Variables>;
}

/// Logs no variables at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopVariablesScrubber;

impl VariablesScrubber for NoopVariablesScrubber {
    fn scrub(&self, _variables: &Variables) -> Option<Variables> {
        None
    }
}

/// Logs variables with secret-looking keys replaced by `[REDACTED]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedactingVariablesScrubber;

impl VariablesScrubber for RedactingVariablesScrubber {
    fn scrub(&self, variables: &Variables) -> Option<Variables> {
        let mut copy = variables.clone();
        redact_object(&mut copy);
        Some(copy)
    }
}
