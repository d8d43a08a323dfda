//! The error envelope every crate converts its failures into.
//!
//! Failures are classified by [`ErrorKind`] and identified by a stable
//! `namespace:code` [`ErrorCode`]. Metadata is free-form diagnostic context;
//! secret-looking entries can be scrubbed before the envelope is logged.

use crate::redaction::{REDACTED, is_secret_key};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::{fmt, io};

/// Diagnostic key/value pairs carried by an envelope.
pub type ErrorMetadata = BTreeMap<String, String>;

/// Who is at fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Caller input or configuration, e.g. a bad config file or a missing scope
    /// under the strict policy.
    Expected,
    /// A host bug, e.g. a foreign value stored under the field stack key.
    Invariant,
    /// The environment failed, e.g. a sink or config file could not be read.
    Unexpected,
}

impl ErrorKind {
    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Expected => "expected",
            Self::Invariant => "invariant",
            Self::Unexpected => "unexpected",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Stable `namespace:code` identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorCode {
    namespace: String,
    code: String,
}

impl ErrorCode {
    /// Code in `namespace`.
    pub fn new(namespace: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            code: code.into(),
        }
    }

    /// `core:invalid_input`.
    pub fn invalid_input() -> Self {
        Self::new("core", "invalid_input")
    }

    /// `core:not_found`.
    pub fn not_found() -> Self {
        Self::new("core", "not_found")
    }

    /// `core:io`.
    pub fn io() -> Self {
        Self::new("core", "io")
    }

    /// `scope:not_established`: no field stack attached to the context.
    pub fn scope_not_established() -> Self {
        Self::new("scope", "not_established")
    }

    /// `scope:wrong_type`: the field stack key holds something else.
    pub fn scope_wrong_type() -> Self {
        Self::new("scope", "wrong_type")
    }

    /// `logger:default_already_initialized`.
    pub fn default_already_initialized() -> Self {
        Self::new("logger", "default_already_initialized")
    }

    /// `scope:policy_conflict`: a different scope policy is already in effect.
    pub fn scope_policy_conflict() -> Self {
        Self::new("scope", "policy_conflict")
    }

    /// Namespace part.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Code part.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.namespace, self.code)
    }
}

/// Structured error shared across crates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Fault classification.
    pub kind: ErrorKind,
    /// Stable code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Diagnostic context.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: ErrorMetadata,
}

impl ErrorEnvelope {
    /// Caller or configuration fault.
    pub fn expected(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Expected, code, message)
    }

    /// Host bug.
    pub fn invariant(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Invariant, code, message)
    }

    /// Environment fault.
    pub fn unexpected(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, code, message)
    }

    fn new(kind: ErrorKind, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            kind,
            code,
            message: message.into(),
            metadata: ErrorMetadata::new(),
        }
    }

    /// Add one metadata entry, replacing any previous value for `key`.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns true when the envelope carries `code`.
    #[must_use]
    pub fn has_code(&self, code: &ErrorCode) -> bool {
        self.code == *code
    }

    /// Replace every secret-looking metadata value with `[REDACTED]`.
    #[must_use]
    pub fn redacted(mut self) -> Self {
        for (key, value) in &mut self.metadata {
            if is_secret_key(key) {
                REDACTED.clone_into(value);
            }
        }
        self
    }
}

impl fmt::Display for ErrorEnvelope {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{} {}: {}", self.kind, self.code, self.message)
    }
}

impl std::error::Error for ErrorEnvelope {}

impl From<io::Error> for ErrorEnvelope {
    fn from(error: io::Error) -> Self {
        let code = if error.kind() == io::ErrorKind::NotFound {
            ErrorCode::not_found()
        } else {
            ErrorCode::io()
        };
        Self::unexpected(code, error.to_string())
    }
}
