//! # scoped-log-domain
//!
//! Field model and scope binding for contextual logging.
//!
//! - **Fields** - `Field`, `FieldBatch`, `LogFields`
//! - **Stack** - `FieldStack`, the LIFO of batches behind one logical flow
//! - **Levels** - `LogLevel`, `LogFormat`
//! - **Scope** - attach a stack to a `RequestContext` and push/pop through it
//!
//! ## Dependency Rules
//!
//! - Depends only on `shared` crate
//! - No I/O

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub use scoped_log_shared::shared_crate_version;

pub mod field;
pub mod level;
pub mod scope;
pub mod stack;

pub use field::{Field, FieldBatch, FieldValue, LogFields, fields_from_map, merge_fields};
pub use level::{LogFormat, LogLevel, ParseNameError};
pub use scope::{
    CONTEXT_KEY_LOG_FIELDS, ScopeBinding, ScopeError, ScopeGuard, ScopePolicy, SharedFieldStack,
    current_fields, enter_scope, establish_scope, install_scope_policy, lookup as lookup_scope,
    pop_scope, process_scope_policy, push_scope,
};
pub use stack::FieldStack;

/// Returns the domain crate version.
#[must_use]
pub const fn domain_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
