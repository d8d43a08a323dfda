//! Binding between a `RequestContext` and its field stack.
//!
//! A context carries at most one `FieldStack`, stored under
//! [`CONTEXT_KEY_LOG_FIELDS`]. Every context derived from it (and every
//! clone) shares that same stack, so fields pushed deep in a call chain are
//! visible to the whole logical flow until they are popped.
//!
//! The stack is meant for a single logical flow: one request and its
//! synchronous sub-calls. The mutex around it only keeps memory safe when a
//! context crosses threads; two flows pushing and popping the same stack
//! concurrently will interleave their scopes, and avoiding that is the
//! caller's job.
//!
//! Prefer [`ScopeBinding::enter`] over bare push/pop: the returned guard pops
//! on every exit path, including `?` and unwinding.

use crate::field::{Field, FieldBatch, LogFields, merge_fields};
use crate::stack::FieldStack;
use scoped_log_shared::{ErrorCode, ErrorEnvelope, RequestContext};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

/// Well-known context key for the logging field stack.
pub const CONTEXT_KEY_LOG_FIELDS: &str = "scoped-log/fields";

/// Field stack as stored in a context.
pub type SharedFieldStack = Arc<Mutex<FieldStack>>;

static PROCESS_SCOPE_POLICY: OnceLock<ScopePolicy> = OnceLock::new();

/// Failures when reaching the field stack through a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
    /// No stack is attached to the context.
    #[error("logging fields have not been added to context yet; call establish_scope")]
    NotEstablished,
    /// The well-known key holds a value that is not a field stack.
    #[error("logging fields under `{key}` are not a field stack")]
    WrongType {
        /// Key that held the foreign value.
        key: &'static str,
    },
}

impl From<ScopeError> for ErrorEnvelope {
    fn from(error: ScopeError) -> Self {
        match error {
            ScopeError::NotEstablished => {
                Self::expected(ErrorCode::scope_not_established(), error.to_string())
            },
            ScopeError::WrongType { key } => {
                Self::invariant(ErrorCode::scope_wrong_type(), error.to_string())
                    .with_metadata("key", key)
            },
        }
    }
}

/// What push/pop do when the context carries no stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopePolicy {
    /// Return `ScopeError::NotEstablished`.
    Strict,
    /// Do nothing.
    Lenient,
}

impl ScopePolicy {
    /// `Strict` in debug builds, `Lenient` in release builds.
    #[must_use]
    pub const fn for_build() -> Self {
        if cfg!(debug_assertions) {
            Self::Strict
        } else {
            Self::Lenient
        }
    }
}

impl Default for ScopePolicy {
    fn default() -> Self {
        Self::for_build()
    }
}

/// Fix the policy used by the free scope functions for the rest of the
/// process.
///
/// Installing the policy already in place is a no-op. A different policy is
/// rejected and the one in effect is returned as the error.
pub fn install_scope_policy(policy: ScopePolicy) -> Result<(), ScopePolicy> {
    let current = *PROCESS_SCOPE_POLICY.get_or_init(|| policy);
    if current == policy {
        Ok(())
    } else {
        Err(current)
    }
}

/// Policy used by the free scope functions: the installed one, or
/// [`ScopePolicy::for_build`] when none was installed.
#[must_use]
pub fn process_scope_policy() -> ScopePolicy {
    PROCESS_SCOPE_POLICY
        .get()
        .copied()
        .unwrap_or_else(ScopePolicy::for_build)
}

/// Scope operations applied under one missing-stack policy.
///
/// `Default` follows [`process_scope_policy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeBinding {
    policy: ScopePolicy,
}

impl Default for ScopeBinding {
    fn default() -> Self {
        Self::process()
    }
}

impl ScopeBinding {
    /// Create a binding with an explicit policy.
    #[must_use]
    pub const fn new(policy: ScopePolicy) -> Self {
        Self { policy }
    }

    /// Binding under the process-wide policy.
    #[must_use]
    pub fn process() -> Self {
        Self::new(process_scope_policy())
    }

    /// Policy in effect.
    #[must_use]
    pub const fn policy(self) -> ScopePolicy {
        self.policy
    }

    /// Push `fields` onto the stack already carried by `parent`, or attach a
    /// new stack holding `fields` as its first batch.
    ///
    /// When a stack exists the returned context shares it with `parent`.
    pub fn establish(
        self,
        parent: &RequestContext,
        fields: impl Into<FieldBatch>,
    ) -> Result<RequestContext, ScopeError> {
        if let Some(stack) = lookup(parent)? {
            lock(&stack).push(fields);
            return Ok(parent.clone());
        }

        let mut stack = FieldStack::new();
        stack.push(fields);
        let shared: SharedFieldStack = Arc::new(Mutex::new(stack));
        Ok(parent.with_value(CONTEXT_KEY_LOG_FIELDS, shared))
    }

    /// Establish a scope and return a guard that pops the pushed batch on drop.
    pub fn establish_guarded(
        self,
        parent: &RequestContext,
        fields: impl Into<FieldBatch>,
    ) -> Result<(RequestContext, ScopeGuard), ScopeError> {
        let ctx = self.establish(parent, fields)?;
        let stack = lookup(&ctx)?;
        Ok((ctx, ScopeGuard { stack }))
    }

    /// Push a batch onto the context's stack.
    pub fn push(self, ctx: &RequestContext, fields: impl Into<FieldBatch>) -> Result<(), ScopeError> {
        match self.require(ctx)? {
            Some(stack) => {
                lock(&stack).push(fields);
                Ok(())
            },
            None => Ok(()),
        }
    }

    /// Pop the latest batch from the context's stack.
    pub fn pop(self, ctx: &RequestContext) -> Result<(), ScopeError> {
        if let Some(stack) = self.require(ctx)? {
            lock(&stack).pop();
        }
        Ok(())
    }

    /// Push a batch and return a guard that pops it when dropped.
    pub fn enter(
        self,
        ctx: &RequestContext,
        fields: impl Into<FieldBatch>,
    ) -> Result<ScopeGuard, ScopeError> {
        let stack = self.require(ctx)?;
        if let Some(stack) = &stack {
            lock(stack).push(fields);
        }
        Ok(ScopeGuard { stack })
    }

    /// Flatten the context's stack and overlay `extra`.
    ///
    /// A context without a stack yields just `extra` under either policy.
    /// The stack itself is never modified.
    pub fn current_fields<I>(self, ctx: &RequestContext, extra: I) -> Result<LogFields, ScopeError>
    where
        I: IntoIterator<Item = Field>,
    {
        let mut fields = match lookup(ctx)? {
            Some(stack) => lock(&stack).all_fields(),
            None => LogFields::new(),
        };
        merge_fields(&mut fields, extra);
        Ok(fields)
    }

    fn require(self, ctx: &RequestContext) -> Result<Option<SharedFieldStack>, ScopeError> {
        match (lookup(ctx)?, self.policy) {
            (Some(stack), _) => Ok(Some(stack)),
            (None, ScopePolicy::Strict) => Err(ScopeError::NotEstablished),
            (None, ScopePolicy::Lenient) => Ok(None),
        }
    }
}

/// Pops one batch from the stack it was created for when dropped.
#[must_use = "dropping the guard immediately pops the scope"]
#[derive(Debug)]
pub struct ScopeGuard {
    stack: Option<SharedFieldStack>,
}

impl ScopeGuard {
    /// Returns true when the guard will pop a batch on drop.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.stack.is_some()
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        if let Some(stack) = self.stack.take() {
            lock(&stack).pop();
        }
    }
}

/// Look up the field stack attached to `ctx`.
///
/// `Ok(None)` means no stack is attached; a foreign value under the key is
/// reported as `ScopeError::WrongType`.
pub fn lookup(ctx: &RequestContext) -> Result<Option<SharedFieldStack>, ScopeError> {
    let Some(value) = ctx.value(CONTEXT_KEY_LOG_FIELDS) else {
        return Ok(None);
    };
    Arc::clone(value)
        .downcast::<Mutex<FieldStack>>()
        .map(Some)
        .map_err(|_| ScopeError::WrongType {
            key: CONTEXT_KEY_LOG_FIELDS,
        })
}

/// [`ScopeBinding::establish`] under the process-wide policy.
pub fn establish_scope(
    parent: &RequestContext,
    fields: impl Into<FieldBatch>,
) -> Result<RequestContext, ScopeError> {
    ScopeBinding::process().establish(parent, fields)
}

/// [`ScopeBinding::push`] under the process-wide policy.
pub fn push_scope(ctx: &RequestContext, fields: impl Into<FieldBatch>) -> Result<(), ScopeError> {
    ScopeBinding::process().push(ctx, fields)
}

/// [`ScopeBinding::pop`] under the process-wide policy.
pub fn pop_scope(ctx: &RequestContext) -> Result<(), ScopeError> {
    ScopeBinding::process().pop(ctx)
}

/// [`ScopeBinding::enter`] under the process-wide policy.
pub fn enter_scope(
    ctx: &RequestContext,
    fields: impl Into<FieldBatch>,
) -> Result<ScopeGuard, ScopeError> {
    ScopeBinding::process().enter(ctx, fields)
}

/// [`ScopeBinding::current_fields`]; policy does not affect reads.
pub fn current_fields<I>(ctx: &RequestContext, extra: I) -> Result<LogFields, ScopeError>
where
    I: IntoIterator<Item = Field>,
{
    ScopeBinding::process().current_fields(ctx, extra)
}

fn lock(stack: &Mutex<FieldStack>) -> MutexGuard<'_, FieldStack> {
    stack.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const STRICT: ScopeBinding = ScopeBinding::new(ScopePolicy::Strict);
    const LENIENT: ScopeBinding = ScopeBinding::new(ScopePolicy::Lenient);

    fn none() -> [Field; 0] {
        []
    }

    #[test]
    fn establish_attaches_a_new_stack() -> Result<(), ScopeError> {
        let base = RequestContext::new_request();
        let ctx = STRICT.establish(&base, [Field::new("a", 1)])?;

        assert!(lookup(&base)?.is_none());
        assert_eq!(STRICT.current_fields(&ctx, none())?.get("a"), Some(&json!(1)));
        Ok(())
    }

    #[test]
    fn establish_twice_shares_one_stack() -> Result<(), ScopeError> {
        let base = STRICT.establish(&RequestContext::new_request(), [Field::new("a", 1)])?;
        let first = STRICT.establish(&base, [Field::new("b", 2)])?;
        let second = STRICT.establish(&base, [Field::new("c", 3)])?;

        let (Some(left), Some(right)) = (lookup(&first)?, lookup(&second)?) else {
            return Err(ScopeError::NotEstablished);
        };
        assert!(Arc::ptr_eq(&left, &right));
        assert_eq!(lock(&left).depth(), 3);

        let fields = STRICT.current_fields(&base, none())?;
        assert_eq!(fields.len(), 3);
        Ok(())
    }

    #[test]
    fn current_fields_overlay_does_not_mutate_stack() -> Result<(), ScopeError> {
        let ctx = STRICT.establish(&RequestContext::new_request(), [Field::new("a", 1)])?;

        let overlaid = STRICT.current_fields(&ctx, [Field::new("a", 99)])?;
        assert_eq!(overlaid.get("a"), Some(&json!(99)));

        let plain = STRICT.current_fields(&ctx, none())?;
        assert_eq!(plain.get("a"), Some(&json!(1)));
        Ok(())
    }

    #[test]
    fn missing_stack_reads_as_empty_under_both_policies() -> Result<(), ScopeError> {
        let ctx = RequestContext::new_request();
        assert!(STRICT.current_fields(&ctx, none())?.is_empty());
        let extra = LENIENT.current_fields(&ctx, [Field::new("x", true)])?;
        assert_eq!(extra.get("x"), Some(&json!(true)));
        Ok(())
    }

    #[test]
    fn strict_policy_rejects_push_and_pop_without_stack() {
        let ctx = RequestContext::new_request();
        assert_eq!(
            STRICT.push(&ctx, [Field::new("a", 1)]),
            Err(ScopeError::NotEstablished)
        );
        assert_eq!(STRICT.pop(&ctx), Err(ScopeError::NotEstablished));
        assert!(matches!(
            STRICT.enter(&ctx, none()),
            Err(ScopeError::NotEstablished)
        ));
    }

    #[test]
    fn lenient_policy_ignores_missing_stack() -> Result<(), ScopeError> {
        let ctx = RequestContext::new_request();
        LENIENT.push(&ctx, [Field::new("a", 1)])?;
        LENIENT.pop(&ctx)?;
        let guard = LENIENT.enter(&ctx, none())?;
        assert!(!guard.is_active());
        assert!(lookup(&ctx)?.is_none());
        Ok(())
    }

    #[test]
    fn foreign_value_is_reported_as_wrong_type() {
        let ctx = RequestContext::new_request().with_value(CONTEXT_KEY_LOG_FIELDS, Arc::new(42_u32));
        let expected = ScopeError::WrongType {
            key: CONTEXT_KEY_LOG_FIELDS,
        };

        assert_eq!(lookup(&ctx).err(), Some(expected));
        assert_eq!(LENIENT.push(&ctx, none()), Err(expected));
        assert_eq!(STRICT.current_fields(&ctx, none()).err(), Some(expected));
        assert_eq!(STRICT.establish(&ctx, none()).err(), Some(expected));
    }

    #[test]
    fn guard_pops_on_early_return() -> Result<(), ScopeError> {
        fn attempt(ctx: &RequestContext) -> Result<(), ScopeError> {
            let _guard = STRICT.enter(ctx, [Field::new("attempt", 2)])?;
            Err(ScopeError::NotEstablished)
        }

        let ctx = STRICT.establish(&RequestContext::new_request(), [Field::new("op", "sync")])?;
        assert!(attempt(&ctx).is_err());

        let fields = STRICT.current_fields(&ctx, none())?;
        assert!(!fields.contains_key("attempt"));
        assert_eq!(fields.get("op"), Some(&json!("sync")));
        Ok(())
    }

    #[test]
    fn guard_pops_during_unwind() -> Result<(), ScopeError> {
        let ctx = STRICT.establish(&RequestContext::new_request(), [Field::new("op", "x")])?;
        let inner = ctx.clone();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = STRICT.enter(&inner, [Field::new("doomed", true)]);
            panic!("boom");
        }));
        assert!(outcome.is_err());
        assert!(!STRICT.current_fields(&ctx, none())?.contains_key("doomed"));
        Ok(())
    }

    #[test]
    fn establish_guarded_pops_its_own_batch() -> Result<(), ScopeError> {
        let base = STRICT.establish(&RequestContext::new_request(), [Field::new("a", 1)])?;
        {
            let (ctx, _guard) = STRICT.establish_guarded(&base, [Field::new("b", 2)])?;
            assert!(STRICT.current_fields(&ctx, none())?.contains_key("b"));
        }
        let fields = STRICT.current_fields(&base, none())?;
        assert!(!fields.contains_key("b"));
        assert!(fields.contains_key("a"));
        Ok(())
    }

    #[test]
    fn process_policy_is_fixed_once_installed() {
        let build = ScopePolicy::for_build();
        let other = match build {
            ScopePolicy::Strict => ScopePolicy::Lenient,
            ScopePolicy::Lenient => ScopePolicy::Strict,
        };

        assert_eq!(install_scope_policy(build), Ok(()));
        assert_eq!(install_scope_policy(build), Ok(()));
        assert_eq!(install_scope_policy(other), Err(build));
        assert_eq!(process_scope_policy(), build);
        assert_eq!(ScopeBinding::default().policy(), build);
    }

    #[test]
    fn scope_errors_convert_to_envelopes() {
        let envelope = ErrorEnvelope::from(ScopeError::NotEstablished);
        assert_eq!(envelope.code, ErrorCode::scope_not_established());

        let envelope = ErrorEnvelope::from(ScopeError::WrongType {
            key: CONTEXT_KEY_LOG_FIELDS,
        });
        assert_eq!(envelope.code, ErrorCode::scope_wrong_type());
        assert_eq!(
            envelope.metadata.get("key").map(String::as_str),
            Some(CONTEXT_KEY_LOG_FIELDS)
        );
    }
}
