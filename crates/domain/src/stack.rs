//! LIFO stack of field batches.
//!
//! Each batch models one nested logging scope. Fields pushed by a scope stay
//! visible to every scope nested inside it and vanish when that scope pops.
//! Duplicate names across scopes shadow rather than overwrite, so popping the
//! inner scope restores the outer value.

use crate::field::{FieldBatch, LogFields};

/// Ordered stack of field batches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldStack {
    batches: Vec<FieldBatch>,
}

impl FieldStack {
    /// Create an empty stack.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            batches: Vec::new(),
        }
    }

    /// Append a batch at the tail. Empty batches are legal and still take one pop.
    pub fn push(&mut self, batch: impl Into<FieldBatch>) -> &mut Self {
        self.batches.push(batch.into());
        self
    }

    /// Remove the tail batch. Popping an empty stack does nothing.
    pub fn pop(&mut self) {
        self.batches.pop();
    }

    /// Number of batches currently on the stack.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.batches.len()
    }

    /// Returns true when no batches are on the stack.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Flatten all batches, oldest to newest, into a fresh mapping.
    ///
    /// On a name collision the later field wins, both across batches and
    /// within a batch.
    #[must_use]
    pub fn all_fields(&self) -> LogFields {
        let mut fields = LogFields::new();
        for batch in &self.batches {
            for field in batch {
                fields.insert(field.name().into(), field.value().clone());
            }
        }
        fields
    }
}
