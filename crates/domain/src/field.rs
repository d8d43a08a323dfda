//! Structured log fields.

use serde_json::Value;
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Value carried by a field.
///
/// `serde_json::Value` is a closed sum over what a structured sink can
/// serialize: null, bool, number, string, array, and object.
pub type FieldValue = Value;

/// Flattened field mapping, keyed by field name.
pub type LogFields = BTreeMap<Box<str>, FieldValue>;

/// An immutable name/value pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    name: Box<str>,
    value: FieldValue,
}

impl Field {
    /// Create a field.
    pub fn new(name: impl Into<Box<str>>, value: impl Into<FieldValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Create a timestamp field encoded as milliseconds since the Unix epoch.
    ///
    /// Times before the epoch encode as `0`.
    pub fn timestamp(name: impl Into<Box<str>>, at: SystemTime) -> Self {
        let millis = at
            .duration_since(UNIX_EPOCH)
            .ok()
            .and_then(|duration| u64::try_from(duration.as_millis()).ok())
            .unwrap_or_default();
        Self::new(name, millis)
    }

    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field value.
    #[must_use]
    pub const fn value(&self) -> &FieldValue {
        &self.value
    }

    /// Split into owned name and value.
    #[must_use]
    pub fn into_parts(self) -> (Box<str>, FieldValue) {
        (self.name, self.value)
    }
}

impl<K, V> From<(K, V)> for Field
where
    K: Into<Box<str>>,
    V: Into<FieldValue>,
{
    fn from((name, value): (K, V)) -> Self {
        Self::new(name, value)
    }
}

/// Fields pushed together in one call; the unit removed by a single pop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldBatch(Vec<Field>);

impl FieldBatch {
    /// Create an empty batch.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Number of fields in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when the batch holds no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate fields in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.0.iter()
    }
}

impl From<Vec<Field>> for FieldBatch {
    fn from(fields: Vec<Field>) -> Self {
        Self(fields)
    }
}

impl<const N: usize> From<[Field; N]> for FieldBatch {
    fn from(fields: [Field; N]) -> Self {
        Self(fields.into())
    }
}

impl From<LogFields> for FieldBatch {
    fn from(fields: LogFields) -> Self {
        Self(fields_from_map(fields))
    }
}

impl FromIterator<Field> for FieldBatch {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a FieldBatch {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for FieldBatch {
    type Item = Field;
    type IntoIter = std::vec::IntoIter<Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Convert a mapping into a list of fields (key order).
#[must_use]
pub fn fields_from_map(fields: LogFields) -> Vec<Field> {
    fields
        .into_iter()
        .map(|(name, value)| Field { name, value })
        .collect()
}

/// Insert fields into `target`; later fields overwrite earlier ones.
pub fn merge_fields<I>(target: &mut LogFields, fields: I)
where
    I: IntoIterator<Item = Field>,
{
    for field in fields {
        let (name, value) = field.into_parts();
        target.insert(name, value);
    }
}
