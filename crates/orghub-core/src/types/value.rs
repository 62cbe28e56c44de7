//! Dynamic SQL bind values and positional parameter bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A bind value for a dynamically built statement.
///
/// The query and filter builders emit SQL text plus a `Vec<SqlValue>`;
/// the database crate binds each variant onto the prepared statement in
/// order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    /// A UUID value.
    Uuid(Uuid),
    /// A nullable UUID value.
    OptUuid(Option<Uuid>),
    /// A string value.
    Text(String),
    /// A nullable string value.
    OptText(Option<String>),
    /// A boolean value.
    Bool(bool),
    /// An integer value.
    Int(i64),
    /// A floating-point value.
    Float(f64),
    /// A timestamp value.
    Timestamp(DateTime<Utc>),
    /// A nullable timestamp value.
    OptTimestamp(Option<DateTime<Utc>>),
    /// A string array (for `= ANY` predicates and text[] columns).
    TextArray(Vec<String>),
    /// A nullable string array.
    OptTextArray(Option<Vec<String>>),
    /// A UUID array (for `= ANY` predicates).
    UuidArray(Vec<Uuid>),
    /// A JSONB value.
    Json(serde_json::Value),
}

/// Accumulates bind values while a statement is being assembled, handing
/// out the matching `$n` placeholder for each.
#[derive(Debug, Default)]
pub struct Params {
    values: Vec<SqlValue>,
}

impl Params {
    /// Start an empty parameter list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value and return its `$n` placeholder.
    pub fn push(&mut self, value: SqlValue) -> String {
        self.values.push(value);
        format!("${}", self.values.len())
    }

    /// Number of values accumulated so far.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no values have been accumulated.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consume the accumulator, yielding values in placeholder order.
    pub fn into_values(self) -> Vec<SqlValue> {
        self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_are_sequential() {
        let mut params = Params::new();
        assert_eq!(params.push(SqlValue::Bool(true)), "$1");
        assert_eq!(params.push(SqlValue::Int(7)), "$2");
        assert_eq!(params.push(SqlValue::Text("x".into())), "$3");
        assert_eq!(params.into_values().len(), 3);
    }
}
