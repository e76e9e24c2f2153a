//! Partial UPDATE statement builder.
//!
//! Turns a sparse update payload into the `SET` portion of an `UPDATE`
//! statement plus its positional parameters:
//!
//! ```text
//! {"firstName": "Aliya", "age": 32}  +  {firstName -> first_name}
//!   => "first_name"=$1, "age"=$2     with values ["Aliya", 32]
//! ```
//!
//! Values are never interpolated into the SQL text. Column identifiers are
//! quoted verbatim, so payload keys must come from a validated, fixed field
//! set before they reach this module.

use std::collections::HashMap;

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SqlError {
    #[error("No data")]
    NoData,

    #[error("Update payload must be a JSON object")]
    NotAnObject,
}

/// Ordered field -> value map describing the columns to change.
///
/// Iteration order is insertion order, which for payloads parsed from a
/// request body is the order the keys appear in the JSON text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdatePayload {
    fields: Map<String, Value>,
}

impl UpdatePayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> &mut Self {
        self.fields.insert(field.into(), value);
        self
    }

    pub fn with(mut self, field: impl Into<String>, value: Value) -> Self {
        self.insert(field, value);
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn get_mut(&mut self, field: &str) -> Option<&mut Value> {
        self.fields.get_mut(field)
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        // shift_remove keeps the remaining keys in order
        self.fields.shift_remove(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }
}

impl From<Map<String, Value>> for UpdatePayload {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

impl TryFrom<Value> for UpdatePayload {
    type Error = SqlError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            _ => Err(SqlError::NotAnObject),
        }
    }
}

/// Logical field name -> physical column name.
///
/// The table does not need to be total: fields without an entry are used as
/// column names unchanged.
#[derive(Debug, Clone, Default)]
pub struct FieldNameTable<'a> {
    columns: HashMap<&'a str, &'a str>,
}

impl<'a> FieldNameTable<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: &[(&'a str, &'a str)]) -> Self {
        pairs.iter().copied().collect()
    }

    /// Column for `field`, falling back to the field name itself.
    pub fn column_for<'f>(&self, field: &'f str) -> &'f str
    where
        'a: 'f,
    {
        self.columns.get(field).copied().unwrap_or(field)
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for FieldNameTable<'a> {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

/// `SET` clause text plus the values for its placeholders, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementFragment {
    pub set_clause: String,
    pub values: Vec<Value>,
}

impl StatementFragment {
    /// Index of the first placeholder free for use after the SET clause,
    /// e.g. for the row key in `WHERE handle = $n`.
    pub fn next_placeholder(&self) -> usize {
        self.values.len() + 1
    }
}

/// Build the `SET` clause for a partial update.
///
/// Fails with [`SqlError::NoData`] when the payload is empty; nothing is
/// built in that case.
pub fn sql_for_partial_update(
    payload: &UpdatePayload,
    names: &FieldNameTable<'_>,
) -> Result<StatementFragment, SqlError> {
    if payload.is_empty() {
        return Err(SqlError::NoData);
    }

    let mut columns = Vec::with_capacity(payload.len());
    let mut values = Vec::with_capacity(payload.len());
    for (idx, (field, value)) in payload.iter().enumerate() {
        columns.push(format!("\"{}\"=${}", names.column_for(field), idx + 1));
        values.push(value.clone());
    }

    Ok(StatementFragment {
        set_clause: columns.join(", "),
        values,
    })
}
