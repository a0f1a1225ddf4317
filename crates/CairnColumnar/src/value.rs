//! Typed cell values for columnar datasets.
//!
//! [`Value`] is the unified cell type that bridges FHIR's data model with
//! the columnar execution model. Primitive FHIR types map onto dedicated
//! variants; complex types are represented as [`Value::Struct`], repeated
//! elements as [`Value::Array`]. Temporal values are stored as canonical
//! ISO strings, which compare correctly under lexicographic ordering when
//! written at the same precision.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

/// A single typed cell in a dataset row.
///
/// # Variants
///
/// - **`Null`**: absent value. All comparisons and most operations over
///   `Null` yield `Null` (three-valued logic at the operator layer).
/// - **`Boolean` / `Integer` / `Decimal` / `String`**: FHIR primitives.
/// - **`Date` / `DateTime` / `Time`**: canonical ISO strings.
/// - **`Array`**: ordered collection, used for repeated elements and for
///   element-identity sequences.
/// - **`Struct`**: named fields, used for complex datatypes such as
///   Coding, CodeableConcept and Reference. A `BTreeMap` keeps field
///   iteration deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Decimal(Decimal),
    String(String),
    Date(String),
    DateTime(String),
    Time(String),
    Array(Vec<Value>),
    Struct(BTreeMap<String, Value>),
}

impl Value {
    /// Whether this cell is absent. An empty array also counts as absent,
    /// matching the language's empty-collection semantics.
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Array(items) => items.is_empty(),
            _ => false,
        }
    }

    /// A short name for the cell's type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::DateTime(_) => "dateTime",
            Value::Time(_) => "time",
            Value::Array(_) => "array",
            Value::Struct(_) => "struct",
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view of the cell, promoting integers to decimals.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Integer(i) => Some(Decimal::from(*i)),
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Date(s) | Value::DateTime(s) | Value::Time(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Struct(fields) => Some(fields),
            _ => None,
        }
    }

    /// Looks up a field of a struct cell. Returns `None` for non-structs
    /// and for missing fields; callers treat both as absent.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.as_struct().and_then(|fields| fields.get(name))
    }

    /// Ordering between two cells, where one is defined.
    ///
    /// Numerics compare across integer/decimal, strings and temporals
    /// compare lexicographically, booleans false-before-true, and arrays
    /// compare lexicographically element-wise (this is what makes
    /// element-identity sequences sortable). Comparisons involving `Null`
    /// or mismatched types yield `None`.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Integer(_), Value::Decimal(_)) | (Value::Decimal(_), Value::Integer(_)) | (Value::Decimal(_), Value::Decimal(_)) => {
                Some(self.as_decimal()?.cmp(&other.as_decimal()?))
            }
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            (Value::Time(a), Value::Time(b)) => Some(a.cmp(b)),
            (Value::Array(a), Value::Array(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.compare(y) {
                        Some(Ordering::Equal) => continue,
                        other => return other,
                    }
                }
                Some(a.len().cmp(&b.len()))
            }
            _ => None,
        }
    }

    /// Converts this cell into a JSON value, used when shaping terminology
    /// gateway payloads.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Integer(i) => serde_json::Value::from(*i),
            Value::Decimal(d) => d
                .to_f64()
                .and_then(serde_json::Number::from_f64)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) | Value::Date(s) | Value::DateTime(s) | Value::Time(s) => {
                serde_json::Value::String(s.clone())
            }
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Struct(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .filter(|(_, v)| !v.is_null())
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// Builds a cell from a JSON value, used when decoding terminology
    /// gateway responses. Numbers become integers where exact, decimals
    /// otherwise.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Integer(i)
                } else {
                    n.as_f64()
                        .and_then(Decimal::from_f64)
                        .map(Value::Decimal)
                        .unwrap_or(Value::Null)
                }
            }
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => {
                Value::Array(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(fields) => Value::Struct(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_comparison_promotes_integers() {
        let two = Value::Integer(2);
        let two_and_a_half = Value::Decimal(Decimal::new(25, 1));
        assert_eq!(two.compare(&two_and_a_half), Some(Ordering::Less));
    }

    #[test]
    fn array_comparison_is_lexicographic() {
        let a = Value::Array(vec![Value::Integer(0), Value::Integer(1)]);
        let b = Value::Array(vec![Value::Integer(0), Value::Integer(2)]);
        let prefix = Value::Array(vec![Value::Integer(0)]);
        assert_eq!(a.compare(&b), Some(Ordering::Less));
        assert_eq!(prefix.compare(&a), Some(Ordering::Less));
    }

    #[test]
    fn null_never_compares() {
        assert_eq!(Value::Null.compare(&Value::Integer(1)), None);
        assert!(Value::Null.is_null());
        assert!(Value::Array(vec![]).is_null());
    }
}
