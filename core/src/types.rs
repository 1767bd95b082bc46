//! Core value type shared by node property bags and Datalog terms

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A value stored in a node property bag or bound to a Datalog variable.
///
/// Numbers use `rust_decimal::Decimal` rather than `f64` so that constants
/// compare and hash exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Null / absent value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Exact numeric value (integer or fractional).
    Number(Decimal),
    /// String value.
    String(Arc<str>),
    /// Array of values (nested list property, e.g. request tags).
    Array(Arc<[Value]>),
    /// Object/map of values (free-JSON property fields).
    Object(Arc<BTreeMap<String, Value>>),
}

impl Value {
    /// Create a string value.
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(Arc::from(s.into().into_boxed_str()))
    }

    /// Create an integer-valued number.
    pub fn int(i: i64) -> Self {
        Value::Number(Decimal::from(i))
    }

    /// Create an array value.
    pub fn array(values: Vec<Value>) -> Self {
        Value::Array(Arc::from(values.into_boxed_slice()))
    }

    /// Create an object value.
    pub fn object(map: BTreeMap<String, Value>) -> Self {
        Value::Object(Arc::new(map))
    }

    /// Check if value is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => !n.is_zero(),
            Value::String(s) => !s.is_empty(),
            Value::Array(a) => !a.is_empty(),
            Value::Object(o) => !o.is_empty(),
        }
    }

    /// Get the underlying number, if this is a `Number`.
    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the underlying string, if this is a `String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_ref()),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Array(_) => write!(f, "<array>"),
            Value::Object(_) => write!(f, "<object>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy() {
        assert!(!Value::Null.is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(!Value::Number(Decimal::ZERO).is_truthy());
        assert!(Value::int(1).is_truthy());
        assert!(!Value::string("").is_truthy());
    }

    #[test]
    fn equality_is_exact() {
        assert_eq!(Value::int(2), Value::Number(Decimal::new(2, 0)));
        assert_ne!(Value::int(2), Value::Number(Decimal::new(3, 0)));
    }
}
