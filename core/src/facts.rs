//! The ground fact: predicate name plus argument tuple, as produced by the
//! fact extractor (component H) and consumed by the evaluator.

use crate::types::Value;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A fact in the system: a predicate applied to a tuple of ground values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fact {
    /// Fact name/predicate.
    pub predicate: Arc<str>,
    /// Fact arguments.
    pub args: Arc<[Value]>,
    /// Insertion order, used to break ties when facts are displayed.
    pub timestamp: u64,
}

impl Fact {
    /// Create a new fact.
    pub fn new(predicate: impl Into<String>, args: Vec<Value>) -> Self {
        static TIMESTAMP: AtomicU64 = AtomicU64::new(0);

        Fact {
            predicate: Arc::from(predicate.into().into_boxed_str()),
            args: Arc::from(args.into_boxed_slice()),
            timestamp: TIMESTAMP.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Create a unary fact (single argument).
    pub fn unary(predicate: impl Into<String>, arg: Value) -> Self {
        Self::new(predicate, vec![arg])
    }

    /// Create a binary fact (two arguments).
    pub fn binary(predicate: impl Into<String>, arg1: Value, arg2: Value) -> Self {
        Self::new(predicate, vec![arg1, arg2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unary_and_binary_constructors_set_predicate_and_args() {
        let u = Fact::unary("user", Value::string("alice"));
        assert_eq!(u.predicate.as_ref(), "user");
        assert_eq!(u.args.len(), 1);

        let b = Fact::binary("edge", Value::int(1), Value::int(2));
        assert_eq!(b.predicate.as_ref(), "edge");
        assert_eq!(b.args.len(), 2);
    }

    #[test]
    fn timestamps_are_strictly_increasing() {
        let a = Fact::unary("p", Value::int(1));
        let b = Fact::unary("p", Value::int(2));
        assert!(b.timestamp > a.timestamp);
    }
}
