//! Error types for the sonobat graph/Datalog engine

use thiserror::Error;

/// Which resource bound a Datalog evaluation exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceBound {
    /// Per-stratum fixed-point iteration cap.
    MaxIterations,
    /// Total derived-tuple cap across all predicates.
    MaxTuples,
    /// Program-size cap, checked before evaluation starts.
    MaxRules,
    /// Wall-clock timeout.
    TimeoutMs,
}

impl std::fmt::Display for ResourceBound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceBound::MaxIterations => write!(f, "maxIterations"),
            ResourceBound::MaxTuples => write!(f, "maxTuples"),
            ResourceBound::MaxRules => write!(f, "maxRules"),
            ResourceBound::TimeoutMs => write!(f, "timeoutMs"),
        }
    }
}

/// The closed error sum type for the engine. Every error is
/// distinguishable at the type level; structured fields are preserved for
/// programmatic handling rather than folded into a message string.
#[derive(Error, Debug)]
pub enum SonobatError {
    /// A node's property bag failed schema validation (component A).
    #[error("validation error: {0}")]
    Validation(String),

    /// Natural-key clash on `createNode`/`createEdge` (not upsert).
    #[error("natural key collision: {natural_key}")]
    SchemaCollision {
        /// The colliding natural key.
        natural_key: String,
    },

    /// An edge referenced a node id that does not exist.
    #[error("foreign key error: {0}")]
    ForeignKey(String),

    /// Malformed tool output (wrong JSON shape, missing required XML
    /// attribute, unparsable line, ...).
    #[error("parse format error: {0}")]
    ParseFormat(String),

    /// Lexical or grammatical error in Datalog source, with source location.
    #[error("datalog syntax error at {line}:{column}: {message}")]
    DatalogSyntax {
        /// 1-indexed line.
        line: usize,
        /// 1-indexed column.
        column: usize,
        /// Human-readable description.
        message: String,
    },

    /// A rule's head uses a variable that never appears in a positive body
    /// literal.
    #[error("unsafe rule: variable {variable} in head of {predicate} does not occur in a positive body literal")]
    DatalogSafety {
        /// The offending variable name.
        variable: String,
        /// The head predicate of the unsafe rule.
        predicate: String,
    },

    /// Negation inside a recursive (mutually dependent) predicate cycle.
    #[error("stratification error: predicate {predicate} is negated within its own dependency cycle")]
    DatalogStratification {
        /// The predicate whose cycle contains a negative edge.
        predicate: String,
    },

    /// One of the four evaluation resource bounds was exceeded.
    #[error("resource error: exceeded {bound}")]
    DatalogResource {
        /// Which bound was hit.
        bound: ResourceBound,
    },

    /// Storage substrate I/O or transaction failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Underlying IO failure (reading a tool-output file, a snapshot, ...).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for sonobat operations.
pub type Result<T> = std::result::Result<T, SonobatError>;
