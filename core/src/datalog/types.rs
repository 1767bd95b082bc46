//! Core Datalog data structures: terms, atoms, rules, programs, substitutions.

use crate::types::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A term in Datalog: a variable or a ground constant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    /// Variable, named or a generated `_anon_N` anonymous variable.
    Variable(String),
    /// Constant value (string or number at the source level).
    Constant(Value),
}

impl Term {
    /// Create a variable term.
    pub fn var(name: impl Into<String>) -> Self {
        Term::Variable(name.into())
    }

    /// Create a constant term.
    pub fn constant(value: Value) -> Self {
        Term::Constant(value)
    }

    /// Check if term is a variable.
    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Variable(_))
    }

    /// Check if term is a constant.
    pub fn is_constant(&self) -> bool {
        matches!(self, Term::Constant(_))
    }

    /// Get variable name if this is a variable.
    pub fn as_variable(&self) -> Option<&str> {
        match self {
            Term::Variable(name) => Some(name),
            _ => None,
        }
    }

    /// Get constant value if this is a constant.
    pub fn as_constant(&self) -> Option<&Value> {
        match self {
            Term::Constant(val) => Some(val),
            _ => None,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Variable(name) => write!(f, "{}", name),
            Term::Constant(Value::String(s)) => write!(f, "\"{}\"", s),
            Term::Constant(Value::Number(n)) => write!(f, "{}", n),
            Term::Constant(Value::Bool(b)) => write!(f, "{}", b),
            Term::Constant(Value::Null) => write!(f, "null"),
            Term::Constant(_) => write!(f, "<complex>"),
        }
    }
}

/// A comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompOp {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl fmt::Display for CompOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompOp::Eq => "=",
            CompOp::Ne => "!=",
            CompOp::Lt => "<",
            CompOp::Le => "<=",
            CompOp::Gt => ">",
            CompOp::Ge => ">=",
        };
        write!(f, "{}", s)
    }
}

/// An atom: a predicate symbol plus an ordered list of terms.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Atom {
    /// Predicate name.
    pub predicate: Arc<str>,
    /// Terms (arguments).
    pub terms: Vec<Term>,
}

impl Atom {
    /// Create a new atom.
    pub fn new(predicate: impl Into<String>, terms: Vec<Term>) -> Self {
        Atom {
            predicate: Arc::from(predicate.into().into_boxed_str()),
            terms,
        }
    }

    /// Get the arity (number of terms).
    pub fn arity(&self) -> usize {
        self.terms.len()
    }

    /// Get all variables in this atom, in argument order (may repeat).
    pub fn variables(&self) -> Vec<&str> {
        self.terms.iter().filter_map(|t| t.as_variable()).collect()
    }

    /// Check if atom is ground (no variables).
    pub fn is_ground(&self) -> bool {
        self.terms.iter().all(|t| t.is_constant())
    }

    /// Apply substitution to get a new, possibly still non-ground atom.
    pub fn apply_substitution(&self, sub: &Substitution) -> Atom {
        Atom {
            predicate: self.predicate.clone(),
            terms: self.terms.iter().map(|t| sub.apply_to_term(t)).collect(),
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.predicate)?;
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", term)?;
        }
        write!(f, ")")
    }
}

/// One literal in a rule body: a positive atom, a negated atom, or a
/// comparison between two terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyLiteral {
    /// Plain atom, matched against the current relation of its predicate.
    Positive(Atom),
    /// `not atom(...)`.
    Negative(Atom),
    /// `term op term`.
    Comparison(Term, CompOp, Term),
}

impl BodyLiteral {
    /// Variables occurring in this literal, in left-to-right order.
    pub fn variables(&self) -> Vec<&str> {
        match self {
            BodyLiteral::Positive(a) | BodyLiteral::Negative(a) => a.variables(),
            BodyLiteral::Comparison(l, _, r) => {
                l.as_variable().into_iter().chain(r.as_variable()).collect()
            }
        }
    }

    /// The predicate this literal depends on, if it is an atom.
    pub fn predicate(&self) -> Option<&Arc<str>> {
        match self {
            BodyLiteral::Positive(a) | BodyLiteral::Negative(a) => Some(&a.predicate),
            BodyLiteral::Comparison(..) => None,
        }
    }

    /// Whether this literal is a negated atom.
    pub fn is_negative(&self) -> bool {
        matches!(self, BodyLiteral::Negative(_))
    }
}

impl fmt::Display for BodyLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyLiteral::Positive(a) => write!(f, "{}", a),
            BodyLiteral::Negative(a) => write!(f, "not {}", a),
            BodyLiteral::Comparison(l, op, r) => write!(f, "{} {} {}", l, op, r),
        }
    }
}

/// A Datalog rule (Horn clause): `head :- body.`. A rule with an empty body
/// is a fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Head of the rule.
    pub head: Atom,
    /// Body literals, in source order.
    pub body: Vec<BodyLiteral>,
    /// Stratum assigned during stratification; 0 until computed.
    pub stratum: usize,
}

impl Rule {
    /// Create a new rule.
    pub fn new(head: Atom, body: Vec<BodyLiteral>) -> Self {
        Rule {
            head,
            body,
            stratum: 0,
        }
    }

    /// Create a fact (rule with empty body).
    pub fn fact(head: Atom) -> Self {
        Rule::new(head, vec![])
    }

    /// Check if this is a fact (empty body).
    pub fn is_fact(&self) -> bool {
        self.body.is_empty()
    }

    /// Variables bound by a positive body literal.
    fn positive_body_vars(&self) -> std::collections::HashSet<&str> {
        self.body
            .iter()
            .filter_map(|lit| match lit {
                BodyLiteral::Positive(a) => Some(a.variables()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Check if rule is safe: every head variable occurs in a positive body
    /// literal. Facts are vacuously safe.
    pub fn is_safe(&self) -> bool {
        if self.is_fact() {
            return true;
        }
        let positive_vars = self.positive_body_vars();
        self.head.variables().iter().all(|v| positive_vars.contains(v))
    }

    /// Return the first head variable that fails the safety check, if any.
    pub fn unsafe_variable(&self) -> Option<&str> {
        if self.is_fact() {
            return None;
        }
        let positive_vars = self.positive_body_vars();
        self.head
            .variables()
            .into_iter()
            .find(|v| !positive_vars.contains(v))
    }

    /// Predicates this rule's head depends on (body atom predicates, with
    /// whether the reference is negative).
    pub fn dependencies(&self) -> Vec<(Arc<str>, bool)> {
        self.body
            .iter()
            .filter_map(|lit| match lit {
                BodyLiteral::Positive(a) => Some((a.predicate.clone(), false)),
                BodyLiteral::Negative(a) => Some((a.predicate.clone(), true)),
                BodyLiteral::Comparison(..) => None,
            })
            .collect()
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.head)?;
        if !self.body.is_empty() {
            write!(f, " :- ")?;
            for (i, lit) in self.body.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", lit)?;
            }
        }
        write!(f, ".")
    }
}

/// A full Datalog program: rules plus queries to solve against the computed
/// minimal model.
#[derive(Debug, Clone, Default)]
pub struct Program {
    /// All parsed rules, including facts.
    pub rules: Vec<Rule>,
    /// Goal atoms from `?- atom.` queries, in source order.
    pub queries: Vec<Atom>,
}

/// Variable substitution (binding) built up while matching a rule body
/// against the current fact relations.
#[derive(Debug, Clone, Default)]
pub struct Substitution {
    bindings: HashMap<String, Value>,
}

impl Substitution {
    /// Create an empty substitution.
    pub fn new() -> Self {
        Substitution {
            bindings: HashMap::new(),
        }
    }

    /// Add a binding.
    pub fn bind(&mut self, variable: String, value: Value) {
        self.bindings.insert(variable, value);
    }

    /// Get binding for a variable.
    pub fn get(&self, variable: &str) -> Option<&Value> {
        self.bindings.get(variable)
    }

    /// Check if variable is bound.
    pub fn contains(&self, variable: &str) -> bool {
        self.bindings.contains_key(variable)
    }

    /// Apply substitution to a term.
    pub fn apply_to_term(&self, term: &Term) -> Term {
        match term {
            Term::Variable(name) => match self.bindings.get(name) {
                Some(value) => Term::Constant(value.clone()),
                None => term.clone(),
            },
            Term::Constant(_) => term.clone(),
        }
    }

    /// Get all bindings.
    pub fn bindings(&self) -> &HashMap<String, Value> {
        &self.bindings
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Check if substitution is empty.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl fmt::Display for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (var, val)) in self.bindings.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} = {}", var, val)?;
        }
        write!(f, "}}")
    }
}
