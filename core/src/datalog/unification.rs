//! Unification algorithm for Datalog
//!
//! Implements the unification algorithm for matching atoms with facts
//! and computing variable substitutions. Facts are always fully ground, so
//! the only combinations a body atom's terms can be unified against are
//! variable-against-constant and constant-against-constant; there is no
//! variable-against-variable case to support here.

use super::types::{Atom, Substitution, Term};
use crate::facts::Fact;
use crate::types::Value;

/// Unify two terms, producing a substitution if successful
pub fn unify_terms(term1: &Term, term2: &Term, sub: &mut Substitution) -> bool {
    match (term1, term2) {
        // Variable-Constant
        (Term::Variable(var), Term::Constant(val)) | (Term::Constant(val), Term::Variable(var)) => {
            if let Some(existing) = sub.get(var) {
                existing == val
            } else {
                sub.bind(var.clone(), val.clone());
                true
            }
        }

        // Constant-Constant
        (Term::Constant(val1), Term::Constant(val2)) => val1 == val2,
    }
}

/// Unify an atom with a fact, producing a substitution if successful
pub fn unify_atom_with_fact(atom: &Atom, fact: &Fact) -> Option<Substitution> {
    // Check predicate match
    if atom.predicate != fact.predicate {
        return None;
    }

    // Check arity
    if atom.terms.len() != fact.args.len() {
        return None;
    }

    let mut sub = Substitution::new();

    // Unify each term with corresponding fact argument
    for (term, fact_arg) in atom.terms.iter().zip(fact.args.iter()) {
        if !unify_terms(term, &Term::Constant(fact_arg.clone()), &mut sub) {
            return None;
        }
    }

    Some(sub)
}

/// Apply a substitution to an atom to produce a ground atom (fact)
pub fn ground_atom(atom: &Atom, sub: &Substitution) -> Option<Fact> {
    let grounded_atom = atom.apply_substitution(sub);

    // Check if all terms are ground
    if !grounded_atom.is_ground() {
        return None;
    }

    // Convert to Fact
    let args: Vec<Value> = grounded_atom
        .terms
        .iter()
        .filter_map(|t| t.as_constant().cloned())
        .collect();

    Some(Fact::new(
        grounded_atom.predicate.as_ref().to_string(),
        args,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unify_terms_constant_constant() {
        let mut sub = Substitution::new();
        let t1 = Term::Constant(Value::int(42));
        let t2 = Term::Constant(Value::int(42));

        assert!(unify_terms(&t1, &t2, &mut sub));
        assert!(sub.is_empty());
    }

    #[test]
    fn test_unify_terms_variable_constant() {
        let mut sub = Substitution::new();
        let var = Term::var("X");
        let const_term = Term::Constant(Value::int(42));

        assert!(unify_terms(&var, &const_term, &mut sub));
        assert_eq!(sub.get("X"), Some(&Value::int(42)));
    }

    #[test]
    fn test_unify_atom_with_fact() {
        let atom = Atom::new(
            "edge",
            vec![Term::var("X"), Term::constant(Value::int(2))],
        );
        let fact = Fact::binary("edge", Value::int(1), Value::int(2));

        let sub = unify_atom_with_fact(&atom, &fact).unwrap();
        assert_eq!(sub.get("X"), Some(&Value::int(1)));
    }

    #[test]
    fn test_unify_atom_with_fact_fail() {
        let atom = Atom::new(
            "edge",
            vec![Term::var("X"), Term::constant(Value::int(3))],
        );
        let fact = Fact::binary("edge", Value::int(1), Value::int(2));

        assert!(unify_atom_with_fact(&atom, &fact).is_none());
    }

    #[test]
    fn test_ground_atom() {
        let atom = Atom::new("path", vec![Term::var("X"), Term::var("Y")]);

        let mut sub = Substitution::new();
        sub.bind("X".to_string(), Value::int(1));
        sub.bind("Y".to_string(), Value::int(2));

        let fact = ground_atom(&atom, &sub).unwrap();
        assert_eq!(fact.predicate.as_ref(), "path");
        assert_eq!(fact.args[0], Value::int(1));
        assert_eq!(fact.args[1], Value::int(2));
    }

    #[test]
    fn test_ground_atom_incomplete() {
        let atom = Atom::new("path", vec![Term::var("X"), Term::var("Y")]);

        let mut sub = Substitution::new();
        sub.bind("X".to_string(), Value::int(1));
        // Y not bound

        assert!(ground_atom(&atom, &sub).is_none());
    }
}
