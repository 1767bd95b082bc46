//! Semi-naive, stratified-negation fixed-point evaluator (component G).
//!
//! Evaluates a [`Program`] stratum by stratum, iterating each stratum to a
//! fixed point by joining newly-derived ("delta") tuples against the current
//! relations, then projects the goal atom of every query through the
//! computed minimal model.

use super::stratify::stratify;
use super::types::{Atom, BodyLiteral, CompOp, Program, Rule, Substitution, Term};
use super::unification::{ground_atom, unify_atom_with_fact};
use crate::error::{ResourceBound, SonobatError};
use crate::facts::Fact;
use crate::types::Value;
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// Resource bounds enforced during evaluation.
#[derive(Debug, Clone, Copy)]
pub struct EvaluatorLimits {
    /// Per-stratum fixed-point iteration cap.
    pub max_iterations: usize,
    /// Total derived-tuple cap across all predicates.
    pub max_tuples: usize,
    /// Program-size cap, checked before evaluation starts.
    pub max_rules: usize,
    /// Wall-clock timeout, checked between iterations.
    pub timeout_ms: u64,
}

impl Default for EvaluatorLimits {
    fn default() -> Self {
        EvaluatorLimits {
            max_iterations: 1000,
            max_tuples: 100_000,
            max_rules: 200,
            timeout_ms: 5000,
        }
    }
}

/// One query's answer: the goal atom, its projected tuples, and column
/// names.
#[derive(Debug, Clone)]
pub struct QueryAnswer {
    /// The goal atom as written in the program.
    pub goal: Atom,
    /// Distinct projected tuples.
    pub tuples: Vec<Vec<Value>>,
    /// Column label per argument position.
    pub columns: Vec<String>,
}

/// Statistics returned alongside evaluation answers.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvalStats {
    /// Total fixed-point iterations across all strata.
    pub iterations: usize,
    /// Total number of distinct derived tuples (accumulated relation size).
    pub total_tuples: usize,
    /// Wall-clock evaluation time.
    pub elapsed_ms: u64,
}

/// Full result of a program evaluation.
#[derive(Debug, Clone)]
pub struct EvalResult {
    /// One answer per query, in program order.
    pub answers: Vec<QueryAnswer>,
    /// Evaluation statistics.
    pub stats: EvalStats,
}

/// Evaluate `program` against `base_facts` (the union of graph-extracted
/// facts and the program's own fact rules is formed internally) and project
/// every query in the program. Records ingestion-independent evaluation
/// metrics (iterations, tuple counts, resource-bound trips) regardless of
/// outcome.
#[tracing::instrument(skip(program, base_facts, limits), fields(rules = program.rules.len(), queries = program.queries.len()))]
pub fn evaluate(
    program: &Program,
    base_facts: &[Fact],
    limits: &EvaluatorLimits,
) -> Result<EvalResult, SonobatError> {
    let start = Instant::now();
    let result = evaluate_inner(program, base_facts, limits);
    match &result {
        Ok(r) => crate::monitoring::metrics::record_evaluation(
            r.stats.iterations,
            r.stats.total_tuples,
            r.stats.elapsed_ms,
            false,
        ),
        Err(_) => crate::monitoring::metrics::record_evaluation(
            0,
            0,
            start.elapsed().as_millis() as u64,
            true,
        ),
    }
    result
}

fn evaluate_inner(
    program: &Program,
    base_facts: &[Fact],
    limits: &EvaluatorLimits,
) -> Result<EvalResult, SonobatError> {
    if program.rules.len() > limits.max_rules {
        return Err(SonobatError::DatalogResource {
            bound: ResourceBound::MaxRules,
        });
    }

    let start = Instant::now();
    let timeout = Duration::from_millis(limits.timeout_ms);
    let strata = stratify(program)?;

    let mut all_accumulated: HashSet<Fact> = base_facts.iter().cloned().collect();
    let mut total_iterations = 0usize;

    for stratum_rules in &strata {
        let (fact_rules, non_fact_rules): (Vec<&Rule>, Vec<&Rule>) =
            stratum_rules.iter().partition(|r| r.is_fact());

        for rule in &fact_rules {
            if let Some(fact) = atom_to_fact(&rule.head) {
                all_accumulated.insert(fact);
            }
        }
        check_tuple_bound(all_accumulated.len(), limits)?;

        if non_fact_rules.is_empty() {
            continue;
        }

        let mut delta: HashSet<Fact> = all_accumulated.clone();
        let mut accumulated = all_accumulated.clone();
        let mut iterations = 0usize;

        loop {
            if start.elapsed() > timeout {
                return Err(SonobatError::DatalogResource {
                    bound: ResourceBound::TimeoutMs,
                });
            }

            iterations += 1;
            total_iterations += 1;
            if iterations > limits.max_iterations {
                return Err(SonobatError::DatalogResource {
                    bound: ResourceBound::MaxIterations,
                });
            }

            let mut new_delta: HashSet<Fact> = HashSet::new();
            for rule in &non_fact_rules {
                for delta_index in 0..rule.body.len() {
                    let derived = apply_rule_with_delta_at(rule, &accumulated, &delta, delta_index)?;
                    new_delta.extend(derived);
                }
            }
            new_delta.retain(|f| !accumulated.contains(f));

            if new_delta.is_empty() {
                break;
            }

            accumulated.extend(new_delta.iter().cloned());
            check_tuple_bound(accumulated.len(), limits)?;
            delta = new_delta;
        }

        all_accumulated = accumulated;
    }

    let answers = program
        .queries
        .iter()
        .map(|goal| project_query(goal, &all_accumulated))
        .collect();

    Ok(EvalResult {
        answers,
        stats: EvalStats {
            iterations: total_iterations,
            total_tuples: all_accumulated.len(),
            elapsed_ms: start.elapsed().as_millis() as u64,
        },
    })
}

fn check_tuple_bound(size: usize, limits: &EvaluatorLimits) -> Result<(), SonobatError> {
    if size > limits.max_tuples {
        Err(SonobatError::DatalogResource {
            bound: ResourceBound::MaxTuples,
        })
    } else {
        Ok(())
    }
}

fn atom_to_fact(atom: &Atom) -> Option<Fact> {
    if !atom.is_ground() {
        return None;
    }
    let args: Vec<Value> = atom.terms.iter().filter_map(|t| t.as_constant().cloned()).collect();
    Some(Fact::new(atom.predicate.as_ref().to_string(), args))
}

/// Apply one rule, requiring the body literal at `delta_index` to draw its
/// matches from `delta` (the semi-naive acceleration) while every other
/// positive literal draws from the full accumulated relation.
fn apply_rule_with_delta_at(
    rule: &Rule,
    accumulated: &HashSet<Fact>,
    delta: &HashSet<Fact>,
    delta_index: usize,
) -> Result<Vec<Fact>, SonobatError> {
    let mut current_subs = vec![Substitution::new()];

    for (index, literal) in rule.body.iter().enumerate() {
        let mut next_subs = Vec::new();

        match literal {
            BodyLiteral::Negative(atom) => {
                for sub in current_subs {
                    let grounded = atom.apply_substitution(&sub);
                    let has_match = accumulated
                        .iter()
                        .any(|fact| unify_atom_with_fact(&grounded, fact).is_some());
                    if !has_match {
                        next_subs.push(sub);
                    }
                }
            }
            BodyLiteral::Positive(atom) => {
                let source: Box<dyn Iterator<Item = &Fact>> = if index == delta_index {
                    Box::new(delta.iter())
                } else {
                    Box::new(accumulated.iter())
                };
                let facts: Vec<&Fact> = source.collect();
                for sub in current_subs {
                    let partial = atom.apply_substitution(&sub);
                    for fact in &facts {
                        if let Some(new_bindings) = unify_atom_with_fact(&partial, fact) {
                            if let Some(merged) = merge_substitutions(&sub, &new_bindings) {
                                next_subs.push(merged);
                            }
                        }
                    }
                }
            }
            BodyLiteral::Comparison(left, op, right) => {
                for sub in current_subs {
                    if evaluate_comparison(left, *op, right, &sub) {
                        next_subs.push(sub);
                    }
                }
            }
        }

        current_subs = next_subs;
        if current_subs.is_empty() {
            return Ok(vec![]);
        }
    }

    Ok(current_subs.iter().filter_map(|sub| ground_atom(&rule.head, sub)).collect())
}

fn merge_substitutions(a: &Substitution, b: &Substitution) -> Option<Substitution> {
    let mut merged = a.clone();
    for (var, val) in b.bindings() {
        if let Some(existing) = merged.get(var) {
            if existing != val {
                return None;
            }
        } else {
            merged.bind(var.clone(), val.clone());
        }
    }
    Some(merged)
}

/// Resolve a term to a value under a substitution. Returns `None` for an
/// unbound variable, which fails the comparison per the range-restriction
/// rule rather than aborting evaluation.
fn resolve(term: &Term, sub: &Substitution) -> Option<Value> {
    match term {
        Term::Constant(v) => Some(v.clone()),
        Term::Variable(name) => sub.get(name).cloned(),
    }
}

fn evaluate_comparison(left: &Term, op: CompOp, right: &Term, sub: &Substitution) -> bool {
    let (Some(l), Some(r)) = (resolve(left, sub), resolve(right, sub)) else {
        return false;
    };

    match op {
        CompOp::Eq => l == r,
        CompOp::Ne => l != r,
        CompOp::Lt | CompOp::Le | CompOp::Gt | CompOp::Ge => {
            let (Some(ln), Some(rn)) = (l.as_number(), r.as_number()) else {
                return false;
            };
            match op {
                CompOp::Lt => ln < rn,
                CompOp::Le => ln <= rn,
                CompOp::Gt => ln > rn,
                CompOp::Ge => ln >= rn,
                _ => unreachable!(),
            }
        }
    }
}

fn project_query(goal: &Atom, accumulated: &HashSet<Fact>) -> QueryAnswer {
    let columns: Vec<String> = goal
        .terms
        .iter()
        .map(|t| match t {
            Term::Variable(name) => name.clone(),
            Term::Constant(v) => v.to_string(),
        })
        .collect();

    let mut tuples: Vec<Vec<Value>> = Vec::new();
    let mut seen: HashSet<Vec<Value>> = HashSet::new();

    for fact in accumulated {
        if fact.predicate.as_ref() != goal.predicate.as_ref() {
            continue;
        }
        if fact.args.len() != goal.terms.len() {
            continue;
        }
        let mut matches = true;
        let mut row = Vec::new();
        for (term, value) in goal.terms.iter().zip(fact.args.iter()) {
            match term {
                Term::Constant(c) => {
                    if c != value {
                        matches = false;
                        break;
                    }
                }
                Term::Variable(_) => row.push(value.clone()),
            }
        }
        if matches && seen.insert(row.clone()) {
            tuples.push(row);
        }
    }

    QueryAnswer {
        goal: goal.clone(),
        tuples,
        columns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datalog::parser::parse_program;

    fn run(src: &str) -> EvalResult {
        let program = parse_program(src).unwrap();
        evaluate(&program, &[], &EvaluatorLimits::default()).unwrap()
    }

    #[test]
    fn s1_empty_graph_quiescence() {
        let result = evaluate(
            &parse_program("?- host(I,A,K).").unwrap(),
            &[],
            &EvaluatorLimits::default(),
        )
        .unwrap();
        assert_eq!(result.answers.len(), 1);
        assert!(result.answers[0].tuples.is_empty());
        assert!(result.stats.iterations <= 1);
    }

    #[test]
    fn s2_ancestor_transitive_closure() {
        let result = run(
            r#"
            parent("alice","bob"). parent("bob","carol").
            ancestor(X,Y) :- parent(X,Y).
            ancestor(X,Z) :- parent(X,Y), ancestor(Y,Z).
            ?- ancestor(X,"carol").
            "#,
        );
        let mut got: Vec<String> = result.answers[0]
            .tuples
            .iter()
            .map(|row| row[0].as_str().unwrap().to_string())
            .collect();
        got.sort();
        assert_eq!(got, vec!["alice", "bob"]);
    }

    #[test]
    fn s3_stratified_negation() {
        let result = run(
            r#"
            node("a"). node("b"). danger("b").
            safe(X) :- node(X), not danger(X).
            ?- safe(X).
            "#,
        );
        assert_eq!(result.answers[0].tuples.len(), 1);
        assert_eq!(result.answers[0].tuples[0][0].as_str(), Some("a"));
    }

    #[test]
    fn s7_resource_bound_on_tuple_cap() {
        let program = parse_program("p(0). p(X) :- p(Y), X = Y.").unwrap();
        let base = vec![Fact::unary("p", Value::int(0))];
        let limits = EvaluatorLimits {
            max_tuples: 10,
            ..EvaluatorLimits::default()
        };
        let err = evaluate(&program, &base, &limits).unwrap_err();
        assert!(matches!(
            err,
            SonobatError::DatalogResource {
                bound: ResourceBound::MaxTuples
            }
        ));
    }

    #[test]
    fn too_many_rules_is_rejected_before_evaluation() {
        let mut program = Program::default();
        for i in 0..5 {
            program.rules.push(Rule::fact(Atom::new(
                format!("p{i}"),
                vec![Term::Constant(Value::int(i as i64))],
            )));
        }
        let limits = EvaluatorLimits {
            max_rules: 4,
            ..EvaluatorLimits::default()
        };
        let err = evaluate(&program, &[], &limits).unwrap_err();
        assert!(matches!(
            err,
            SonobatError::DatalogResource {
                bound: ResourceBound::MaxRules
            }
        ));
    }

    #[test]
    fn comparison_filters_on_numeric_order() {
        let result = run(
            r#"
            value("a", 3). value("b", 12).
            big(Name) :- value(Name, N), N > 10.
            ?- big(Name).
            "#,
        );
        assert_eq!(result.answers[0].tuples.len(), 1);
        assert_eq!(result.answers[0].tuples[0][0].as_str(), Some("b"));
    }

    #[test]
    fn type_mismatch_in_ordering_comparison_fails_quietly() {
        let result = run(
            r#"
            value("a", "not-a-number").
            big(Name) :- value(Name, N), N > 1.
            ?- big(Name).
            "#,
        );
        assert!(result.answers[0].tuples.is_empty());
    }
}
