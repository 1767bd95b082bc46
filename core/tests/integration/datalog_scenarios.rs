//! S1-S4: evaluator quiescence, transitive closure, stratified negation,
//! unsafe-rule rejection.

use sonobat_core::datalog::{evaluate, parse_program, EvaluatorLimits};
use sonobat_core::error::SonobatError;

#[test]
fn s1_empty_graph_evaluator_quiescence() {
    let program = parse_program("?- host(I,A,K).").unwrap();
    let result = evaluate(&program, &[], &EvaluatorLimits::default()).unwrap();
    assert_eq!(result.answers.len(), 1);
    assert!(result.answers[0].tuples.is_empty());
    assert!(result.stats.iterations <= 1);
}

#[test]
fn s2_ancestor_transitive_closure() {
    let source = r#"
        parent("alice","bob"). parent("bob","carol").
        ancestor(X,Y) :- parent(X,Y).
        ancestor(X,Z) :- parent(X,Y), ancestor(Y,Z).
        ?- ancestor(X,"carol").
    "#;
    let program = parse_program(source).unwrap();
    let result = evaluate(&program, &[], &EvaluatorLimits::default()).unwrap();
    let mut names: Vec<String> = result.answers[0]
        .tuples
        .iter()
        .map(|t| t[0].to_string())
        .collect();
    names.sort();
    assert_eq!(names, vec!["alice".to_string(), "bob".to_string()]);
}

#[test]
fn s3_stratified_negation() {
    let source = r#"
        node("a"). node("b"). danger("b").
        safe(X) :- node(X), not danger(X).
        ?- safe(X).
    "#;
    let program = parse_program(source).unwrap();
    let result = evaluate(&program, &[], &EvaluatorLimits::default()).unwrap();
    let names: Vec<String> = result.answers[0].tuples.iter().map(|t| t[0].to_string()).collect();
    assert_eq!(names, vec!["a".to_string()]);
}

#[test]
fn s4_unsafe_rule_rejected() {
    let err = parse_program("bad(X,Y) :- thing(X).").unwrap_err();
    match err {
        SonobatError::DatalogSafety { variable, predicate } => {
            assert_eq!(variable, "Y");
            assert_eq!(predicate, "bad");
        }
        other => panic!("expected DatalogSafety, got {other:?}"),
    }
}

#[test]
fn invariant_monotone_derivation_produces_a_superset_each_iteration() {
    let source = "edge(\"a\",\"b\"). edge(\"b\",\"c\").\nreach(X,Y) :- edge(X,Y).\nreach(X,Z) :- edge(X,Y), reach(Y,Z).\n?- reach(X,Y).\n";
    let program = parse_program(source).unwrap();
    let result = evaluate(&program, &[], &EvaluatorLimits::default()).unwrap();
    assert_eq!(result.answers[0].tuples.len(), 3);
}
