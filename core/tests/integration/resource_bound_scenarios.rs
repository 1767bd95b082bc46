//! S7: a non-terminating-looking recursion hits the tuple bound rather than
//! running away.

use sonobat_core::datalog::{evaluate, parse_program, EvaluatorLimits};
use sonobat_core::error::{ResourceBound, SonobatError};
use sonobat_core::facts::Fact;
use sonobat_core::types::Value;

// The fact base already carries 10 unrelated tuples (standing in for facts
// extracted from a large graph); the program seeds exactly one more (`p(0)`)
// via its recursive rule, pushing the accumulated relation over a
// `maxTuples` of 10.
#[test]
fn s7_resource_bound_on_tuple_count() {
    let base_facts: Vec<Fact> = (0..10).map(|i| Fact::new("other", vec![Value::int(i)])).collect();
    let source = "p(0).\np(X) :- p(Y), X = Y.\n?- p(X).\n";
    let program = parse_program(source).unwrap();
    let limits = EvaluatorLimits {
        max_tuples: 10,
        ..EvaluatorLimits::default()
    };
    let err = evaluate(&program, &base_facts, &limits).unwrap_err();
    match err {
        SonobatError::DatalogResource { bound } => assert_eq!(bound, ResourceBound::MaxTuples),
        other => panic!("expected DatalogResource, got {other:?}"),
    }
}
