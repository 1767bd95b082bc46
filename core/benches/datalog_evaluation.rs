//! Benchmarks semi-naive evaluation over a synthetic host/service/endpoint
//! graph extracted into facts.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use sonobat_core::datalog::{evaluate, parse_program, EvaluatorLimits};
use sonobat_core::graph::{EdgeKind, GraphStore, NodeKind};
use sonobat_core::query::extractor::extract_all;
use sonobat_core::types::Value;
use std::collections::BTreeMap;

fn obj(pairs: Vec<(&str, Value)>) -> Value {
    let mut m = BTreeMap::new();
    for (k, v) in pairs {
        m.insert(k.to_string(), v);
    }
    Value::object(m)
}

fn synthetic_graph(host_count: usize) -> GraphStore {
    let store = GraphStore::new();
    for i in 0..host_count {
        let host = store
            .create_node(NodeKind::Host, &obj(vec![("authority", Value::string(format!("10.0.{}.1", i)))]), None, None)
            .unwrap();
        let (service, _) = store
            .upsert_node(
                NodeKind::Service,
                &obj(vec![
                    ("transport", Value::string("tcp")),
                    ("port", Value::int(80)),
                    ("app_proto", Value::string("http")),
                    ("state", Value::string("open")),
                ]),
                None,
                Some(&host.id),
            )
            .unwrap();
        store.create_edge(EdgeKind::HostService, &host.id, &service.id, None, None).unwrap();

        let (endpoint, _) = store
            .upsert_node(
                NodeKind::Endpoint,
                &obj(vec![
                    ("method", Value::string("GET")),
                    ("path", Value::string("/")),
                    ("status_code", Value::int(200)),
                ]),
                None,
                Some(&service.id),
            )
            .unwrap();
        store.create_edge(EdgeKind::ServiceEndpoint, &service.id, &endpoint.id, None, None).unwrap();
    }
    store
}

fn bench_semi_naive(c: &mut Criterion) {
    let program = parse_program(
        "surface(S,E) :- service(_,S,_,_,_,\"open\"), http_endpoint(S,E,_,_,_).\n?- surface(S,E).\n",
    )
    .unwrap();
    let limits = EvaluatorLimits::default();

    let mut group = c.benchmark_group("semi_naive_evaluation");
    for host_count in [10usize, 100, 500] {
        let store = synthetic_graph(host_count);
        let facts = extract_all(&store);
        group.bench_with_input(BenchmarkId::from_parameter(host_count), &facts, |b, facts| {
            b.iter(|| evaluate(&program, facts, &limits).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_semi_naive);
criterion_main!(benches);
