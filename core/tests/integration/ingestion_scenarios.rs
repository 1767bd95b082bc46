//! S5-S6 plus the idempotent-ingestion and natural-key-uniqueness
//! invariants.

use sonobat_core::graph::{GraphStore, NodeKind};
use sonobat_core::ingest::{ingest, Tool};
use sonobat_core::types::Value;

fn prop_str(props: &Value, key: &str) -> Option<String> {
    match props {
        Value::Object(map) => map.get(key).and_then(|v| v.as_str()).map(str::to_string),
        _ => None,
    }
}

const FFUF_SAMPLE: &str = r#"{
    "commandline": "ffuf -u http://10.0.0.1/FUZZ -w words.txt",
    "config": {"url": "http://10.0.0.1/admin", "method": "GET"},
    "results": [
        {"url": "http://10.0.0.1/admin?id=1", "status": 200},
        {"url": "http://10.0.0.1/admin?id=2", "status": 200}
    ]
}"#;

#[test]
fn s5_fuzzer_json_ingestion_dedup() {
    let store = GraphStore::new();
    let outcome = ingest(&store, Tool::Ffuf, "fuzz.json", FFUF_SAMPLE.as_bytes()).unwrap();

    assert_eq!(outcome.counts.hosts_created, 1);
    assert_eq!(outcome.counts.services_created, 1);
    assert_eq!(outcome.counts.endpoints_created, 1);
    assert_eq!(outcome.counts.inputs_created, 1);
    assert_eq!(outcome.counts.observations_created, 2);
    assert_eq!(outcome.counts.endpoint_input_links_created, 1);

    let service = &store.find_by_kind(NodeKind::Service, None)[0];
    assert_eq!(prop_str(&service.props, "app_proto"), Some("http".to_string()));
}

const NUCLEI_TRAVERSAL_SAMPLE: &str = r#"{"ip": "10.0.0.1", "port": 80, "matched-at": "http://10.0.0.1:80/%2e%2e/etc/passwd", "info": {"name": "path traversal", "severity": "high", "tags": ["lfi"]}}"#;

#[test]
fn s6_vulnerability_scanner_raw_path_preservation() {
    let store = GraphStore::new();
    ingest(&store, Tool::Nuclei, "scan.jsonl", NUCLEI_TRAVERSAL_SAMPLE.as_bytes()).unwrap();

    let endpoints = store.find_by_kind(NodeKind::Endpoint, None);
    assert_eq!(endpoints.len(), 1);
    assert_eq!(prop_str(&endpoints[0].props, "path"), Some("/%2e%2e/etc/passwd".to_string()));
}

#[test]
fn invariant_idempotent_ingestion_doubles_only_always_create_kinds() {
    let store = GraphStore::new();
    ingest(&store, Tool::Ffuf, "fuzz.json", FFUF_SAMPLE.as_bytes()).unwrap();
    ingest(&store, Tool::Ffuf, "fuzz.json", FFUF_SAMPLE.as_bytes()).unwrap();

    assert_eq!(store.find_by_kind(NodeKind::Host, None).len(), 1);
    assert_eq!(store.find_by_kind(NodeKind::Service, None).len(), 1);
    assert_eq!(store.find_by_kind(NodeKind::Endpoint, None).len(), 1);
    assert_eq!(store.find_by_kind(NodeKind::Input, None).len(), 1);
    assert_eq!(store.find_by_kind(NodeKind::Observation, None).len(), 4);
}

#[test]
fn invariant_natural_key_uniqueness_under_concurrent_style_upserts() {
    let store = GraphStore::new();
    for _ in 0..5 {
        ingest(&store, Tool::Ffuf, "fuzz.json", FFUF_SAMPLE.as_bytes()).unwrap();
    }
    let hosts = store.find_by_kind(NodeKind::Host, None);
    let mut keys: Vec<&str> = hosts.iter().map(|n| n.natural_key.as_str()).collect();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), hosts.len());
}
