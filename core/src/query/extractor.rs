//! Fact extractor (component H): projects the graph store into the closed
//! set of relational predicates the Datalog evaluator consumes.

use crate::facts::Fact;
use crate::graph::{EdgeKind, GraphStore, NodeKind};
use crate::types::Value;

fn prop_str(props: &Value, key: &str) -> String {
    match props {
        Value::Object(map) => map.get(key).and_then(|v| v.as_str()).unwrap_or("").to_string(),
        _ => String::new(),
    }
}

fn prop_number(props: &Value, key: &str) -> Value {
    match props {
        Value::Object(map) => map.get(key).cloned().unwrap_or_else(|| Value::int(0)),
        _ => Value::int(0),
    }
}

fn apply_limit(mut facts: Vec<Fact>, limit: Option<usize>) -> Vec<Fact> {
    if let Some(limit) = limit {
        facts.truncate(limit);
    }
    facts
}

/// Extract every `host(host-id, authority, authority-kind)` fact.
pub fn extract_host(store: &GraphStore, limit: Option<usize>) -> Vec<Fact> {
    let facts = store
        .find_by_kind(NodeKind::Host, None)
        .into_iter()
        .map(|n| {
            let authority = prop_str(&n.props, "authority");
            let kind = if authority.split('.').count() == 4
                && authority.split('.').all(|o| !o.is_empty() && o.chars().all(|c| c.is_ascii_digit()))
            {
                "IP"
            } else {
                "DOMAIN"
            };
            Fact::new("host", vec![Value::string(n.id), Value::string(authority), Value::string(kind)])
        })
        .collect();
    apply_limit(facts, limit)
}

/// Extract every `service(host-id, service-id, transport, port, app-proto, state)` fact.
pub fn extract_service(store: &GraphStore, limit: Option<usize>) -> Vec<Fact> {
    let facts = store
        .find_by_kind(NodeKind::Service, None)
        .into_iter()
        .filter_map(|n| {
            let host_id = n.parent_id.clone()?;
            Some(Fact::new(
                "service",
                vec![
                    Value::string(host_id),
                    Value::string(n.id),
                    Value::string(prop_str(&n.props, "transport")),
                    prop_number(&n.props, "port"),
                    Value::string(prop_str(&n.props, "app_proto")),
                    Value::string(prop_str(&n.props, "state")),
                ],
            ))
        })
        .collect();
    apply_limit(facts, limit)
}

/// Extract every `http_endpoint(service-id, endpoint-id, method, path, status-code)` fact.
pub fn extract_http_endpoint(store: &GraphStore, limit: Option<usize>) -> Vec<Fact> {
    let facts = store
        .find_by_kind(NodeKind::Endpoint, None)
        .into_iter()
        .filter_map(|n| {
            let service_id = n.parent_id.clone()?;
            Some(Fact::new(
                "http_endpoint",
                vec![
                    Value::string(service_id),
                    Value::string(n.id),
                    Value::string(prop_str(&n.props, "method")),
                    Value::string(prop_str(&n.props, "path")),
                    prop_number(&n.props, "status_code"),
                ],
            ))
        })
        .collect();
    apply_limit(facts, limit)
}

/// Extract every `input(service-id, input-id, location, name)` fact.
pub fn extract_input(store: &GraphStore, limit: Option<usize>) -> Vec<Fact> {
    let facts = store
        .find_by_kind(NodeKind::Input, None)
        .into_iter()
        .filter_map(|n| {
            let service_id = n.parent_id.clone()?;
            Some(Fact::new(
                "input",
                vec![
                    Value::string(service_id),
                    Value::string(n.id),
                    Value::string(prop_str(&n.props, "location")),
                    Value::string(prop_str(&n.props, "name")),
                ],
            ))
        })
        .collect();
    apply_limit(facts, limit)
}

/// Extract every `endpoint_input(endpoint-id, input-id)` fact from `ENDPOINT_INPUT` edges.
pub fn extract_endpoint_input(store: &GraphStore, limit: Option<usize>) -> Vec<Fact> {
    let facts = store
        .find_edges_by_kind(EdgeKind::EndpointInput)
        .into_iter()
        .map(|e| Fact::new("endpoint_input", vec![Value::string(e.source), Value::string(e.target)]))
        .collect();
    apply_limit(facts, limit)
}

/// Extract every `observation(input-id, observation-id, raw-value, source, confidence)` fact.
pub fn extract_observation(store: &GraphStore, limit: Option<usize>) -> Vec<Fact> {
    let facts = store
        .find_by_kind(NodeKind::Observation, None)
        .into_iter()
        .filter_map(|n| {
            let input_id = store
                .find_by_target(&n.id)
                .into_iter()
                .find(|e| e.kind == EdgeKind::InputObservation)
                .map(|e| e.source)?;
            Some(Fact::new(
                "observation",
                vec![
                    Value::string(input_id),
                    Value::string(n.id),
                    Value::string(prop_str(&n.props, "raw_value")),
                    Value::string(prop_str(&n.props, "source")),
                    Value::string(prop_str(&n.props, "confidence")),
                ],
            ))
        })
        .collect();
    apply_limit(facts, limit)
}

/// Extract every `credential(service-id, credential-id, username, secret-type, source, confidence)` fact.
pub fn extract_credential(store: &GraphStore, limit: Option<usize>) -> Vec<Fact> {
    let facts = store
        .find_by_kind(NodeKind::Credential, None)
        .into_iter()
        .filter_map(|n| {
            let service_id = n.parent_id.clone()?;
            Some(Fact::new(
                "credential",
                vec![
                    Value::string(service_id),
                    Value::string(n.id),
                    Value::string(prop_str(&n.props, "username")),
                    Value::string(prop_str(&n.props, "secret_type")),
                    Value::string(prop_str(&n.props, "source")),
                    Value::string(prop_str(&n.props, "confidence")),
                ],
            ))
        })
        .collect();
    apply_limit(facts, limit)
}

/// Extract every `vulnerability(service-id, vuln-id, vuln-type, title, severity, confidence)` fact.
pub fn extract_vulnerability(store: &GraphStore, limit: Option<usize>) -> Vec<Fact> {
    let facts = store
        .find_by_kind(NodeKind::Vulnerability, None)
        .into_iter()
        .filter_map(|n| {
            let service_id = store
                .find_by_target(&n.id)
                .into_iter()
                .find(|e| e.kind == EdgeKind::ServiceVulnerability)
                .map(|e| e.source)?;
            Some(Fact::new(
                "vulnerability",
                vec![
                    Value::string(service_id),
                    Value::string(n.id),
                    Value::string(prop_str(&n.props, "vuln_type")),
                    Value::string(prop_str(&n.props, "title")),
                    Value::string(prop_str(&n.props, "severity")),
                    Value::string(prop_str(&n.props, "confidence")),
                ],
            ))
        })
        .collect();
    apply_limit(facts, limit)
}

/// Extract every `vulnerability_endpoint(vuln-id, endpoint-id)` fact, only
/// for vulnerabilities attached to a known endpoint.
pub fn extract_vulnerability_endpoint(store: &GraphStore, limit: Option<usize>) -> Vec<Fact> {
    let facts = store
        .find_edges_by_kind(EdgeKind::EndpointVulnerability)
        .into_iter()
        .map(|e| Fact::new("vulnerability_endpoint", vec![Value::string(e.target), Value::string(e.source)]))
        .collect();
    apply_limit(facts, limit)
}

/// Extract every `cve(vuln-id, cve-id, cvss-score)` fact.
pub fn extract_cve(store: &GraphStore, limit: Option<usize>) -> Vec<Fact> {
    let facts = store
        .find_by_kind(NodeKind::Cve, None)
        .into_iter()
        .filter_map(|n| {
            let vuln_id = n.parent_id.clone()?;
            Some(Fact::new(
                "cve",
                vec![
                    Value::string(vuln_id),
                    Value::string(prop_str(&n.props, "cve_id")),
                    prop_number(&n.props, "cvss_score"),
                ],
            ))
        })
        .collect();
    apply_limit(facts, limit)
}

/// Extract every `vhost(host-id, vhost-id, hostname, source)` fact.
pub fn extract_vhost(store: &GraphStore, limit: Option<usize>) -> Vec<Fact> {
    let facts = store
        .find_by_kind(NodeKind::Vhost, None)
        .into_iter()
        .filter_map(|n| {
            let host_id = n.parent_id.clone()?;
            Some(Fact::new(
                "vhost",
                vec![
                    Value::string(host_id),
                    Value::string(n.id),
                    Value::string(prop_str(&n.props, "hostname")),
                    Value::string(prop_str(&n.props, "source")),
                ],
            ))
        })
        .collect();
    apply_limit(facts, limit)
}

/// All supported predicate names, in the order extracted by
/// [`extract_all`].
pub const PREDICATES: &[&str] = &[
    "host",
    "service",
    "http_endpoint",
    "input",
    "endpoint_input",
    "observation",
    "credential",
    "vulnerability",
    "vulnerability_endpoint",
    "cve",
    "vhost",
];

/// Extract one named predicate's facts, or `None` if the name isn't one of
/// [`PREDICATES`].
pub fn extract_predicate(store: &GraphStore, predicate: &str, limit: Option<usize>) -> Option<Vec<Fact>> {
    match predicate {
        "host" => Some(extract_host(store, limit)),
        "service" => Some(extract_service(store, limit)),
        "http_endpoint" => Some(extract_http_endpoint(store, limit)),
        "input" => Some(extract_input(store, limit)),
        "endpoint_input" => Some(extract_endpoint_input(store, limit)),
        "observation" => Some(extract_observation(store, limit)),
        "credential" => Some(extract_credential(store, limit)),
        "vulnerability" => Some(extract_vulnerability(store, limit)),
        "vulnerability_endpoint" => Some(extract_vulnerability_endpoint(store, limit)),
        "cve" => Some(extract_cve(store, limit)),
        "vhost" => Some(extract_vhost(store, limit)),
        _ => None,
    }
}

/// Extract every predicate's facts into one flat fact base for the
/// evaluator.
pub fn extract_all(store: &GraphStore) -> Vec<Fact> {
    PREDICATES
        .iter()
        .flat_map(|p| extract_predicate(store, p, None).unwrap_or_default())
        .collect()
}
