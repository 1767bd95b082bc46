//! Normalizer (component D): turns a [`ParseResult`] into graph nodes and
//! edges inside one transaction, in a fixed nine-step order.

use super::parse_result::ParseResult;
use crate::error::SonobatError;
use crate::graph::{EdgeKind, GraphStore, NodeKind};
use crate::types::Value;
use std::collections::BTreeMap;
use std::collections::HashMap;

/// Per-entity-kind creation counts from one normalization run. Only newly
/// *created* nodes/edges are counted; upsert hits that merged into an
/// existing node are not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestCounts {
    /// Hosts created.
    pub hosts_created: usize,
    /// Services created.
    pub services_created: usize,
    /// Service-level observations created (always new).
    pub svc_observations_created: usize,
    /// Endpoints created.
    pub endpoints_created: usize,
    /// Inputs created.
    pub inputs_created: usize,
    /// Endpoint-input edges created.
    pub endpoint_input_links_created: usize,
    /// Input-level observations created (always new).
    pub observations_created: usize,
    /// Vulnerabilities created (always new).
    pub vulnerabilities_created: usize,
    /// CVE records created (always new).
    pub cves_created: usize,
}

fn obj(pairs: Vec<(&str, Value)>) -> Value {
    let mut map = BTreeMap::new();
    for (k, v) in pairs {
        map.insert(k.to_string(), v);
    }
    Value::object(map)
}

/// Run the normalization algorithm for one parsed tool output, attributing
/// every created node/edge to `artifact_id`. A failure at any step rolls
/// back the whole transaction.
pub fn normalize(
    store: &GraphStore,
    parsed: &ParseResult,
    artifact_id: &str,
) -> Result<IngestCounts, SonobatError> {
    store.transaction(|txn| {
        let mut counts = IngestCounts::default();

        // 1. Upsert hosts.
        let mut host_ids: HashMap<String, String> = HashMap::new();
        for host in &parsed.hosts {
            let props = obj(vec![("authority", Value::string(&host.authority))]);
            let (node, created) = txn.upsert_node(NodeKind::Host, &props, Some(artifact_id), None)?;
            host_ids.insert(host.authority.clone(), node.id);
            if created {
                counts.hosts_created += 1;
            }
        }

        // 2. Upsert services.
        let mut service_ids: HashMap<(String, String, i64), String> = HashMap::new();
        for svc in &parsed.services {
            let Some(host_id) = host_ids.get(&svc.host_authority).cloned() else {
                continue;
            };
            let props = obj(vec![
                ("transport", Value::string(&svc.transport)),
                ("port", Value::int(svc.port)),
                ("app_proto", Value::string(&svc.app_proto)),
                ("state", Value::string(&svc.state)),
                ("banner", Value::string(&svc.banner)),
                ("confidence", Value::string(&svc.confidence)),
            ]);
            let (node, created) = txn.upsert_node(NodeKind::Service, &props, Some(artifact_id), Some(&host_id))?;
            txn.upsert_edge(EdgeKind::HostService, &host_id, &node.id, Some(artifact_id), None)?;
            service_ids.insert((host_id, svc.transport.clone(), svc.port), node.id);
            if created {
                counts.services_created += 1;
            }
        }

        // 3. Create service observations (always new).
        for obs in &parsed.svc_observations {
            let Some(host_id) = host_ids.get(&obs.host_authority) else {
                continue;
            };
            let Some(service_id) = service_ids
                .get(&(host_id.clone(), obs.transport.clone(), obs.port))
                .cloned()
            else {
                continue;
            };
            let props = obj(vec![
                ("raw_value", Value::string(&obs.raw_value)),
                ("source", Value::string(&obs.source)),
                ("confidence", Value::string(&obs.confidence)),
            ]);
            let node = txn.create_node(NodeKind::SvcObservation, &props, Some(artifact_id), None)?;
            txn.create_edge(EdgeKind::ServiceObservation, &service_id, &node.id, Some(artifact_id), None)?;
            counts.svc_observations_created += 1;
        }

        // 4. Upsert endpoints (HTTP transport assumed tcp).
        let mut endpoint_by_method_path: HashMap<(String, String), String> = HashMap::new();
        for ep in &parsed.endpoints {
            let Some(host_id) = host_ids.get(&ep.host_authority) else {
                continue;
            };
            let Some(service_id) = service_ids.get(&(host_id.clone(), "tcp".to_string(), ep.port)).cloned() else {
                continue;
            };
            let props = obj(vec![
                ("method", Value::string(&ep.method)),
                ("path", Value::string(&ep.path)),
                ("status_code", Value::int(ep.status_code)),
            ]);
            let (node, created) = txn.upsert_node(NodeKind::Endpoint, &props, Some(artifact_id), Some(&service_id))?;
            txn.upsert_edge(EdgeKind::ServiceEndpoint, &service_id, &node.id, Some(artifact_id), None)?;
            endpoint_by_method_path
                .entry((ep.method.clone(), ep.path.clone()))
                .or_insert(node.id.clone());
            if created {
                counts.endpoints_created += 1;
            }
        }

        // 5. Upsert inputs.
        let mut input_by_location_name: HashMap<(String, String), String> = HashMap::new();
        for input in &parsed.inputs {
            let Some(host_id) = host_ids.get(&input.host_authority) else {
                continue;
            };
            let Some(service_id) = service_ids
                .get(&(host_id.clone(), input.transport.clone(), input.port))
                .cloned()
            else {
                continue;
            };
            let props = obj(vec![
                ("location", Value::string(&input.location)),
                ("name", Value::string(&input.name)),
            ]);
            let (node, created) = txn.upsert_node(NodeKind::Input, &props, Some(artifact_id), Some(&service_id))?;
            txn.upsert_edge(EdgeKind::ServiceInput, &service_id, &node.id, Some(artifact_id), None)?;
            input_by_location_name
                .entry((input.location.clone(), input.name.clone()))
                .or_insert(node.id.clone());
            if created {
                counts.inputs_created += 1;
            }
        }

        // 6. Upsert endpoint-input edges, idempotent on the composite key.
        for link in &parsed.endpoint_input_links {
            let endpoint_id = endpoint_by_method_path.get(&(link.method.clone(), link.path.clone()));
            let input_id = input_by_location_name.get(&(link.location.clone(), link.name.clone()));
            if let (Some(endpoint_id), Some(input_id)) = (endpoint_id, input_id) {
                let (_, created) = txn.upsert_edge(EdgeKind::EndpointInput, endpoint_id, input_id, Some(artifact_id), None)?;
                if created {
                    counts.endpoint_input_links_created += 1;
                }
            }
        }

        // 7. Create observations (always new), attach via INPUT_OBSERVATION.
        for obs in &parsed.observations {
            let Some(input_id) = input_by_location_name.get(&(obs.location.clone(), obs.name.clone())) else {
                continue;
            };
            let props = obj(vec![
                ("raw_value", Value::string(&obs.raw_value)),
                ("source", Value::string(&obs.source)),
                ("confidence", Value::string(&obs.confidence)),
            ]);
            let node = txn.create_node(NodeKind::Observation, &props, Some(artifact_id), None)?;
            txn.create_edge(EdgeKind::InputObservation, input_id, &node.id, Some(artifact_id), None)?;
            counts.observations_created += 1;
        }

        // 8. Create vulnerabilities (always new); attach SERVICE_VULNERABILITY and,
        // when the method+path resolve to a known endpoint, ENDPOINT_VULNERABILITY.
        let mut vuln_ids_by_title: HashMap<String, String> = HashMap::new();
        for vuln in &parsed.vulnerabilities {
            let Some(host_id) = host_ids.get(&vuln.host_authority) else {
                continue;
            };
            let Some(service_id) = service_ids
                .get(&(host_id.clone(), vuln.transport.clone(), vuln.port))
                .cloned()
            else {
                continue;
            };
            let props = obj(vec![
                ("vuln_type", Value::string(&vuln.vuln_type)),
                ("title", Value::string(&vuln.title)),
                ("severity", Value::string(&vuln.severity)),
                ("confidence", Value::string(&vuln.confidence)),
            ]);
            let node = txn.create_node(NodeKind::Vulnerability, &props, Some(artifact_id), None)?;
            txn.create_edge(EdgeKind::ServiceVulnerability, &service_id, &node.id, Some(artifact_id), None)?;

            if let (Some(method), Some(path)) = (&vuln.method, &vuln.path) {
                if let Some(endpoint_id) = endpoint_by_method_path.get(&(method.clone(), path.clone())) {
                    txn.create_edge(EdgeKind::EndpointVulnerability, endpoint_id, &node.id, Some(artifact_id), None)?;
                }
            }

            vuln_ids_by_title.insert(vuln.title.clone(), node.id.clone());
            counts.vulnerabilities_created += 1;
        }

        // 9. Create CVEs, resolving parent vulnerability by title.
        for cve in &parsed.cves {
            let Some(vuln_id) = vuln_ids_by_title.get(&cve.vuln_title).cloned() else {
                continue;
            };
            let props = obj(vec![
                ("cve_id", Value::string(&cve.cve_id)),
                ("cvss_score", cve.cvss_score.map(|s| Value::Number(s)).unwrap_or_else(|| Value::int(0))),
            ]);
            let node = txn.create_node(NodeKind::Cve, &props, Some(artifact_id), Some(&vuln_id))?;
            txn.create_edge(EdgeKind::VulnerabilityCve, &vuln_id, &node.id, Some(artifact_id), None)?;
            counts.cves_created += 1;
        }

        Ok(counts)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::parse_result::{
        CveRecord, EndpointInputLink, EndpointRecord, HostRecord, InputRecord, ObservationRecord,
        ServiceRecord, SvcObservationRecord, VulnerabilityRecord,
    };

    fn sample() -> ParseResult {
        ParseResult {
            hosts: vec![HostRecord { authority: "10.0.0.1".into() }],
            services: vec![ServiceRecord {
                host_authority: "10.0.0.1".into(),
                transport: "tcp".into(),
                port: 443,
                app_proto: "https".into(),
                state: "open".into(),
                banner: "nginx".into(),
                confidence: "high".into(),
            }],
            svc_observations: vec![SvcObservationRecord {
                host_authority: "10.0.0.1".into(),
                transport: "tcp".into(),
                port: 443,
                raw_value: "Linux 5.X".into(),
                source: "nmap".into(),
                confidence: "high".into(),
            }],
            endpoints: vec![EndpointRecord {
                host_authority: "10.0.0.1".into(),
                transport: "tcp".into(),
                port: 443,
                method: "GET".into(),
                path: "/admin".into(),
                status_code: 200,
            }],
            inputs: vec![InputRecord {
                host_authority: "10.0.0.1".into(),
                transport: "tcp".into(),
                port: 443,
                location: "query".into(),
                name: "id".into(),
            }],
            endpoint_input_links: vec![EndpointInputLink {
                method: "GET".into(),
                path: "/admin".into(),
                location: "query".into(),
                name: "id".into(),
            }],
            observations: vec![ObservationRecord {
                location: "query".into(),
                name: "id".into(),
                raw_value: "1".into(),
                source: "ffuf".into(),
                confidence: "medium".into(),
            }],
            vulnerabilities: vec![VulnerabilityRecord {
                host_authority: "10.0.0.1".into(),
                transport: "tcp".into(),
                port: 443,
                method: Some("GET".into()),
                path: Some("/admin".into()),
                vuln_type: "sqli".into(),
                title: "SQL injection in /admin".into(),
                severity: "high".into(),
                confidence: "high".into(),
            }],
            cves: vec![CveRecord {
                vuln_title: "SQL injection in /admin".into(),
                cve_id: "CVE-2024-0001".into(),
                cvss_score: None,
            }],
        }
    }

    #[test]
    fn full_pipeline_creates_every_entity_kind_once() {
        let store = GraphStore::new();
        let counts = normalize(&store, &sample(), "artifact-1").unwrap();
        assert_eq!(counts.hosts_created, 1);
        assert_eq!(counts.services_created, 1);
        assert_eq!(counts.svc_observations_created, 1);
        assert_eq!(counts.endpoints_created, 1);
        assert_eq!(counts.inputs_created, 1);
        assert_eq!(counts.endpoint_input_links_created, 1);
        assert_eq!(counts.observations_created, 1);
        assert_eq!(counts.vulnerabilities_created, 1);
        assert_eq!(counts.cves_created, 1);
    }

    #[test]
    fn vulnerability_gets_both_service_and_endpoint_edges() {
        let store = GraphStore::new();
        normalize(&store, &sample(), "artifact-1").unwrap();
        let vuln = store.find_by_kind(NodeKind::Vulnerability, None).into_iter().next().unwrap();
        let incoming: Vec<_> = store.find_by_target(&vuln.id);
        let kinds: Vec<EdgeKind> = incoming.iter().map(|e| e.kind).collect();
        assert!(kinds.contains(&EdgeKind::ServiceVulnerability));
        assert!(kinds.contains(&EdgeKind::EndpointVulnerability));
    }

    #[test]
    fn ingesting_twice_doubles_only_always_create_kinds() {
        let store = GraphStore::new();
        normalize(&store, &sample(), "artifact-1").unwrap();
        normalize(&store, &sample(), "artifact-2").unwrap();

        assert_eq!(store.find_by_kind(NodeKind::Host, None).len(), 1);
        assert_eq!(store.find_by_kind(NodeKind::Service, None).len(), 1);
        assert_eq!(store.find_by_kind(NodeKind::Endpoint, None).len(), 1);
        assert_eq!(store.find_by_kind(NodeKind::Input, None).len(), 1);
        assert_eq!(store.find_by_kind(NodeKind::SvcObservation, None).len(), 2);
        assert_eq!(store.find_by_kind(NodeKind::Observation, None).len(), 2);
        assert_eq!(store.find_by_kind(NodeKind::Vulnerability, None).len(), 2);
        assert_eq!(store.find_by_kind(NodeKind::Cve, None).len(), 2);
    }

    #[test]
    fn service_with_unknown_host_is_skipped_without_failing_the_transaction() {
        let store = GraphStore::new();
        let mut parsed = sample();
        parsed.services[0].host_authority = "10.0.0.9".into();
        let counts = normalize(&store, &parsed, "artifact-1").unwrap();
        assert_eq!(counts.services_created, 0);
        assert_eq!(counts.hosts_created, 1);
    }
}
