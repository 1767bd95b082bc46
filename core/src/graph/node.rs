//! Node type and kind enumeration.

use crate::types::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The fixed enumeration of node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A scanned host, identified by IP authority.
    Host,
    /// A network service on a host.
    Service,
    /// An HTTP endpoint on a service.
    Endpoint,
    /// A fuzzable input (query/body/header/path/cookie parameter).
    Input,
    /// An observation attached to an input (a fuzzer result value).
    Observation,
    /// An observation attached to a service (e.g. an OS match).
    SvcObservation,
    /// A discovered vulnerability.
    Vulnerability,
    /// A CVE record attached to a vulnerability.
    Cve,
    /// A virtual host discovered on a service.
    Vhost,
    /// An ingested tool-output artifact.
    Artifact,
    /// A discovered credential (username plus secret material or type).
    Credential,
}

impl NodeKind {
    /// All node kinds.
    pub const ALL: [NodeKind; 11] = [
        NodeKind::Host,
        NodeKind::Service,
        NodeKind::Endpoint,
        NodeKind::Input,
        NodeKind::Observation,
        NodeKind::SvcObservation,
        NodeKind::Vulnerability,
        NodeKind::Cve,
        NodeKind::Vhost,
        NodeKind::Artifact,
        NodeKind::Credential,
    ];

    /// The lowercase wire name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Host => "host",
            NodeKind::Service => "service",
            NodeKind::Endpoint => "endpoint",
            NodeKind::Input => "input",
            NodeKind::Observation => "observation",
            NodeKind::SvcObservation => "svc_observation",
            NodeKind::Vulnerability => "vulnerability",
            NodeKind::Cve => "cve",
            NodeKind::Vhost => "vhost",
            NodeKind::Artifact => "artifact",
            NodeKind::Credential => "credential",
        }
    }

    /// Kinds whose natural key is derived from a fresh UUID and therefore
    /// never merge on upsert.
    pub fn always_creates(&self) -> bool {
        matches!(
            self,
            NodeKind::Observation
                | NodeKind::SvcObservation
                | NodeKind::Vulnerability
                | NodeKind::Credential
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A node in the attack-surface graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Stable surrogate identifier.
    pub id: String,
    /// Kind discriminant.
    pub kind: NodeKind,
    /// Deterministic identity key; unique across all nodes.
    pub natural_key: String,
    /// Canonical, schema-validated property bag.
    pub props: Value,
    /// Optional id of the artifact this node's evidence came from.
    pub evidence_artifact_id: Option<String>,
    /// Optional parent node id, used by natural-key construction for
    /// child kinds (service/endpoint/input/vhost/cve).
    pub parent_id: Option<String>,
    /// Creation timestamp, Unix seconds.
    pub created_at: i64,
    /// Last-modified timestamp, Unix seconds. Always `>= created_at`.
    pub modified_at: i64,
}
