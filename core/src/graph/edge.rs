//! Edge type and kind enumeration.

use crate::types::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The fixed enumeration of edge kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// host -> service
    HostService,
    /// service -> endpoint
    ServiceEndpoint,
    /// service -> input
    ServiceInput,
    /// endpoint -> input
    EndpointInput,
    /// input -> observation
    InputObservation,
    /// service -> vulnerability
    ServiceVulnerability,
    /// endpoint -> vulnerability
    EndpointVulnerability,
    /// vulnerability -> cve
    VulnerabilityCve,
    /// service -> svc_observation
    ServiceObservation,
}

impl EdgeKind {
    /// The upper-snake-case wire name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::HostService => "HOST_SERVICE",
            EdgeKind::ServiceEndpoint => "SERVICE_ENDPOINT",
            EdgeKind::ServiceInput => "SERVICE_INPUT",
            EdgeKind::EndpointInput => "ENDPOINT_INPUT",
            EdgeKind::InputObservation => "INPUT_OBSERVATION",
            EdgeKind::ServiceVulnerability => "SERVICE_VULNERABILITY",
            EdgeKind::EndpointVulnerability => "ENDPOINT_VULNERABILITY",
            EdgeKind::VulnerabilityCve => "VULNERABILITY_CVE",
            EdgeKind::ServiceObservation => "SERVICE_OBSERVATION",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A directed, labeled edge between two nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Stable surrogate identifier.
    pub id: String,
    /// Kind discriminant.
    pub kind: EdgeKind,
    /// Source node id.
    pub source: String,
    /// Target node id.
    pub target: String,
    /// Optional free-form properties.
    pub props: Option<Value>,
    /// Optional id of the artifact this edge's evidence came from.
    pub evidence_artifact_id: Option<String>,
    /// Creation timestamp, Unix seconds.
    pub created_at: i64,
}

impl Edge {
    /// The `(kind, source, target)` triple an upsert is idempotent on.
    pub fn identity(&self) -> (EdgeKind, &str, &str) {
        (self.kind, &self.source, &self.target)
    }
}
