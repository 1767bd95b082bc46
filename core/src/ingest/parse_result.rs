//! The uniform intermediate shape all three tool-output parsers produce.
//!
//! A `ParseResult` references its entities by natural identifiers
//! (authority, transport+port, method+path, ...) rather than graph node
//! ids, since nodes don't exist yet until the normalizer upserts them.

use rust_decimal::Decimal;

/// A host discovered by a parser.
#[derive(Debug, Clone)]
pub struct HostRecord {
    /// The host's address or name.
    pub authority: String,
}

/// A network service discovered on a host.
#[derive(Debug, Clone)]
pub struct ServiceRecord {
    /// Owning host authority.
    pub host_authority: String,
    /// `"tcp"` or `"udp"`.
    pub transport: String,
    /// Port number.
    pub port: i64,
    /// Normalized application protocol.
    pub app_proto: String,
    /// Port state (`"open"`, ...).
    pub state: String,
    /// Synthesized banner, may be empty.
    pub banner: String,
    /// `"low" | "medium" | "high"`.
    pub confidence: String,
}

/// An observation attached to a service rather than an input (e.g. an OS
/// match).
#[derive(Debug, Clone)]
pub struct SvcObservationRecord {
    /// Owning host authority.
    pub host_authority: String,
    /// Owning service transport.
    pub transport: String,
    /// Owning service port.
    pub port: i64,
    /// The raw observed value.
    pub raw_value: String,
    /// Observation source (tool name).
    pub source: String,
    /// `"low" | "medium" | "high"`.
    pub confidence: String,
}

/// An HTTP endpoint discovered on a service.
#[derive(Debug, Clone)]
pub struct EndpointRecord {
    /// Owning host authority.
    pub host_authority: String,
    /// Owning service transport (always `"tcp"` for HTTP).
    pub transport: String,
    /// Owning service port.
    pub port: i64,
    /// HTTP method.
    pub method: String,
    /// URL path.
    pub path: String,
    /// HTTP status code, 0 if unknown.
    pub status_code: i64,
}

/// A fuzzable input discovered on a service.
#[derive(Debug, Clone)]
pub struct InputRecord {
    /// Owning host authority.
    pub host_authority: String,
    /// Owning service transport.
    pub transport: String,
    /// Owning service port.
    pub port: i64,
    /// `"query" | "body" | "header" | "path" | "cookie"`.
    pub location: String,
    /// Parameter name.
    pub name: String,
}

/// A link between an endpoint and one of its inputs.
#[derive(Debug, Clone)]
pub struct EndpointInputLink {
    /// Endpoint method.
    pub method: String,
    /// Endpoint path.
    pub path: String,
    /// Input location.
    pub location: String,
    /// Input name.
    pub name: String,
}

/// An observation attached to an input (a fuzzer result value).
#[derive(Debug, Clone)]
pub struct ObservationRecord {
    /// Owning input's location.
    pub location: String,
    /// Owning input's name.
    pub name: String,
    /// The raw observed value.
    pub raw_value: String,
    /// Observation source (tool name).
    pub source: String,
    /// `"low" | "medium" | "high"`.
    pub confidence: String,
}

/// A discovered vulnerability.
#[derive(Debug, Clone)]
pub struct VulnerabilityRecord {
    /// Owning host authority.
    pub host_authority: String,
    /// Owning service transport.
    pub transport: String,
    /// Owning service port.
    pub port: i64,
    /// Method of the endpoint this vulnerability was found on, if any.
    pub method: Option<String>,
    /// Path of the endpoint this vulnerability was found on, if any.
    pub path: Option<String>,
    /// `sqli | xss | rce | lfi | ssrf | other`.
    pub vuln_type: String,
    /// Human-readable title, used as the dedup key for attaching CVEs.
    pub title: String,
    /// Severity string as reported by the tool.
    pub severity: String,
    /// `"low" | "medium" | "high"`.
    pub confidence: String,
}

/// A CVE record attached to a vulnerability by title.
#[derive(Debug, Clone)]
pub struct CveRecord {
    /// Title of the owning vulnerability.
    pub vuln_title: String,
    /// CVE identifier, e.g. `CVE-2021-12345`.
    pub cve_id: String,
    /// CVSS score, if the finding carried one.
    pub cvss_score: Option<Decimal>,
}

/// The uniform output every tool-output parser produces.
#[derive(Debug, Clone, Default)]
pub struct ParseResult {
    /// Discovered hosts.
    pub hosts: Vec<HostRecord>,
    /// Discovered services.
    pub services: Vec<ServiceRecord>,
    /// Discovered service-level observations.
    pub svc_observations: Vec<SvcObservationRecord>,
    /// Discovered endpoints.
    pub endpoints: Vec<EndpointRecord>,
    /// Discovered inputs.
    pub inputs: Vec<InputRecord>,
    /// Discovered endpoint-input links.
    pub endpoint_input_links: Vec<EndpointInputLink>,
    /// Discovered input-level observations.
    pub observations: Vec<ObservationRecord>,
    /// Discovered vulnerabilities.
    pub vulnerabilities: Vec<VulnerabilityRecord>,
    /// Discovered CVE records.
    pub cves: Vec<CveRecord>,
}
