//! Ingestion facade (component J): digest, record the artifact, invoke the
//! right parser, then the normalizer.

use super::normalizer::{self, IngestCounts};
use super::{ffuf, nmap, nuclei};
use crate::error::SonobatError;
use crate::graph::{GraphStore, NodeKind};
use crate::types::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Which tool produced the bytes being ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    /// Port-scan XML.
    Nmap,
    /// Fuzzer JSON.
    Ffuf,
    /// Vulnerability-scanner JSONL.
    Nuclei,
}

impl Tool {
    /// Parse a tool name as used by the `ingest` RPC (`"nmap" | "ffuf" | "nuclei"`).
    pub fn parse(name: &str) -> Option<Tool> {
        match name {
            "nmap" => Some(Tool::Nmap),
            "ffuf" => Some(Tool::Ffuf),
            "nuclei" => Some(Tool::Nuclei),
            _ => None,
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tool::Nmap => "nmap",
            Tool::Ffuf => "ffuf",
            Tool::Nuclei => "nuclei",
        };
        write!(f, "{s}")
    }
}

/// Result of one `ingest` call: the artifact node id plus per-kind creation
/// counts from the normalizer.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// Id of the artifact node recording this ingestion.
    pub artifact_id: String,
    /// Per-kind creation counts.
    pub counts: IngestCounts,
}

/// Ingest raw tool-output bytes: computes a SHA-256 digest, upserts the
/// artifact node (content-addressed, so identical bytes re-ingest onto
/// the same artifact), parses with the matching parser, then normalizes.
#[tracing::instrument(skip(store, contents), fields(tool = %tool, path))]
pub fn ingest(
    store: &GraphStore,
    tool: Tool,
    path: &str,
    contents: &[u8],
) -> Result<IngestOutcome, SonobatError> {
    let start = std::time::Instant::now();
    let result = ingest_inner(store, tool, path, contents);
    let elapsed_ms = start.elapsed().as_millis() as u64;
    match &result {
        Ok(outcome) => {
            let nodes_created = outcome.counts.hosts_created
                + outcome.counts.services_created
                + outcome.counts.endpoints_created
                + outcome.counts.inputs_created
                + outcome.counts.observations_created
                + outcome.counts.svc_observations_created
                + outcome.counts.vulnerabilities_created
                + outcome.counts.cves_created;
            crate::monitoring::metrics::record_ingestion(
                &tool.to_string(),
                nodes_created,
                outcome.counts.endpoint_input_links_created,
                elapsed_ms,
            );
        }
        Err(_) => crate::monitoring::metrics::record_ingestion(&tool.to_string(), 0, 0, elapsed_ms),
    }
    result
}

fn ingest_inner(
    store: &GraphStore,
    tool: Tool,
    path: &str,
    contents: &[u8],
) -> Result<IngestOutcome, SonobatError> {
    let digest = Sha256::digest(contents);
    let sha256 = hex_encode(&digest);

    let text = std::str::from_utf8(contents)
        .map_err(|e| SonobatError::ParseFormat(format!("artifact is not valid UTF-8: {e}")))?;

    let parsed = match tool {
        Tool::Nmap => nmap::parse(text)?,
        Tool::Ffuf => ffuf::parse(text)?,
        Tool::Nuclei => nuclei::parse(text)?,
    };

    let mut props = BTreeMap::new();
    props.insert("sha256".to_string(), Value::string(&sha256));
    props.insert("tool".to_string(), Value::string(tool.to_string()));
    props.insert("path".to_string(), Value::string(path));
    let (artifact, _) = store.upsert_node(NodeKind::Artifact, &Value::object(props), None, None)?;

    let counts = normalizer::normalize(store, &parsed, &artifact.id)?;

    Ok(IngestOutcome {
        artifact_id: artifact.id,
        counts,
    })
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        write!(s, "{b:02x}").expect("writing to a String never fails");
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    const NMAP_SAMPLE: &str = r#"
        <nmaprun>
          <host>
            <address addr="10.0.0.1" addrtype="ipv4"/>
            <ports>
              <port protocol="tcp" portid="22">
                <state state="open"/>
                <service name="ssh" conf="10"/>
              </port>
            </ports>
          </host>
        </nmaprun>
    "#;

    #[test]
    fn unknown_tool_name_does_not_parse() {
        assert!(Tool::parse("dirbuster").is_none());
    }

    #[test]
    fn ingest_records_artifact_and_normalizes() {
        let store = GraphStore::new();
        let outcome = ingest(&store, Tool::Nmap, "scan.xml", NMAP_SAMPLE.as_bytes()).unwrap();
        assert_eq!(outcome.counts.hosts_created, 1);
        assert_eq!(outcome.counts.services_created, 1);
        assert!(store.find_by_id(&outcome.artifact_id).is_some());
    }

    #[test]
    fn reingesting_identical_bytes_reuses_the_artifact_node() {
        let store = GraphStore::new();
        let first = ingest(&store, Tool::Nmap, "scan.xml", NMAP_SAMPLE.as_bytes()).unwrap();
        let second = ingest(&store, Tool::Nmap, "scan.xml", NMAP_SAMPLE.as_bytes()).unwrap();
        assert_eq!(first.artifact_id, second.artifact_id);
        assert_eq!(store.find_by_kind(NodeKind::Artifact, None).len(), 1);
    }
}
