//! Fuzzer JSON parser (component C).

use super::parse_result::{
    EndpointInputLink, EndpointRecord, HostRecord, InputRecord, ObservationRecord, ParseResult,
    ServiceRecord,
};
use crate::error::SonobatError;
use serde::Deserialize;
use std::collections::HashSet;

#[derive(Debug, Deserialize)]
struct FfufRoot {
    commandline: String,
    config: FfufConfig,
    results: Vec<FfufResult>,
}

#[derive(Debug, Deserialize)]
struct FfufConfig {
    url: String,
    method: String,
}

#[derive(Debug, Deserialize)]
struct FfufResult {
    #[serde(default)]
    url: String,
    #[serde(default)]
    status: i64,
}

struct SplitUrl {
    scheme: String,
    host: String,
    port: i64,
    pathname: String,
    query: String,
}

fn split_url(url: &str) -> Option<SplitUrl> {
    let (scheme, rest) = url.split_once("://")?;
    let path_start = rest.find('/').unwrap_or(rest.len());
    let authority = &rest[..path_start];
    let path_and_query = &rest[path_start..];

    let (host, port) = match authority.split_once(':') {
        Some((h, p)) => (h.to_string(), p.parse().ok()),
        None => (authority.to_string(), None),
    };
    let port = port.unwrap_or(if scheme == "https" { 443 } else { 80 });

    let (pathname, query) = match path_and_query.split_once('?') {
        Some((p, q)) => (p.to_string(), q.to_string()),
        None => (if path_and_query.is_empty() { "/".to_string() } else { path_and_query.to_string() }, String::new()),
    };

    Some(SplitUrl {
        scheme: scheme.to_string(),
        host,
        port,
        pathname,
        query,
    })
}

fn parse_query_params(query: &str) -> Vec<(String, String)> {
    if query.is_empty() {
        return Vec::new();
    }
    query
        .split('&')
        .filter_map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            if k.is_empty() {
                None
            } else {
                Some((k.to_string(), v.to_string()))
            }
        })
        .collect()
}

/// Parse ffuf-style fuzzer JSON into a [`ParseResult`].
///
/// Results with an empty URL are skipped. Query-string parameters on each
/// result URL become inputs and observations, deduplicated across the
/// whole result set.
pub fn parse(json: &str) -> Result<ParseResult, SonobatError> {
    let root: FfufRoot = serde_json::from_str(json)
        .map_err(|e| SonobatError::ParseFormat(format!("malformed ffuf output: {e}")))?;
    if root.commandline.is_empty() {
        return Err(SonobatError::ParseFormat("ffuf output missing commandline".into()));
    }
    if root.config.url.is_empty() || root.config.method.is_empty() {
        return Err(SonobatError::ParseFormat("ffuf config missing url/method".into()));
    }

    let mut result = ParseResult::default();
    let mut seen_hosts = HashSet::new();
    let mut seen_services = HashSet::new();
    let mut seen_endpoints = HashSet::new();
    let mut seen_inputs = HashSet::new();
    let mut seen_observations = HashSet::new();
    let mut seen_links = HashSet::new();

    for item in &root.results {
        if item.url.is_empty() {
            continue;
        }
        let Some(split) = split_url(&item.url) else {
            continue;
        };

        if seen_hosts.insert(split.host.clone()) {
            result.hosts.push(HostRecord {
                authority: split.host.clone(),
            });
        }

        let service_key = (split.host.clone(), split.port);
        if seen_services.insert(service_key.clone()) {
            result.services.push(ServiceRecord {
                host_authority: split.host.clone(),
                transport: "tcp".to_string(),
                port: split.port,
                app_proto: split.scheme.clone(),
                state: "open".to_string(),
                banner: String::new(),
                confidence: "high".to_string(),
            });
        }

        let endpoint_key = (root.config.method.clone(), split.pathname.clone());
        if seen_endpoints.insert(endpoint_key) {
            result.endpoints.push(EndpointRecord {
                host_authority: split.host.clone(),
                transport: "tcp".to_string(),
                port: split.port,
                method: root.config.method.clone(),
                path: split.pathname.clone(),
                status_code: item.status,
            });
        }

        for (name, value) in parse_query_params(&split.query) {
            if seen_inputs.insert(name.clone()) {
                result.inputs.push(InputRecord {
                    host_authority: split.host.clone(),
                    transport: "tcp".to_string(),
                    port: split.port,
                    location: "query".to_string(),
                    name: name.clone(),
                });
            }

            let obs_key = ("query".to_string(), name.clone(), value.clone());
            if seen_observations.insert(obs_key) {
                result.observations.push(ObservationRecord {
                    location: "query".to_string(),
                    name: name.clone(),
                    raw_value: value,
                    source: "ffuf".to_string(),
                    confidence: "medium".to_string(),
                });
            }

            let link_key = (root.config.method.clone(), split.pathname.clone(), "query".to_string(), name.clone());
            if seen_links.insert(link_key) {
                result.endpoint_input_links.push(EndpointInputLink {
                    method: root.config.method.clone(),
                    path: split.pathname.clone(),
                    location: "query".to_string(),
                    name,
                });
            }
        }
    }

    Ok(result)
}
