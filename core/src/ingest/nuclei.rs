//! Vulnerability-scanner JSONL parser (component C).

use super::parse_result::{
    CveRecord, EndpointRecord, HostRecord, ServiceRecord, VulnerabilityRecord,
};
use crate::error::SonobatError;
use rust_decimal::Decimal;
use serde_json::Value as Json;
use std::collections::HashSet;
use std::str::FromStr;

const TYPE_PRIORITY: &[(&str, &str)] = &[
    ("sqli", "sqli"),
    ("xss", "xss"),
    ("rce", "rce"),
    ("lfi", "lfi"),
    ("ssrf", "ssrf"),
];

/// Extract the raw path from a URL without decoding it: finds the slash
/// after `scheme://host[:port]` and stops at the first `?` or `#`. Used
/// instead of a general-purpose URL parser because traversal payloads in
/// the path must survive byte-for-byte.
fn raw_path(url: &str) -> String {
    let after_scheme = url.find("://").map(|i| &url[i + 3..]).unwrap_or(url);
    let path_start = after_scheme.find('/');
    let Some(start) = path_start else {
        return "/".to_string();
    };
    let from_slash = &after_scheme[start..];
    let end = from_slash
        .find(['?', '#'])
        .unwrap_or(from_slash.len());
    from_slash[..end].to_string()
}

fn vuln_type_from_tags(tags: &[String]) -> String {
    for (tag, vuln_type) in TYPE_PRIORITY {
        if tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            return vuln_type.to_string();
        }
    }
    "other".to_string()
}

fn as_str_field<'a>(v: &'a Json, key: &str) -> Option<&'a str> {
    v.get(key).and_then(|x| x.as_str())
}

fn cve_ids(classification: &Json) -> Vec<String> {
    match classification.get("cve-id") {
        Some(Json::String(s)) => vec![s.clone()],
        Some(Json::Array(items)) => items.iter().filter_map(|i| i.as_str().map(str::to_string)).collect(),
        _ => Vec::new(),
    }
}

fn cvss_score(classification: &Json) -> Option<Decimal> {
    let raw = classification.get("cvss-score")?;
    if let Some(f) = raw.as_f64() {
        Decimal::from_str(&f.to_string()).ok()
    } else {
        None
    }
}

/// Parse nuclei-style JSONL vulnerability findings into a
/// [`super::parse_result::ParseResult`]. Malformed lines are skipped
/// rather than aborting the whole parse.
pub fn parse(jsonl: &str) -> Result<super::parse_result::ParseResult, SonobatError> {
    let mut result = super::parse_result::ParseResult::default();
    let mut seen_hosts = HashSet::new();
    let mut seen_services = HashSet::new();
    let mut seen_endpoints = HashSet::new();

    for line in jsonl.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Ok(finding) = serde_json::from_str::<Json>(line) else {
            continue;
        };

        let Some(ip) = as_str_field(&finding, "ip") else {
            continue;
        };
        let port: i64 = finding
            .get("port")
            .and_then(|p| p.as_i64().or_else(|| p.as_str().and_then(|s| s.parse().ok())))
            .unwrap_or(0);
        let matched_at = as_str_field(&finding, "matched-at")
            .or_else(|| as_str_field(&finding, "host"))
            .unwrap_or("");

        if seen_hosts.insert(ip.to_string()) {
            result.hosts.push(HostRecord {
                authority: ip.to_string(),
            });
        }

        let service_key = (ip.to_string(), port);
        if seen_services.insert(service_key) {
            result.services.push(ServiceRecord {
                host_authority: ip.to_string(),
                transport: "tcp".to_string(),
                port,
                app_proto: if matched_at.starts_with("https") { "https".to_string() } else { "http".to_string() },
                state: "open".to_string(),
                banner: String::new(),
                confidence: "high".to_string(),
            });
        }

        let path = raw_path(matched_at);
        let endpoint_key = ("GET".to_string(), path.clone());
        if seen_endpoints.insert(endpoint_key) {
            result.endpoints.push(EndpointRecord {
                host_authority: ip.to_string(),
                transport: "tcp".to_string(),
                port,
                method: "GET".to_string(),
                path: path.clone(),
                status_code: 0,
            });
        }

        let Some(info) = finding.get("info") else {
            continue;
        };
        let title = as_str_field(info, "name").unwrap_or("untitled finding").to_string();
        let severity = as_str_field(info, "severity").unwrap_or("unknown").to_string();
        let tags: Vec<String> = info
            .get("tags")
            .and_then(|t| t.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default();
        let vuln_type = vuln_type_from_tags(&tags);

        result.vulnerabilities.push(VulnerabilityRecord {
            host_authority: ip.to_string(),
            transport: "tcp".to_string(),
            port,
            method: Some("GET".to_string()),
            path: Some(path),
            vuln_type,
            title: title.clone(),
            severity,
            confidence: "high".to_string(),
        });

        if let Some(classification) = info.get("classification") {
            for cve_id in cve_ids(classification) {
                result.cves.push(CveRecord {
                    vuln_title: title.clone(),
                    cve_id,
                    cvss_score: cvss_score(classification),
                });
            }
        }
    }

    Ok(result)
}
