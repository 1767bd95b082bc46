//! Per-kind property validation and natural-key construction (component A).

use super::node::NodeKind;
use crate::error::SonobatError;
use crate::types::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// The declared type of one property field.
enum FieldType {
    Str,
    StrEnum(&'static [&'static str]),
    Number,
}

struct FieldSpec {
    name: &'static str,
    required: bool,
    ty: FieldType,
    default: Option<fn() -> Value>,
}

const fn req(name: &'static str, ty: FieldType) -> FieldSpec {
    FieldSpec {
        name,
        required: true,
        ty,
        default: None,
    }
}

const fn opt(name: &'static str, ty: FieldType, default: fn() -> Value) -> FieldSpec {
    FieldSpec {
        name,
        required: false,
        ty,
        default: Some(default),
    }
}

fn zero() -> Value {
    Value::int(0)
}

fn empty_string() -> Value {
    Value::string("")
}

fn fields_for(kind: NodeKind) -> Vec<FieldSpec> {
    match kind {
        NodeKind::Host => vec![req("authority", FieldType::Str)],
        NodeKind::Service => vec![
            req("transport", FieldType::StrEnum(&["tcp", "udp"])),
            req("port", FieldType::Number),
            req("app_proto", FieldType::Str),
            req("state", FieldType::Str),
            opt("banner", FieldType::Str, empty_string),
            opt("confidence", FieldType::StrEnum(&["low", "medium", "high"]), empty_string),
        ],
        NodeKind::Endpoint => vec![
            req("method", FieldType::Str),
            req("path", FieldType::Str),
            opt("status_code", FieldType::Number, zero),
        ],
        NodeKind::Input => vec![
            req(
                "location",
                FieldType::StrEnum(&["query", "body", "header", "path", "cookie"]),
            ),
            req("name", FieldType::Str),
        ],
        NodeKind::Observation | NodeKind::SvcObservation => vec![
            req("raw_value", FieldType::Str),
            req("source", FieldType::Str),
            req("confidence", FieldType::StrEnum(&["low", "medium", "high"])),
        ],
        NodeKind::Vulnerability => vec![
            req("vuln_type", FieldType::Str),
            req("title", FieldType::Str),
            req("severity", FieldType::Str),
            req("confidence", FieldType::StrEnum(&["low", "medium", "high"])),
        ],
        NodeKind::Cve => vec![
            req("cve_id", FieldType::Str),
            opt("cvss_score", FieldType::Number, zero),
        ],
        NodeKind::Vhost => vec![
            req("hostname", FieldType::Str),
            opt("source", FieldType::Str, empty_string),
        ],
        NodeKind::Artifact => vec![
            req("sha256", FieldType::Str),
            req("tool", FieldType::Str),
            req("path", FieldType::Str),
        ],
        NodeKind::Credential => vec![
            req("username", FieldType::Str),
            req("secret_type", FieldType::Str),
            req("source", FieldType::Str),
            req("confidence", FieldType::StrEnum(&["low", "medium", "high"])),
        ],
    }
}

/// Validate `raw` against `kind`'s schema, producing the canonical form:
/// unknown fields stripped, defaults applied, keys in sorted order.
pub fn validate(kind: NodeKind, raw: &Value) -> Result<Value, SonobatError> {
    let Value::Object(raw_map) = raw else {
        return Err(SonobatError::Validation(format!(
            "{kind} properties must be a JSON object"
        )));
    };

    let mut canonical: BTreeMap<String, Value> = BTreeMap::new();

    for field in fields_for(kind) {
        match raw_map.get(field.name) {
            Some(value) => {
                check_type(kind, &field, value)?;
                canonical.insert(field.name.to_string(), value.clone());
            }
            None => {
                if field.required {
                    return Err(SonobatError::Validation(format!(
                        "{kind} is missing required property `{}`",
                        field.name
                    )));
                }
                if let Some(default) = field.default {
                    canonical.insert(field.name.to_string(), default());
                }
            }
        }
    }

    Ok(Value::object(canonical))
}

fn check_type(kind: NodeKind, field: &FieldSpec, value: &Value) -> Result<(), SonobatError> {
    let ok = match &field.ty {
        FieldType::Str => value.as_str().is_some(),
        FieldType::StrEnum(allowed) => {
            matches!(value.as_str(), Some(s) if allowed.contains(&s))
        }
        FieldType::Number => value.as_number().is_some(),
    };
    if ok {
        Ok(())
    } else {
        Err(SonobatError::Validation(format!(
            "{kind} property `{}` has the wrong type or value",
            field.name
        )))
    }
}

fn prop_str<'a>(props: &'a Value, key: &str) -> &'a str {
    match props {
        Value::Object(map) => map.get(key).and_then(|v| v.as_str()).unwrap_or(""),
        _ => "",
    }
}

fn prop_number(props: &Value, key: &str) -> String {
    match props {
        Value::Object(map) => map
            .get(key)
            .and_then(|v| v.as_number())
            .map(|n| n.to_string())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

/// Construct the natural key for a node. `parent_id` is required for
/// kinds whose key includes `{parentId}`.
pub fn natural_key(kind: NodeKind, canonical_props: &Value, parent_id: Option<&str>) -> String {
    match kind {
        NodeKind::Host => format!("host:{}", prop_str(canonical_props, "authority")),
        NodeKind::Service => format!(
            "service:{}:{}:{}",
            parent_id.unwrap_or_default(),
            prop_str(canonical_props, "transport"),
            prop_number(canonical_props, "port"),
        ),
        NodeKind::Endpoint => format!(
            "endpoint:{}:{}:{}",
            parent_id.unwrap_or_default(),
            prop_str(canonical_props, "method"),
            prop_str(canonical_props, "path"),
        ),
        NodeKind::Input => format!(
            "input:{}:{}:{}",
            parent_id.unwrap_or_default(),
            prop_str(canonical_props, "location"),
            prop_str(canonical_props, "name"),
        ),
        NodeKind::Vhost => format!(
            "vhost:{}:{}",
            parent_id.unwrap_or_default(),
            prop_str(canonical_props, "hostname"),
        ),
        NodeKind::Observation
        | NodeKind::SvcObservation
        | NodeKind::Vulnerability
        | NodeKind::Credential => format!("{kind}:{}", Uuid::new_v4()),
        NodeKind::Cve => format!(
            "cve:{}:{}",
            parent_id.unwrap_or_default(),
            prop_str(canonical_props, "cve_id"),
        ),
        // Artifacts are keyed by content digest so re-ingesting the same
        // bytes is idempotent at the artifact level too (see DESIGN.md).
        NodeKind::Artifact => format!("artifact:{}", prop_str(canonical_props, "sha256")),
    }
}
