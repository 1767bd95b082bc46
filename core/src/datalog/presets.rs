//! Compiled-in preset Datalog programs and the saved-rule registry.

use serde::{Deserialize, Serialize};

/// A named program, either one of the presets compiled into the binary or a
/// user-saved program persisted alongside the graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedRule {
    /// Unique identifier.
    pub id: String,
    /// Unique name used to resolve "run named pattern" requests.
    pub name: String,
    /// Optional human-readable description.
    pub description: Option<String>,
    /// Full Datalog source text.
    pub rule_text: String,
    /// Who produced this program.
    pub origin: Origin,
    /// Whether this entry mirrors a compiled-in preset.
    pub is_preset: bool,
    /// Creation timestamp, Unix seconds.
    pub created_at: i64,
    /// Last-modified timestamp, Unix seconds.
    pub modified_at: i64,
}

/// Who authored a saved rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Hand-written by a human operator.
    Human,
    /// Generated by an autonomous agent.
    Ai,
    /// Mirrors a compiled-in preset.
    Preset,
}

/// One compiled-in preset: a name and its Datalog source.
pub struct Preset {
    /// Preset name, resolved by "run named pattern" requests.
    pub name: &'static str,
    /// Datalog source text.
    pub source: &'static str,
}

/// The fixed table of presets compiled into the binary.
pub const PRESETS: &[Preset] = &[
    Preset {
        name: "reachable_services",
        source: "reachable(S) :- host(H,_,_), service(H,S,_,_,_,\"open\").\n?- reachable(S).\n",
    },
    Preset {
        name: "exploitable_endpoints",
        source: "exploitable(E) :- http_endpoint(_,E,_,_,_), vulnerability_endpoint(_,E).\n?- exploitable(E).\n",
    },
    Preset {
        name: "critical_vulns",
        source: "critical(V) :- vulnerability(_,V,_,_,\"critical\",_).\n?- critical(V).\n",
    },
    Preset {
        name: "attack_surface",
        source: "surface(S,E) :- service(_,S,_,_,_,\"open\"), http_endpoint(S,E,_,_,_).\n?- surface(S,E).\n",
    },
    Preset {
        name: "unfuzzed_inputs",
        source: "unfuzzed(I) :- input(_,I,_,_), not has_observation(I).\nhas_observation(I) :- observation(I,_,_,_,_).\n?- unfuzzed(I).\n",
    },
    Preset {
        name: "authenticated_access",
        source: "authed(S) :- credential(S,_,_,_,_,_).\n?- authed(S).\n",
    },
];

/// Look up a compiled-in preset by name.
pub fn find_preset(name: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.name == name)
}
