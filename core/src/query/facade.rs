//! Query facade (component K): `run_datalog`, `list_facts`, and
//! "run named pattern" (preset table first, then the saved-rule table).

use super::extractor::{self, extract_predicate};
use crate::datalog::{evaluate, find_preset, EvalResult, EvalStats, EvaluatorLimits, Origin, SavedRule};
use crate::error::SonobatError;
use crate::facts::Fact;
use crate::graph::GraphStore;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Runs Datalog programs and fact lookups against a [`GraphStore`], and
/// holds the saved-rule registry named patterns resolve against after the
/// preset table.
pub struct QueryFacade<'a> {
    store: &'a GraphStore,
    saved_rules: RwLock<HashMap<String, SavedRule>>,
}

impl<'a> QueryFacade<'a> {
    /// Build a facade over `store` with an empty saved-rule registry.
    pub fn new(store: &'a GraphStore) -> Self {
        QueryFacade {
            store,
            saved_rules: RwLock::new(HashMap::new()),
        }
    }

    /// `list_facts(predicate?, limit?)`: a single predicate's facts if
    /// named, otherwise every predicate's facts, each capped at `limit`.
    pub fn list_facts(&self, predicate: Option<&str>, limit: Option<usize>) -> Vec<Fact> {
        match predicate {
            Some(name) => extract_predicate(self.store, name, limit).unwrap_or_default(),
            None => extractor::PREDICATES
                .iter()
                .flat_map(|p| extract_predicate(self.store, p, limit).unwrap_or_default())
                .collect(),
        }
    }

    /// Parse and evaluate a raw Datalog program against the current graph
    /// snapshot.
    pub fn run_program(&self, source: &str, limits: &EvaluatorLimits) -> Result<EvalResult, SonobatError> {
        let program = crate::datalog::parse_program(source)?;
        let facts = extractor::extract_all(self.store);
        evaluate(&program, &facts, limits)
    }

    /// Resolve `name` against the preset table, then the saved-rule table;
    /// a miss returns an empty result rather than an error.
    pub fn run_named_pattern(&self, name: &str, limits: &EvaluatorLimits) -> Result<EvalResult, SonobatError> {
        let source = find_preset(name)
            .map(|p| p.source.to_string())
            .or_else(|| self.saved_rules.read().get(name).map(|r| r.rule_text.clone()));

        match source {
            Some(source) => self.run_program(&source, limits),
            None => Ok(EvalResult {
                answers: Vec::new(),
                stats: EvalStats::default(),
            }),
        }
    }

    /// List every resolvable pattern name: presets first, then saved rules.
    pub fn list_patterns(&self) -> Vec<String> {
        let mut names: Vec<String> = crate::datalog::PRESETS.iter().map(|p| p.name.to_string()).collect();
        names.extend(self.saved_rules.read().keys().cloned());
        names
    }

    /// Persist a named program to the saved-rule table (`origin` is the
    /// caller-supplied provenance tag, typically `human` or `ai`).
    pub fn save_rule(&self, name: &str, description: Option<String>, rule_text: String, origin: Origin, now: i64) {
        let rule = SavedRule {
            id: format!("rule:{name}"),
            name: name.to_string(),
            description,
            rule_text,
            origin,
            is_preset: false,
            created_at: now,
            modified_at: now,
        };
        self.saved_rules.write().insert(name.to_string(), rule);
    }
}
