//! Stratification of a Datalog program's predicate dependency graph.
//!
//! Builds a graph with an edge from each rule's head predicate to every
//! predicate mentioned in its body, labeled negative when the mention is
//! inside `not`. Strongly connected components are computed with Tarjan's
//! algorithm; a component containing a negative edge within itself is
//! unstratifiable. Components are then ordered so that a predicate's
//! dependencies always live in an earlier or equal stratum, and predicates
//! that are only ever negated from outside their own component land in a
//! strictly earlier stratum than their negator.

use super::types::{Program, Rule};
use crate::error::SonobatError;
use std::collections::HashMap;
use std::sync::Arc;

/// The program's rules partitioned into strata, in evaluation order.
/// `strata[0]` must be fully evaluated before `strata[1]` is considered, etc.
pub type Strata = Vec<Vec<Rule>>;

struct Graph {
    predicates: Vec<Arc<str>>,
    index_of: HashMap<Arc<str>, usize>,
    /// Positive and negative edges, by source predicate index.
    edges: Vec<Vec<(usize, bool)>>,
}

impl Graph {
    fn node_index(&mut self, pred: &Arc<str>) -> usize {
        if let Some(&idx) = self.index_of.get(pred) {
            return idx;
        }
        let idx = self.predicates.len();
        self.predicates.push(pred.clone());
        self.edges.push(Vec::new());
        self.index_of.insert(pred.clone(), idx);
        idx
    }
}

fn build_graph(rules: &[Rule]) -> Graph {
    let mut graph = Graph {
        predicates: Vec::new(),
        index_of: HashMap::new(),
        edges: Vec::new(),
    };

    // Register every predicate that appears anywhere, including pure bases
    // that never head a rule (e.g. extracted facts).
    for rule in rules {
        graph.node_index(&rule.head.predicate);
        for (dep, _) in rule.dependencies() {
            graph.node_index(&dep);
        }
    }

    for rule in rules {
        let head_idx = graph.node_index(&rule.head.predicate);
        for (dep, negative) in rule.dependencies() {
            let dep_idx = graph.node_index(&dep);
            graph.edges[head_idx].push((dep_idx, negative));
        }
    }

    graph
}

/// Tarjan's SCC algorithm; returns components in reverse topological order
/// (a component that depends on another appears after it is not guaranteed
/// here — see the comment in [`stratify`] for how ordering is derived).
fn tarjan_sccs(graph: &Graph) -> Vec<Vec<usize>> {
    struct State {
        index_counter: usize,
        stack: Vec<usize>,
        on_stack: Vec<bool>,
        indices: Vec<Option<usize>>,
        lowlink: Vec<usize>,
        sccs: Vec<Vec<usize>>,
    }

    let n = graph.predicates.len();
    let mut state = State {
        index_counter: 0,
        stack: Vec::new(),
        on_stack: vec![false; n],
        indices: vec![None; n],
        lowlink: vec![0; n],
        sccs: Vec::new(),
    };

    fn strongconnect(v: usize, graph: &Graph, state: &mut State) {
        state.indices[v] = Some(state.index_counter);
        state.lowlink[v] = state.index_counter;
        state.index_counter += 1;
        state.stack.push(v);
        state.on_stack[v] = true;

        for &(w, _negative) in &graph.edges[v] {
            if state.indices[w].is_none() {
                strongconnect(w, graph, state);
                state.lowlink[v] = state.lowlink[v].min(state.lowlink[w]);
            } else if state.on_stack[w] {
                state.lowlink[v] = state.lowlink[v].min(state.indices[w].unwrap());
            }
        }

        if state.lowlink[v] == state.indices[v].unwrap() {
            let mut component = Vec::new();
            loop {
                let w = state.stack.pop().unwrap();
                state.on_stack[w] = false;
                component.push(w);
                if w == v {
                    break;
                }
            }
            state.sccs.push(component);
        }
    }

    for v in 0..n {
        if state.indices[v].is_none() {
            strongconnect(v, graph, &mut state);
        }
    }

    state.sccs
}

/// Stratify a program's rules. Raises [`SonobatError::DatalogStratification`]
/// naming the offending predicate if any strongly connected component of the
/// predicate dependency graph contains a negative edge between two members
/// of that same component.
pub fn stratify(program: &Program) -> Result<Strata, SonobatError> {
    let graph = build_graph(&program.rules);
    let sccs = tarjan_sccs(&graph);

    // Tarjan yields components in reverse topological order: a component is
    // emitted only after all components reachable from it. That is exactly
    // the stratum order we want (dependencies first).
    let mut component_of = vec![0usize; graph.predicates.len()];
    for (comp_idx, comp) in sccs.iter().enumerate() {
        for &node in comp {
            component_of[node] = comp_idx;
        }
    }

    for (comp_idx, comp) in sccs.iter().enumerate() {
        let members: std::collections::HashSet<usize> = comp.iter().copied().collect();
        for &node in comp {
            for &(dep, negative) in &graph.edges[node] {
                if negative && members.contains(&dep) {
                    return Err(SonobatError::DatalogStratification {
                        predicate: graph.predicates[node].to_string(),
                    });
                }
            }
        }
        let _ = comp_idx;
    }

    let mut strata: Strata = vec![Vec::new(); sccs.len()];
    for mut rule in program.rules.clone() {
        let head_idx = graph.index_of[&rule.head.predicate];
        let stratum = component_of[head_idx];
        rule.stratum = stratum;
        strata[stratum].push(rule);
    }

    strata.retain(|stratum_rules| !stratum_rules.is_empty());
    Ok(strata)
}
