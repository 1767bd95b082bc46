//! The graph store: nodes, edges, transactional upsert, and lookup by id,
//! kind, natural key, and adjacency.

use super::edge::{Edge, EdgeKind};
use super::node::{Node, NodeKind};
use super::schema::{natural_key, validate};
use crate::error::SonobatError;
use crate::types::Value;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Default, Clone)]
struct StoreState {
    nodes: HashMap<String, Node>,
    node_by_key: HashMap<String, String>,
    edges: HashMap<String, Edge>,
    edge_by_identity: HashMap<(EdgeKind, String, String), String>,
}

/// An on-disk snapshot of a store's full node and edge set, in no
/// particular order. Used by the CLI to persist a graph between runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Every node, regardless of kind.
    pub nodes: Vec<Node>,
    /// Every edge, regardless of kind.
    pub edges: Vec<Edge>,
}

/// The graph-native store: the fact base the Datalog engine reads from.
///
/// All mutation goes through [`GraphStore::transaction`], a scoped batch
/// that commits atomically or not at all. Every
/// single-call mutation method (`create_node`, `upsert_edge`, ...) is a
/// one-operation transaction.
pub struct GraphStore {
    state: RwLock<StoreState>,
}

impl GraphStore {
    /// Create an empty store.
    pub fn new() -> Self {
        GraphStore {
            state: RwLock::new(StoreState::default()),
        }
    }

    /// Run a batch of mutations as one atomic transaction: the closure
    /// operates on a private draft of the store; on `Ok` the draft
    /// replaces the live state, on `Err` the draft is discarded and the
    /// store is left untouched.
    pub fn transaction<F, T>(&self, f: F) -> Result<T, SonobatError>
    where
        F: FnOnce(&mut Txn) -> Result<T, SonobatError>,
    {
        let mut draft = self.state.read().clone();
        let mut txn = Txn { state: &mut draft };
        let result = f(&mut txn)?;
        *self.state.write() = draft;
        Ok(result)
    }

    /// Fetch a node by surrogate id.
    pub fn find_by_id(&self, id: &str) -> Option<Node> {
        self.state.read().nodes.get(id).cloned()
    }

    /// Fetch a node by its natural key.
    pub fn find_by_natural_key(&self, key: &str) -> Option<Node> {
        let state = self.state.read();
        state
            .node_by_key
            .get(key)
            .and_then(|id| state.nodes.get(id))
            .cloned()
    }

    /// List all nodes of a kind, optionally filtered by predicate over the
    /// canonical property bag.
    pub fn find_by_kind(&self, kind: NodeKind, filter: Option<&dyn Fn(&Node) -> bool>) -> Vec<Node> {
        self.state
            .read()
            .nodes
            .values()
            .filter(|n| n.kind == kind)
            .filter(|n| filter.map(|f| f(n)).unwrap_or(true))
            .cloned()
            .collect()
    }

    /// Edges whose source is `id`.
    pub fn find_by_source(&self, id: &str) -> Vec<Edge> {
        self.state
            .read()
            .edges
            .values()
            .filter(|e| e.source == id)
            .cloned()
            .collect()
    }

    /// Edges whose target is `id`.
    pub fn find_by_target(&self, id: &str) -> Vec<Edge> {
        self.state
            .read()
            .edges
            .values()
            .filter(|e| e.target == id)
            .cloned()
            .collect()
    }

    /// All edges of a given kind.
    pub fn find_edges_by_kind(&self, kind: EdgeKind) -> Vec<Edge> {
        self.state
            .read()
            .edges
            .values()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    /// Per-kind node counts plus total edge and artifact counts, the basis
    /// for a `summary` resource.
    pub fn summary(&self) -> HashMap<&'static str, usize> {
        let state = self.state.read();
        let mut counts: HashMap<&'static str, usize> = HashMap::new();
        for node in state.nodes.values() {
            *counts.entry(node.kind.as_str()).or_insert(0) += 1;
        }
        counts.insert("edges", state.edges.len());
        counts
    }

    /// One-shot `createNode` transaction.
    pub fn create_node(
        &self,
        kind: NodeKind,
        props: &Value,
        evidence_artifact_id: Option<&str>,
        parent_id: Option<&str>,
    ) -> Result<Node, SonobatError> {
        self.transaction(|txn| txn.create_node(kind, props, evidence_artifact_id, parent_id))
    }

    /// One-shot `upsertNode` transaction.
    pub fn upsert_node(
        &self,
        kind: NodeKind,
        props: &Value,
        evidence_artifact_id: Option<&str>,
        parent_id: Option<&str>,
    ) -> Result<(Node, bool), SonobatError> {
        self.transaction(|txn| txn.upsert_node(kind, props, evidence_artifact_id, parent_id))
    }

    /// One-shot `updateProps` transaction.
    pub fn update_props(&self, id: &str, new_props: &Value) -> Result<Node, SonobatError> {
        self.transaction(|txn| txn.update_props(id, new_props))
    }

    /// One-shot `deleteNode` transaction, cascading to adjacent edges.
    pub fn delete_node(&self, id: &str) -> Result<bool, SonobatError> {
        self.transaction(|txn| Ok(txn.delete_node(id)))
    }

    /// One-shot `createEdge` transaction.
    pub fn create_edge(
        &self,
        kind: EdgeKind,
        source: &str,
        target: &str,
        evidence_artifact_id: Option<&str>,
        props: Option<Value>,
    ) -> Result<Edge, SonobatError> {
        self.transaction(|txn| txn.create_edge(kind, source, target, evidence_artifact_id, props))
    }

    /// One-shot `upsertEdge` transaction.
    pub fn upsert_edge(
        &self,
        kind: EdgeKind,
        source: &str,
        target: &str,
        evidence_artifact_id: Option<&str>,
        props: Option<Value>,
    ) -> Result<(Edge, bool), SonobatError> {
        self.transaction(|txn| txn.upsert_edge(kind, source, target, evidence_artifact_id, props))
    }

    /// Export every node and edge verbatim, for on-disk persistence.
    pub fn snapshot(&self) -> GraphSnapshot {
        let state = self.state.read();
        GraphSnapshot {
            nodes: state.nodes.values().cloned().collect(),
            edges: state.edges.values().cloned().collect(),
        }
    }

    /// Rebuild a store from a previously exported snapshot, preserving ids,
    /// natural keys, and timestamps exactly (bypassing validation, since the
    /// snapshot was already validated when it was first written).
    pub fn from_snapshot(snapshot: GraphSnapshot) -> Self {
        let mut state = StoreState::default();
        for node in snapshot.nodes {
            state.node_by_key.insert(node.natural_key.clone(), node.id.clone());
            state.nodes.insert(node.id.clone(), node);
        }
        for edge in snapshot.edges {
            state.edge_by_identity.insert(edge.identity_owned(), edge.id.clone());
            state.edges.insert(edge.id.clone(), edge);
        }
        GraphStore {
            state: RwLock::new(state),
        }
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}

/// A mutation scope over a private draft of the store (see
/// [`GraphStore::transaction`]).
pub struct Txn<'a> {
    state: &'a mut StoreState,
}

impl Txn<'_> {
    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    /// `createNode`: fails if the computed natural key already
    /// exists.
    pub fn create_node(
        &mut self,
        kind: NodeKind,
        props: &Value,
        evidence_artifact_id: Option<&str>,
        parent_id: Option<&str>,
    ) -> Result<Node, SonobatError> {
        let canonical = validate(kind, props)?;
        let key = natural_key(kind, &canonical, parent_id);

        if !kind.always_creates() && self.state.node_by_key.contains_key(&key) {
            return Err(SonobatError::SchemaCollision { natural_key: key });
        }

        let now = Self::now();
        let node = Node {
            id: Uuid::new_v4().to_string(),
            kind,
            natural_key: key.clone(),
            props: canonical,
            evidence_artifact_id: evidence_artifact_id.map(str::to_string),
            parent_id: parent_id.map(str::to_string),
            created_at: now,
            modified_at: now,
        };

        self.state.node_by_key.insert(key, node.id.clone());
        self.state.nodes.insert(node.id.clone(), node.clone());
        Ok(node)
    }

    /// `upsertNode`: updates in place on natural-key collision.
    pub fn upsert_node(
        &mut self,
        kind: NodeKind,
        props: &Value,
        evidence_artifact_id: Option<&str>,
        parent_id: Option<&str>,
    ) -> Result<(Node, bool), SonobatError> {
        let canonical = validate(kind, props)?;
        let key = natural_key(kind, &canonical, parent_id);

        if !kind.always_creates() {
            if let Some(existing_id) = self.state.node_by_key.get(&key).cloned() {
                let node = self.state.nodes.get_mut(&existing_id).expect("key index is consistent");
                node.props = canonical;
                node.modified_at = Self::now().max(node.created_at);
                if evidence_artifact_id.is_some() {
                    node.evidence_artifact_id = evidence_artifact_id.map(str::to_string);
                }
                return Ok((node.clone(), false));
            }
        }

        let now = Self::now();
        let node = Node {
            id: Uuid::new_v4().to_string(),
            kind,
            natural_key: key.clone(),
            props: canonical,
            evidence_artifact_id: evidence_artifact_id.map(str::to_string),
            parent_id: parent_id.map(str::to_string),
            created_at: now,
            modified_at: now,
        };
        self.state.node_by_key.insert(key, node.id.clone());
        self.state.nodes.insert(node.id.clone(), node.clone());
        Ok((node, true))
    }

    /// `updateProps`: revalidates against the node's own kind.
    pub fn update_props(&mut self, id: &str, new_props: &Value) -> Result<Node, SonobatError> {
        let kind = self
            .state
            .nodes
            .get(id)
            .map(|n| n.kind)
            .ok_or_else(|| SonobatError::ForeignKey(format!("no node with id {id}")))?;
        let canonical = validate(kind, new_props)?;

        let node = self.state.nodes.get_mut(id).expect("checked above");
        node.props = canonical;
        node.modified_at = Self::now().max(node.created_at);
        Ok(node.clone())
    }

    /// `deleteNode`: cascades to adjacent edges.
    pub fn delete_node(&mut self, id: &str) -> bool {
        let Some(node) = self.state.nodes.remove(id) else {
            return false;
        };
        self.state.node_by_key.remove(&node.natural_key);

        let adjacent: Vec<String> = self
            .state
            .edges
            .values()
            .filter(|e| e.source == id || e.target == id)
            .map(|e| e.id.clone())
            .collect();
        for edge_id in adjacent {
            if let Some(edge) = self.state.edges.remove(&edge_id) {
                self.state.edge_by_identity.remove(&edge.identity_owned());
            }
        }
        true
    }

    /// `createEdge`: fails on a missing endpoint or a
    /// duplicate `(kind, source, target)` triple.
    pub fn create_edge(
        &mut self,
        kind: EdgeKind,
        source: &str,
        target: &str,
        evidence_artifact_id: Option<&str>,
        props: Option<Value>,
    ) -> Result<Edge, SonobatError> {
        self.check_endpoints(source, target)?;
        let identity = (kind, source.to_string(), target.to_string());
        if self.state.edge_by_identity.contains_key(&identity) {
            return Err(SonobatError::SchemaCollision {
                natural_key: format!("{kind}:{source}:{target}"),
            });
        }
        Ok(self.insert_edge(kind, source, target, evidence_artifact_id, props))
    }

    /// `upsertEdge`: idempotent on `(kind, source, target)`.
    pub fn upsert_edge(
        &mut self,
        kind: EdgeKind,
        source: &str,
        target: &str,
        evidence_artifact_id: Option<&str>,
        props: Option<Value>,
    ) -> Result<(Edge, bool), SonobatError> {
        self.check_endpoints(source, target)?;
        let identity = (kind, source.to_string(), target.to_string());
        if let Some(existing_id) = self.state.edge_by_identity.get(&identity).cloned() {
            let edge = self.state.edges.get_mut(&existing_id).expect("identity index is consistent");
            if props.is_some() {
                edge.props = props;
            }
            return Ok((edge.clone(), false));
        }
        Ok((self.insert_edge(kind, source, target, evidence_artifact_id, props), true))
    }

    fn check_endpoints(&self, source: &str, target: &str) -> Result<(), SonobatError> {
        if !self.state.nodes.contains_key(source) {
            return Err(SonobatError::ForeignKey(format!("no node with id {source}")));
        }
        if !self.state.nodes.contains_key(target) {
            return Err(SonobatError::ForeignKey(format!("no node with id {target}")));
        }
        Ok(())
    }

    fn insert_edge(
        &mut self,
        kind: EdgeKind,
        source: &str,
        target: &str,
        evidence_artifact_id: Option<&str>,
        props: Option<Value>,
    ) -> Edge {
        let edge = Edge {
            id: Uuid::new_v4().to_string(),
            kind,
            source: source.to_string(),
            target: target.to_string(),
            props,
            evidence_artifact_id: evidence_artifact_id.map(str::to_string),
            created_at: Self::now(),
        };
        self.state
            .edge_by_identity
            .insert((kind, source.to_string(), target.to_string()), edge.id.clone());
        self.state.edges.insert(edge.id.clone(), edge.clone());
        edge
    }
}

impl Edge {
    fn identity_owned(&self) -> (EdgeKind, String, String) {
        (self.kind, self.source.clone(), self.target.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn host_props(authority: &str) -> Value {
        let mut m = BTreeMap::new();
        m.insert("authority".to_string(), Value::string(authority));
        Value::object(m)
    }

    fn service_props(transport: &str, port: i64) -> Value {
        let mut m = BTreeMap::new();
        m.insert("transport".to_string(), Value::string(transport));
        m.insert("port".to_string(), Value::int(port));
        m.insert("app_proto".to_string(), Value::string("http"));
        m.insert("state".to_string(), Value::string("open"));
        Value::object(m)
    }

    #[test]
    fn create_then_find_by_natural_key() {
        let store = GraphStore::new();
        let node = store.create_node(NodeKind::Host, &host_props("10.0.0.1"), None, None).unwrap();
        assert_eq!(node.natural_key, "host:10.0.0.1");
        assert_eq!(store.find_by_natural_key("host:10.0.0.1").unwrap().id, node.id);
    }

    #[test]
    fn create_twice_collides() {
        let store = GraphStore::new();
        store.create_node(NodeKind::Host, &host_props("10.0.0.1"), None, None).unwrap();
        let err = store.create_node(NodeKind::Host, &host_props("10.0.0.1"), None, None).unwrap_err();
        assert!(matches!(err, SonobatError::SchemaCollision { .. }));
    }

    #[test]
    fn upsert_merges_instead_of_duplicating() {
        let store = GraphStore::new();
        let (first, created1) = store.upsert_node(NodeKind::Host, &host_props("10.0.0.1"), None, None).unwrap();
        let (second, created2) = store.upsert_node(NodeKind::Host, &host_props("10.0.0.1"), None, None).unwrap();
        assert!(created1);
        assert!(!created2);
        assert_eq!(first.id, second.id);
        assert_eq!(store.find_by_kind(NodeKind::Host, None).len(), 1);
    }

    #[test]
    fn always_create_kinds_never_merge() {
        let store = GraphStore::new();
        let mut m = BTreeMap::new();
        m.insert("raw_value".to_string(), Value::string("1"));
        m.insert("source".to_string(), Value::string("ffuf"));
        m.insert("confidence".to_string(), Value::string("high"));
        let props = Value::object(m);

        store.create_node(NodeKind::Observation, &props, None, None).unwrap();
        store.create_node(NodeKind::Observation, &props, None, None).unwrap();
        assert_eq!(store.find_by_kind(NodeKind::Observation, None).len(), 2);
    }

    #[test]
    fn edge_requires_existing_endpoints() {
        let store = GraphStore::new();
        let host = store.create_node(NodeKind::Host, &host_props("10.0.0.1"), None, None).unwrap();
        let err = store.create_edge(EdgeKind::HostService, &host.id, "missing", None, None).unwrap_err();
        assert!(matches!(err, SonobatError::ForeignKey(_)));
    }

    #[test]
    fn upsert_edge_is_idempotent_on_identity_triple() {
        let store = GraphStore::new();
        let host = store.create_node(NodeKind::Host, &host_props("10.0.0.1"), None, None).unwrap();
        let (service, _) = store
            .upsert_node(NodeKind::Service, &service_props("tcp", 80), None, Some(&host.id))
            .unwrap();

        let (_, c1) = store.upsert_edge(EdgeKind::HostService, &host.id, &service.id, None, None).unwrap();
        let (_, c2) = store.upsert_edge(EdgeKind::HostService, &host.id, &service.id, None, None).unwrap();
        assert!(c1);
        assert!(!c2);
        assert_eq!(store.find_by_source(&host.id).len(), 1);
    }

    #[test]
    fn delete_node_cascades_to_adjacent_edges() {
        let store = GraphStore::new();
        let host = store.create_node(NodeKind::Host, &host_props("10.0.0.1"), None, None).unwrap();
        let (service, _) = store
            .upsert_node(NodeKind::Service, &service_props("tcp", 80), None, Some(&host.id))
            .unwrap();
        store.create_edge(EdgeKind::HostService, &host.id, &service.id, None, None).unwrap();

        assert!(store.delete_node(&host.id).unwrap());
        assert!(store.find_by_id(&host.id).is_none());
        assert!(store.find_by_source(&host.id).is_empty());
        assert!(store.find_by_target(&service.id).is_empty());
    }

    #[test]
    fn transaction_rolls_back_atomically_on_error() {
        let store = GraphStore::new();
        let result: Result<(), SonobatError> = store.transaction(|txn| {
            txn.create_node(NodeKind::Host, &host_props("10.0.0.1"), None, None)?;
            Err(SonobatError::Validation("force rollback".into()))
        });
        assert!(result.is_err());
        assert!(store.find_by_natural_key("host:10.0.0.1").is_none());
    }

    #[test]
    fn snapshot_round_trip_preserves_ids_and_edges() {
        let store = GraphStore::new();
        let host = store.create_node(NodeKind::Host, &host_props("10.0.0.1"), None, None).unwrap();
        let (service, _) = store
            .upsert_node(NodeKind::Service, &service_props("tcp", 80), None, Some(&host.id))
            .unwrap();
        store.create_edge(EdgeKind::HostService, &host.id, &service.id, None, None).unwrap();

        let restored = GraphStore::from_snapshot(store.snapshot());
        assert_eq!(restored.find_by_id(&host.id).unwrap().natural_key, "host:10.0.0.1");
        assert_eq!(restored.find_by_source(&host.id).len(), 1);
        assert_eq!(restored.find_by_kind(NodeKind::Service, None).len(), 1);
    }

    #[test]
    fn snapshot_survives_a_json_file_round_trip() {
        let store = GraphStore::new();
        let host = store.create_node(NodeKind::Host, &host_props("10.0.0.1"), None, None).unwrap();
        store
            .upsert_node(NodeKind::Service, &service_props("tcp", 80), None, Some(&host.id))
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        let written = serde_json::to_string_pretty(&store.snapshot()).unwrap();
        std::fs::write(&path, written).unwrap();

        let read_back = std::fs::read_to_string(&path).unwrap();
        let snapshot: GraphSnapshot = serde_json::from_str(&read_back).unwrap();
        let restored = GraphStore::from_snapshot(snapshot);

        assert_eq!(restored.find_by_kind(NodeKind::Host, None).len(), 1);
        assert_eq!(restored.find_by_kind(NodeKind::Service, None).len(), 1);
        assert_eq!(restored.find_by_natural_key("host:10.0.0.1").unwrap().id, host.id);
    }

    #[test]
    fn modification_timestamp_never_precedes_creation() {
        let store = GraphStore::new();
        let node = store.create_node(NodeKind::Host, &host_props("10.0.0.1"), None, None).unwrap();
        let updated = store.update_props(&node.id, &host_props("10.0.0.1")).unwrap();
        assert!(updated.modified_at >= updated.created_at);
    }
}
