//! In-memory storage backend.
//!
//! This is the reference implementation of `StorageBackend`.
//! The whole graph sits behind one `RwLock`, so every call is atomic.
//!
//! ## Guarantees
//!
//! - **Constraints are enforced at write time**: unique and existence
//!   constraints are checked under the same write lock that applies the
//!   write, so concurrent creators of the same key cannot both succeed.
//! - **Patterns are all-or-nothing**: `create_pattern()` validates every node
//!   and endpoint before mutating anything. Merge nodes are matched under
//!   the same lock, so concurrent patterns merging one key share one node.
//! - **Read-only transactions reject writes** with `Error::TxError`.
//!
//! ## Limitations
//!
//! - `commit_tx()` and `rollback_tx()` are no-ops; writes are applied
//!   immediately. Multi-call writes that need atomicity must go through
//!   `create_pattern()`.
//! - No property indexes: lookups scan the label index.
//! - Vector queries are exact (brute force) over the indexed label.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use async_trait::async_trait;
use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::model::*;
use crate::tx::{Transaction, TxMode, TxId};
use crate::index::VectorIndexSpec;
use crate::{Error, Result};
use super::{ConstraintType, CreatePattern, PatternNode, PatternRef, StorageBackend};

// ============================================================================
// MemoryBackend
// ============================================================================

/// In-memory property graph storage. Cloning shares the same graph.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    state: RwLock<GraphState>,
    next_node_id: AtomicU64,
    next_rel_id: AtomicU64,
    next_tx_id: AtomicU64,
}

#[derive(Default)]
struct GraphState {
    nodes: HashMap<NodeId, Node>,
    relationships: HashMap<RelId, Relationship>,
    /// node_id → list of relationship IDs
    adjacency: HashMap<NodeId, Vec<RelId>>,
    /// label → node IDs in insertion order
    label_index: HashMap<String, Vec<NodeId>>,
    constraints: Vec<Constraint>,
    vector_indexes: HashMap<String, VectorIndexSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Constraint {
    label: String,
    property: String,
    kind: ConstraintType,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc_node_id(&self) -> NodeId {
        NodeId(self.inner.next_node_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn alloc_rel_id(&self) -> RelId {
        RelId(self.inner.next_rel_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Validate and apply a pattern under a single write lock.
    fn apply_pattern(&self, pattern: CreatePattern) -> Result<Vec<NodeId>> {
        let mut state = self.inner.state.write();

        let matched: Vec<Option<NodeId>> =
            pattern.nodes.iter().map(|n| state.merge_target(n)).collect();
        let mut staged: Vec<&PatternNode> = Vec::with_capacity(pattern.nodes.len());
        for (node, found) in pattern.nodes.iter().zip(&matched) {
            if found.is_none() {
                state.check_constraints(node, &staged)?;
                staged.push(node);
            }
        }
        for rel in &pattern.relationships {
            for end in [rel.src, rel.dst] {
                match end {
                    PatternRef::New(i) if i >= pattern.nodes.len() => {
                        return Err(Error::StorageError(format!(
                            "pattern refers to undeclared node #{i}"
                        )));
                    }
                    PatternRef::Existing(id) if !state.nodes.contains_key(&id) => {
                        return Err(Error::NotFound(format!("Node {id}")));
                    }
                    _ => {}
                }
            }
        }

        // Validation passed; nothing below can fail.
        let mut created = Vec::with_capacity(pattern.nodes.len());
        for (node, found) in pattern.nodes.iter().zip(matched) {
            let id = match found {
                Some(id) => id,
                None => {
                    let id = self.alloc_node_id();
                    state.insert_node(Node {
                        id,
                        labels: node.labels.clone(),
                        properties: node.properties.clone(),
                    });
                    id
                }
            };
            created.push(id);
        }
        for rel in &pattern.relationships {
            let src = pattern.resolve(rel.src, &created)?;
            let dst = pattern.resolve(rel.dst, &created)?;
            let id = self.alloc_rel_id();
            state.insert_relationship(Relationship::new(id, src, dst, rel.rel_type.clone()));
        }

        Ok(created)
    }
}

impl GraphState {
    /// Existing node a merge node resolves to, if any.
    fn merge_target(&self, node: &PatternNode) -> Option<NodeId> {
        let key = node.merge_on.as_deref()?;
        let value = node.properties.get(key)?;
        let label = node.labels.first()?;
        self.label_index.get(label)?.iter().copied().find(|id| {
            self.nodes.get(id).is_some_and(|n| {
                node.labels.iter().all(|l| n.has_label(l)) && n.get(key) == Some(value)
            })
        })
    }

    fn check_constraints(&self, node: &PatternNode, staged: &[&PatternNode]) -> Result<()> {
        for c in &self.constraints {
            if !node.labels.contains(&c.label) {
                continue;
            }
            let value = node.properties.get(&c.property).filter(|v| !v.is_null());
            match (c.kind, value) {
                (ConstraintType::Exists, None) => {
                    return Err(Error::ConstraintViolation(format!(
                        "Node({}) must have property `{}`",
                        c.label, c.property
                    )));
                }
                (ConstraintType::Unique, Some(v)) => {
                    let in_graph = self.label_index.get(&c.label).is_some_and(|ids| {
                        ids.iter()
                            .filter_map(|id| self.nodes.get(id))
                            .any(|n| n.get(&c.property) == Some(v))
                    });
                    let in_pattern = staged.iter().any(|n| {
                        n.labels.contains(&c.label) && n.properties.get(&c.property) == Some(v)
                    });
                    if in_graph || in_pattern {
                        return Err(Error::ConstraintViolation(format!(
                            "Node({}) already exists with {} = {}",
                            c.label, c.property, v
                        )));
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn insert_node(&mut self, node: Node) {
        for label in &node.labels {
            self.label_index.entry(label.clone()).or_default().push(node.id);
        }
        self.adjacency.insert(node.id, Vec::new());
        self.nodes.insert(node.id, node);
    }

    fn insert_relationship(&mut self, rel: Relationship) {
        self.adjacency.entry(rel.src).or_default().push(rel.id);
        if rel.src != rel.dst {
            self.adjacency.entry(rel.dst).or_default().push(rel.id);
        }
        self.relationships.insert(rel.id, rel);
    }

    fn labelled<'a>(&'a self, label: &str) -> impl Iterator<Item = &'a Node> + 'a {
        self.label_index
            .get(label)
            .into_iter()
            .flatten()
            .filter_map(|id| self.nodes.get(id))
    }
}

// ============================================================================
// MemoryTx
// ============================================================================

/// In-memory transaction. Only a mode marker; there is no MVCC.
pub struct MemoryTx {
    id: TxId,
    mode: TxMode,
}

impl Transaction for MemoryTx {
    fn mode(&self) -> TxMode { self.mode }
    fn id(&self) -> TxId { self.id }
}

// ============================================================================
// StorageBackend impl
// ============================================================================

#[async_trait]
impl StorageBackend for MemoryBackend {
    type Tx = MemoryTx;

    async fn begin_tx(&self, mode: TxMode) -> Result<MemoryTx> {
        let id = TxId(self.inner.next_tx_id.fetch_add(1, Ordering::Relaxed) + 1);
        Ok(MemoryTx { id, mode })
    }

    /// No-op: memory backend applies writes immediately, not on commit.
    async fn commit_tx(&self, _tx: MemoryTx) -> Result<()> { Ok(()) }

    /// No-op: there is nothing staged to discard.
    async fn rollback_tx(&self, _tx: MemoryTx) -> Result<()> { Ok(()) }

    // ========================================================================
    // Node CRUD
    // ========================================================================

    async fn create_node(
        &self,
        tx: &mut MemoryTx,
        labels: &[&str],
        props: PropertyMap,
    ) -> Result<NodeId> {
        tx.ensure_writable()?;
        let mut pattern = CreatePattern::new();
        pattern.node(labels, props);
        let ids = self.apply_pattern(pattern)?;
        ids.first().copied()
            .ok_or_else(|| Error::StorageError("node creation returned no id".into()))
    }

    async fn get_node(&self, _tx: &MemoryTx, id: NodeId) -> Result<Option<Node>> {
        Ok(self.inner.state.read().nodes.get(&id).cloned())
    }

    // ========================================================================
    // Relationship CRUD
    // ========================================================================

    async fn create_relationship(
        &self,
        tx: &mut MemoryTx,
        src: NodeId,
        dst: NodeId,
        rel_type: &str,
        props: PropertyMap,
    ) -> Result<RelId> {
        tx.ensure_writable()?;
        let mut state = self.inner.state.write();
        if !state.nodes.contains_key(&src) {
            return Err(Error::NotFound(format!("Source node {src}")));
        }
        if !state.nodes.contains_key(&dst) {
            return Err(Error::NotFound(format!("Target node {dst}")));
        }

        let id = self.alloc_rel_id();
        let mut rel = Relationship::new(id, src, dst, rel_type);
        rel.properties = props;
        state.insert_relationship(rel);
        Ok(id)
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    async fn get_relationships(
        &self,
        _tx: &MemoryTx,
        node: NodeId,
        dir: Direction,
        rel_type: Option<&str>,
    ) -> Result<Vec<Relationship>> {
        let state = self.inner.state.read();
        let Some(rel_ids) = state.adjacency.get(&node) else {
            return Ok(Vec::new());
        };
        Ok(rel_ids.iter()
            .filter_map(|rid| state.relationships.get(rid))
            .filter(|rel| rel.matches(node, dir, rel_type))
            .cloned()
            .collect())
    }

    /// Single read lock for the edge walk and the target lookups.
    async fn outgoing_targets(
        &self,
        _tx: &MemoryTx,
        node: NodeId,
        rel_type: &str,
    ) -> Result<Vec<Node>> {
        let state = self.inner.state.read();
        let Some(rel_ids) = state.adjacency.get(&node) else {
            return Ok(Vec::new());
        };
        Ok(rel_ids.iter()
            .filter_map(|rid| state.relationships.get(rid))
            .filter(|rel| rel.matches(node, Direction::Outgoing, Some(rel_type)))
            .filter_map(|rel| state.nodes.get(&rel.dst))
            .cloned()
            .collect())
    }

    // ========================================================================
    // Schema introspection
    // ========================================================================

    async fn node_count(&self, _tx: &MemoryTx) -> Result<u64> {
        Ok(self.inner.state.read().nodes.len() as u64)
    }

    async fn relationship_count(&self, _tx: &MemoryTx) -> Result<u64> {
        Ok(self.inner.state.read().relationships.len() as u64)
    }

    // ========================================================================
    // Scan
    // ========================================================================

    async fn nodes_by_property(
        &self,
        _tx: &MemoryTx,
        label: &str,
        key: &str,
        value: &Value,
    ) -> Result<Vec<Node>> {
        let state = self.inner.state.read();
        Ok(state.labelled(label)
            .filter(|n| n.get(key) == Some(value))
            .cloned()
            .collect())
    }

    // ========================================================================
    // Constraints
    // ========================================================================

    async fn create_constraint(
        &self,
        label: &str,
        property: &str,
        constraint_type: ConstraintType,
    ) -> Result<()> {
        let constraint = Constraint {
            label: label.to_string(),
            property: property.to_string(),
            kind: constraint_type,
        };
        let mut state = self.inner.state.write();
        if state.constraints.contains(&constraint) {
            return Ok(());
        }

        match constraint_type {
            ConstraintType::Unique => {
                let mut seen: Vec<&Value> = Vec::new();
                for v in state.labelled(label).filter_map(|n| n.get(property)) {
                    if v.is_null() {
                        continue;
                    }
                    if seen.contains(&v) {
                        return Err(Error::ConstraintViolation(format!(
                            "cannot create unique constraint on {label}.{property}: duplicate value {v}"
                        )));
                    }
                    seen.push(v);
                }
            }
            ConstraintType::Exists => {
                if let Some(n) = state.labelled(label).find(|n| n.get(property).is_none_or(Value::is_null)) {
                    return Err(Error::ConstraintViolation(format!(
                        "cannot create existence constraint on {label}.{property}: node {} lacks it",
                        n.id
                    )));
                }
            }
        }

        state.constraints.push(constraint);
        Ok(())
    }

    // ========================================================================
    // Batch operations
    // ========================================================================

    async fn create_pattern(
        &self,
        tx: &mut MemoryTx,
        pattern: CreatePattern,
    ) -> Result<Vec<NodeId>> {
        tx.ensure_writable()?;
        self.apply_pattern(pattern)
    }

    // ========================================================================
    // Vector index
    // ========================================================================

    async fn create_vector_index(&self, spec: VectorIndexSpec) -> Result<()> {
        if spec.dimension == 0 {
            return Err(Error::Validation(format!("vector index '{}' needs a dimension", spec.name)));
        }
        let mut state = self.inner.state.write();
        match state.vector_indexes.get(&spec.name) {
            Some(existing) if *existing == spec => Ok(()),
            Some(_) => Err(Error::ConstraintViolation(format!(
                "vector index '{}' already exists with a different definition",
                spec.name
            ))),
            None => {
                state.vector_indexes.insert(spec.name.clone(), spec);
                Ok(())
            }
        }
    }

    async fn vector_query(
        &self,
        _tx: &MemoryTx,
        index_name: &str,
        k: usize,
        query_vector: &[f32],
    ) -> Result<Vec<(NodeId, f64)>> {
        let state = self.inner.state.read();
        let spec = state.vector_indexes.get(index_name)
            .ok_or_else(|| Error::NotFound(format!("vector index '{index_name}'")))?;
        if query_vector.len() != spec.dimension {
            return Err(Error::Validation(format!(
                "query vector has dimension {} but index '{}' expects {}",
                query_vector.len(), index_name, spec.dimension
            )));
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        // Nodes whose embedding is missing, mis-sized or scores non-finite are
        // not in the index.
        let mut hits: Vec<(NodeId, f64)> = state.labelled(&spec.label)
            .filter_map(|n| {
                let v = n.get(&spec.property)?.as_vector()?;
                if v.len() != spec.dimension {
                    return None;
                }
                spec.similarity.score(query_vector, &v)
                    .filter(|s| s.is_finite())
                    .map(|s| (n.id, s))
            })
            .collect();

        hits.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        hits.truncate(k);
        Ok(hits)
    }
}

// ============================================================================
// Tests
// ============================================================================
