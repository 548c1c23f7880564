//! # Storage Backend Trait
//!
//! This is THE contract between the graph adapter and any storage engine.
//! Every operation the recommendation graph needs is defined here.
//!
//! ## Implementations
//!
//! | Backend | Module | Description |
//! |---------|--------|-------------|
//! | `MemoryBackend` | `memory` | In-memory, constraint-enforcing, vector-indexed |

pub mod memory;

use async_trait::async_trait;
use crate::model::*;
use crate::tx::{Transaction, TxMode};
use crate::index::VectorIndexSpec;
use crate::{Error, Result};

pub use memory::MemoryBackend;

// ============================================================================
// Constraint types
// ============================================================================

/// Type of constraint to create on a label+property pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintType {
    /// Property value must be unique for nodes with this label.
    Unique,
    /// Property must exist on all nodes with this label.
    Exists,
}

// ============================================================================
// Create patterns
// ============================================================================

/// Endpoint of a relationship inside a `CreatePattern`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternRef {
    /// The n-th node declared by the pattern itself.
    New(usize),
    /// A node already in the graph.
    Existing(NodeId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatternNode {
    pub labels: Vec<String>,
    pub properties: PropertyMap,
    /// When set, an existing node with the same labels and the same value
    /// for this property is reused instead of creating a new one.
    pub merge_on: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatternRel {
    pub src: PatternRef,
    pub dst: PatternRef,
    pub rel_type: String,
}

/// A set of nodes and relationships written as one unit, the storage-level
/// equivalent of a single Cypher `CREATE (a)-[:R]->(b), (a)-[:S]->(c)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreatePattern {
    pub nodes: Vec<PatternNode>,
    pub relationships: Vec<PatternRel>,
}

impl CreatePattern {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a node; the returned ref can be used as a relationship endpoint.
    pub fn node(&mut self, labels: &[&str], properties: PropertyMap) -> PatternRef {
        self.nodes.push(PatternNode {
            labels: labels.iter().map(|l| l.to_string()).collect(),
            properties,
            merge_on: None,
        });
        PatternRef::New(self.nodes.len() - 1)
    }

    /// Declare a node matched on `key`, like Cypher `MERGE (n:Label {key: v})`.
    /// The backend resolves the match in the same write as the rest of the
    /// pattern.
    pub fn merge_node(&mut self, labels: &[&str], key: &str, properties: PropertyMap) -> PatternRef {
        let r = self.node(labels, properties);
        if let Some(node) = self.nodes.last_mut() {
            node.merge_on = Some(key.to_string());
        }
        r
    }

    pub fn relate(&mut self, src: PatternRef, rel_type: &str, dst: PatternRef) {
        self.relationships.push(PatternRel { src, dst, rel_type: rel_type.to_string() });
    }

    /// Resolve a ref against the ids assigned to this pattern's new nodes.
    pub fn resolve(&self, r: PatternRef, created: &[NodeId]) -> Result<NodeId> {
        match r {
            PatternRef::Existing(id) => Ok(id),
            PatternRef::New(i) => created.get(i).copied().ok_or_else(|| {
                Error::StorageError(format!("pattern refers to undeclared node #{i}"))
            }),
        }
    }
}

// ============================================================================
// StorageBackend Trait
// ============================================================================

/// The universal storage contract.
///
/// Any backend that implements this trait can serve as the storage layer
/// behind `BackendGraphStore`. Backends return
/// `Error::StorageError("... not supported")` for operations they can't
/// handle rather than having a hundred optional methods.
#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// The transaction type for this backend.
    type Tx: Transaction;

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Begin a new transaction.
    async fn begin_tx(&self, mode: TxMode) -> Result<Self::Tx>;

    /// Commit a transaction.
    async fn commit_tx(&self, tx: Self::Tx) -> Result<()>;

    /// Roll back a transaction.
    async fn rollback_tx(&self, tx: Self::Tx) -> Result<()>;

    // ========================================================================
    // Node CRUD
    // ========================================================================

    /// Create a node with the given labels and properties.
    /// Fails with `ConstraintViolation` if a schema constraint would break.
    async fn create_node(
        &self,
        tx: &mut Self::Tx,
        labels: &[&str],
        props: PropertyMap,
    ) -> Result<NodeId>;

    /// Get a node by ID. Returns None if not found.
    async fn get_node(&self, tx: &Self::Tx, id: NodeId) -> Result<Option<Node>>;

    // ========================================================================
    // Relationship CRUD
    // ========================================================================

    /// Create a relationship between two nodes.
    async fn create_relationship(
        &self,
        tx: &mut Self::Tx,
        src: NodeId,
        dst: NodeId,
        rel_type: &str,
        props: PropertyMap,
    ) -> Result<RelId>;

    // ========================================================================
    // Traversal
    // ========================================================================

    /// Get all relationships of a node, optionally filtered by direction and type.
    async fn get_relationships(
        &self,
        tx: &Self::Tx,
        node: NodeId,
        dir: Direction,
        rel_type: Option<&str>,
    ) -> Result<Vec<Relationship>>;

    /// Nodes at the far end of the outgoing `rel_type` edges of `node`.
    ///
    /// Default: `get_relationships` followed by one `get_node` per edge.
    async fn outgoing_targets(
        &self,
        tx: &Self::Tx,
        node: NodeId,
        rel_type: &str,
    ) -> Result<Vec<Node>> {
        let rels = self.get_relationships(tx, node, Direction::Outgoing, Some(rel_type)).await?;
        let mut targets = Vec::with_capacity(rels.len());
        for rel in rels {
            if let Some(n) = self.get_node(tx, rel.dst).await? {
                targets.push(n);
            }
        }
        Ok(targets)
    }

    // ========================================================================
    // Schema introspection
    // ========================================================================

    /// Total number of nodes.
    async fn node_count(&self, tx: &Self::Tx) -> Result<u64>;

    /// Total number of relationships.
    async fn relationship_count(&self, tx: &Self::Tx) -> Result<u64>;

    // ========================================================================
    // Scan
    // ========================================================================

    /// Find nodes by label + property value.
    async fn nodes_by_property(
        &self,
        tx: &Self::Tx,
        label: &str,
        key: &str,
        value: &Value,
    ) -> Result<Vec<Node>>;

    // ========================================================================
    // Constraints
    // ========================================================================

    /// Create a schema constraint. Neo4j: `CREATE CONSTRAINT ... IF NOT EXISTS`.
    ///
    /// Creating an identical constraint twice is a no-op. Fails with
    /// `ConstraintViolation` if existing data already breaks it.
    async fn create_constraint(
        &self,
        _label: &str,
        _property: &str,
        _constraint_type: ConstraintType,
    ) -> Result<()> {
        Err(Error::StorageError("constraints not supported".into()))
    }

    // ========================================================================
    // Batch operations
    // ========================================================================

    /// Create every node and relationship of `pattern`, returning the ids of
    /// the pattern's nodes in declaration order. A merge node reports the id
    /// of the node it matched.
    ///
    /// Default falls back to sequential lookups, `create_node` and
    /// `create_relationship` calls and is only as atomic as the backend's
    /// transactions. Backends that can apply the whole pattern under one lock
    /// should override.
    async fn create_pattern(
        &self,
        tx: &mut Self::Tx,
        pattern: CreatePattern,
    ) -> Result<Vec<NodeId>> {
        let mut created = Vec::with_capacity(pattern.nodes.len());
        for node in &pattern.nodes {
            let mut matched = None;
            if let (Some(key), Some(label)) = (node.merge_on.as_deref(), node.labels.first()) {
                if let Some(value) = node.properties.get(key) {
                    matched = self
                        .nodes_by_property(&*tx, label, key, value)
                        .await?
                        .into_iter()
                        .find(|n| node.labels.iter().all(|l| n.has_label(l)))
                        .map(|n| n.id);
                }
            }
            let id = match matched {
                Some(id) => id,
                None => {
                    let labels: Vec<&str> = node.labels.iter().map(String::as_str).collect();
                    self.create_node(tx, &labels, node.properties.clone()).await?
                }
            };
            created.push(id);
        }
        for rel in &pattern.relationships {
            let src = pattern.resolve(rel.src, &created)?;
            let dst = pattern.resolve(rel.dst, &created)?;
            self.create_relationship(tx, src, dst, &rel.rel_type, PropertyMap::new()).await?;
        }
        Ok(created)
    }

    // ========================================================================
    // Vector index
    // ========================================================================

    /// Register a vector index. Neo4j: `CREATE VECTOR INDEX ... IF NOT EXISTS`.
    async fn create_vector_index(&self, _spec: VectorIndexSpec) -> Result<()> {
        Err(Error::StorageError("vector index not supported".into()))
    }

    /// Vector similarity search (Neo4j 5.x `db.index.vector.queryNodes`).
    ///
    /// Returns up to `k` (NodeId, score) pairs ordered by descending score.
    async fn vector_query(
        &self,
        _tx: &Self::Tx,
        _index_name: &str,
        _k: usize,
        _query_vector: &[f32],
    ) -> Result<Vec<(NodeId, f64)>> {
        Err(Error::StorageError("vector index not supported".into()))
    }
}
