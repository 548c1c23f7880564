//! Directed edges.

use serde::{Deserialize, Serialize};
use super::{NodeId, PropertyMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelId(pub u64);

impl std::fmt::Display for RelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which end of an edge a node sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// The node is the source.
    Outgoing,
    /// The node is the target.
    Incoming,
}

/// A typed edge `src -[rel_type]-> dst`.
///
/// Eligibility edges (`HAS_ALLERGY`, `GENDER`, `IS_AFFILIATED_WITH`) carry no
/// properties; the tag lives on the target node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: RelId,
    pub src: NodeId,
    pub dst: NodeId,
    pub rel_type: String,
    pub properties: PropertyMap,
}

impl Relationship {
    pub fn new(id: RelId, src: NodeId, dst: NodeId, rel_type: impl Into<String>) -> Self {
        Self { id, src, dst, rel_type: rel_type.into(), properties: PropertyMap::new() }
    }

    /// Whether this edge touches `node` on the `dir` side and, if given, has
    /// type `rel_type`.
    pub fn matches(&self, node: NodeId, dir: Direction, rel_type: Option<&str>) -> bool {
        let end = match dir {
            Direction::Outgoing => self.src,
            Direction::Incoming => self.dst,
        };
        end == node && rel_type.is_none_or(|t| self.rel_type == t)
    }
}
