//! # Graph Store Adapter
//!
//! Typed, per-query-shape access to the recommendation graph:
//!
//! ```text
//! (:User {external_id, name, age, dob, latitude, longitude})
//!     -[:HAS_ALLERGY]->(:Allergens {type})
//!     -[:GENDER]->(:Gender {type})
//! (:Product {id, name, description, price, textEmbedding})
//!     -[:HAS_ALLERGY]->(:Allergens {type})
//!     -[:GENDER]->(:Gender {type})
//!     -[:IS_AFFILIATED_WITH]->(:Affiliations {id, name})
//! ```
//!
//! `GraphStore` is the seam the provisioning service and the executor are
//! written against. `BackendGraphStore` implements it over any
//! `StorageBackend`.

pub mod schema;
pub mod backend;

use async_trait::async_trait;

use crate::model::{Candidate, UserProjection, UserRecord};
use crate::Result;

pub use backend::BackendGraphStore;
pub use schema::GraphSchema;

/// Result of an atomic create-if-absent for a `User` node.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateUserOutcome {
    Created(UserRecord),
    /// A node with the same external id already exists; nothing was written.
    AlreadyExists,
}

#[async_trait]
pub trait GraphStore: Send + Sync {
    /// `MATCH (u:User {external_id: $id})-[:HAS_ALLERGY]->(a), (u)-[:GENDER]->(g)`
    async fn find_user(&self, external_id: &str) -> Result<Option<UserRecord>>;

    /// Write the `User` node and both eligibility edges in one operation.
    ///
    /// Must be race-free: of any number of concurrent calls for the same
    /// external id, exactly one returns `Created`.
    async fn create_user(&self, user: &UserProjection) -> Result<CreateUserOutcome>;

    /// Top-`limit` products by vector similarity, joined with their
    /// eligibility tags. Ordered by descending score.
    async fn similar_products(&self, vector: &[f32], limit: usize) -> Result<Vec<Candidate>>;
}
