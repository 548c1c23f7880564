//! # graphrec: Hybrid Vector + Graph Recommendations
//!
//! Recommends catalog products to a user by combining vector similarity over
//! product embeddings with eligibility constraints stored as relationships in
//! a property graph (allergens, gender, affiliation).
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `StorageBackend` is the contract between the graph
//!    adapter and storage; `GraphStore`, `ProfileStore` and
//!    `EmbeddingGateway` are the contracts the engine is built against
//! 2. **Clean DTOs**: `Node`, `Relationship`, `Value` cross storage boundaries;
//!    typed rows (`UserRecord`, `Candidate`) cross adapter boundaries
//! 3. **Storage owns invariants**: user uniqueness is a schema constraint,
//!    not a read-then-write in the service
//! 4. **Fail whole**: a request either returns a full ranked list or an error
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use graphrec::{
//!     BackendGraphStore, DeterministicEmbeddingGateway, InMemoryProfileStore,
//!     RecommendationEngine, RecommendationQuery, ServiceConfig,
//! };
//!
//! # async fn example() -> graphrec::Result<()> {
//! let config = ServiceConfig::default();
//! let graph = Arc::new(BackendGraphStore::open_memory(config.graph.schema()).await?);
//! let profiles = Arc::new(InMemoryProfileStore::new());
//! let embedder = Arc::new(DeterministicEmbeddingGateway::new(config.graph.dimension));
//!
//! let engine = RecommendationEngine::new(graph, profiles, embedder, &config);
//! let results = engine
//!     .recommend(RecommendationQuery::new("ada@example.com", 10).with_text("vitamin c"))
//!     .await?;
//!
//! for r in &results {
//!     println!("{} {:.3}", r.name, r.score);
//! }
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod storage;
pub mod tx;
pub mod index;
pub mod graph;
pub mod profile;
pub mod embedding;
pub mod provisioning;
pub mod retrieval;
pub mod catalog;
pub mod retry;
pub mod config;
pub mod telemetry;
pub mod api;

use std::time::Duration;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    Node, Relationship, Value, PropertyMap, NodeId, RelId, Direction,
    ProfileRecord, UserProjection, UserRecord, ProductSpec, Candidate,
    RecommendationQuery, RecommendationResult,
};

// ============================================================================
// Re-exports: Storage
// ============================================================================

pub use storage::{StorageBackend, MemoryBackend, ConstraintType, CreatePattern};
pub use tx::{Transaction, TxMode, TxId};
pub use index::{SimilarityFunction, VectorIndexSpec};

// ============================================================================
// Re-exports: Adapters and services
// ============================================================================

pub use graph::{GraphStore, BackendGraphStore, GraphSchema, CreateUserOutcome};
pub use profile::{ProfileStore, InMemoryProfileStore};
pub use embedding::{EmbeddingGateway, HttpEmbeddingGateway, DeterministicEmbeddingGateway};
pub use provisioning::{ProvisioningService, ProvisionOutcome};
pub use retrieval::RecommendationEngine;
pub use retry::ReadRetry;
pub use config::ServiceConfig;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Upstream degraded: {0}")]
    UpstreamDegraded(String),

    #[error("Request exceeded deadline of {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Transaction error: {0}")]
    TxError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome classification surfaced to callers of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    StoreUnavailable,
    UpstreamDegraded,
    Timeout,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::StoreUnavailable => "store_unavailable",
            ErrorKind::UpstreamDegraded => "upstream_degraded",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
            Error::UpstreamDegraded(_) => ErrorKind::UpstreamDegraded,
            Error::Timeout(_) => ErrorKind::Timeout,
            Error::ConstraintViolation(_)
            | Error::StorageError(_)
            | Error::TxError(_)
            | Error::Config(_)
            | Error::Io(_) => ErrorKind::Internal,
        }
    }

    /// Only an unreachable store is worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::StoreUnavailable(_))
    }

    /// Fold a storage-layer failure into `StoreUnavailable`, tagged with the
    /// store it came from. Request-level kinds pass through untouched.
    pub fn into_store_failure(self, store: &str) -> Self {
        match self.kind() {
            ErrorKind::Internal => Error::StoreUnavailable(format!("{store}: {self}")),
            _ => self,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
