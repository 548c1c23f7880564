//! Shared fixtures for the end-to-end tests: scripted stores and gateways
//! with call accounting.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use graphrec::graph::CreateUserOutcome;
use graphrec::model::{NOT_KNOWN_ALLERGEN, UNISEX};
use graphrec::{
    BackendGraphStore, Candidate, EmbeddingGateway, Error, GraphSchema, GraphStore,
    InMemoryProfileStore, MemoryBackend, NodeId, ProductSpec, ProfileRecord, Result,
    ServiceConfig, UserProjection, UserRecord,
};

// ============================================================================
// Configuration
// ============================================================================

/// Defaults with a small vector dimension and fast retries.
pub fn config(dimension: usize) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.graph.dimension = dimension;
    config.retrieval.retry_min_delay_ms = 1;
    config.retrieval.retry_max_delay_ms = 2;
    config
}

pub fn schema(dimension: usize) -> GraphSchema {
    config(dimension).graph.schema()
}

// ============================================================================
// Rows
// ============================================================================

pub fn user(external_id: &str, allergen: &str, gender: &str) -> UserRecord {
    UserRecord {
        node_id: NodeId(1),
        external_id: external_id.to_string(),
        allergen: Some(allergen.to_string()),
        gender: Some(gender.to_string()),
    }
}

pub fn candidate(id: &str, score: f64) -> Candidate {
    Candidate {
        product_id: id.to_string(),
        name: format!("Product {id}"),
        description: String::new(),
        price: 10.0,
        score,
        allergen: Some(NOT_KNOWN_ALLERGEN.to_string()),
        gender: Some(UNISEX.to_string()),
        affiliation: None,
    }
}

pub fn tagged(mut c: Candidate, allergen: &str, gender: &str, affiliation: Option<&str>) -> Candidate {
    c.allergen = Some(allergen.to_string());
    c.gender = Some(gender.to_string());
    c.affiliation = affiliation.map(str::to_string);
    c
}

// ============================================================================
// Graph stores
// ============================================================================

/// Returns a fixed user and a fixed candidate list, recording the limit of
/// every similarity query.
pub struct ScriptedGraph {
    pub user: UserRecord,
    pub candidates: Vec<Candidate>,
    pub limits: Mutex<Vec<usize>>,
}

impl ScriptedGraph {
    pub fn new(user: UserRecord, candidates: Vec<Candidate>) -> Self {
        Self { user, candidates, limits: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl GraphStore for ScriptedGraph {
    async fn find_user(&self, external_id: &str) -> Result<Option<UserRecord>> {
        Ok((external_id == self.user.external_id).then(|| self.user.clone()))
    }

    async fn create_user(&self, _user: &UserProjection) -> Result<CreateUserOutcome> {
        Err(Error::StorageError("scripted graph is read-only".into()))
    }

    async fn similar_products(&self, _vector: &[f32], limit: usize) -> Result<Vec<Candidate>> {
        self.limits.lock().push(limit);
        Ok(self.candidates.iter().take(limit).cloned().collect())
    }
}

/// Every call fails as if the graph store were unreachable.
#[derive(Default)]
pub struct UnreachableGraph {
    pub calls: AtomicUsize,
}

#[async_trait]
impl GraphStore for UnreachableGraph {
    async fn find_user(&self, _external_id: &str) -> Result<Option<UserRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Error::StoreUnavailable("graph store: connection refused".into()))
    }

    async fn create_user(&self, _user: &UserProjection) -> Result<CreateUserOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Error::StoreUnavailable("graph store: connection refused".into()))
    }

    async fn similar_products(&self, _vector: &[f32], _limit: usize) -> Result<Vec<Candidate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Error::StoreUnavailable("graph store: connection refused".into()))
    }
}

/// Delegates to an inner store but fails the first `failures` user lookups.
pub struct FlakyGraph<G> {
    pub inner: G,
    pub failures: AtomicUsize,
    pub lookups: AtomicUsize,
}

impl<G> FlakyGraph<G> {
    pub fn new(inner: G, failures: usize) -> Self {
        Self { inner, failures: AtomicUsize::new(failures), lookups: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl<G: GraphStore> GraphStore for FlakyGraph<G> {
    async fn find_user(&self, external_id: &str) -> Result<Option<UserRecord>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::StoreUnavailable("graph store: timed out".into()));
        }
        self.inner.find_user(external_id).await
    }

    async fn create_user(&self, user: &UserProjection) -> Result<CreateUserOutcome> {
        self.inner.create_user(user).await
    }

    async fn similar_products(&self, vector: &[f32], limit: usize) -> Result<Vec<Candidate>> {
        self.inner.similar_products(vector, limit).await
    }
}

/// In-memory graph with the schema bootstrapped.
pub async fn memory_graph(dimension: usize) -> BackendGraphStore<MemoryBackend> {
    BackendGraphStore::open_memory(schema(dimension)).await.unwrap()
}

pub async fn add_products(graph: &BackendGraphStore<MemoryBackend>, products: &[ProductSpec]) {
    for p in products {
        graph.add_product(p).await.unwrap();
    }
}

// ============================================================================
// Profile stores
// ============================================================================

pub fn profiles(records: impl IntoIterator<Item = ProfileRecord>) -> InMemoryProfileStore {
    let store = InMemoryProfileStore::new();
    for r in records {
        store.insert_profile(r);
    }
    store
}

// ============================================================================
// Embedding gateways
// ============================================================================

/// Returns one fixed vector and records every text it was asked to embed.
pub struct RecordingEmbedder {
    pub vector: Vec<f32>,
    pub texts: Mutex<Vec<String>>,
}

impl RecordingEmbedder {
    pub fn new(vector: Vec<f32>) -> Self {
        Self { vector, texts: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> usize {
        self.texts.lock().len()
    }
}

#[async_trait]
impl EmbeddingGateway for RecordingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.texts.lock().push(text.to_string());
        Ok(self.vector.clone())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Fails every call with the given error factory.
pub struct FailingEmbedder(pub fn() -> Error);

#[async_trait]
impl EmbeddingGateway for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err((self.0)())
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Sleeps before answering.
pub struct SlowEmbedder {
    pub delay: Duration,
    pub dimension: usize,
}

#[async_trait]
impl EmbeddingGateway for SlowEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        tokio::time::sleep(self.delay).await;
        Ok(vec![1.0; self.dimension])
    }

    fn name(&self) -> &str {
        "slow"
    }
}
