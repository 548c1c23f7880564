//! # Service Configuration
//!
//! Built once at process start and passed into every constructor. Nothing
//! below this module reads the environment.
//!
//! ```toml
//! [server]
//! bind_addr = "0.0.0.0:8080"
//!
//! [graph]
//! vector_index = "product_text_embeddings"
//! dimension = 384
//! similarity = "cosine"
//! catalog_seed = "catalog.json"
//!
//! [embedding]
//! endpoint = "http://embeddings.internal/embed"
//! timeout_ms = 3000
//!
//! [profile]
//! seed_path = "profiles.json"
//!
//! [retrieval]
//! default_score_threshold = 0.65
//! max_limit = 100
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::graph::GraphSchema;
use crate::index::SimilarityFunction;
use crate::retry::ReadRetry;
use crate::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub graph: GraphConfig,
    pub embedding: EmbeddingConfig,
    pub profile: ProfileConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_addr: "0.0.0.0:8080".to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GraphConfig {
    pub vector_index: String,
    pub dimension: usize,
    pub similarity: SimilarityFunction,
    /// Products written at startup, as a JSON array.
    pub catalog_seed: Option<PathBuf>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        let schema = GraphSchema::default();
        Self {
            vector_index: schema.vector_index,
            dimension: schema.dimension,
            similarity: schema.similarity,
            catalog_seed: None,
        }
    }
}

impl GraphConfig {
    pub fn schema(&self) -> GraphSchema {
        GraphSchema {
            vector_index: self.vector_index.clone(),
            dimension: self.dimension,
            similarity: self.similarity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmbeddingConfig {
    /// Embedding service URL. Without one the deterministic offline
    /// embedder is used.
    pub endpoint: Option<String>,
    pub timeout_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self { endpoint: None, timeout_ms: 3_000 }
    }
}

impl EmbeddingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileConfig {
    /// PostgreSQL URL, honoured when built with the `postgres` feature.
    pub database_url: Option<String>,
    pub max_connections: u32,
    /// JSON seed for the in-memory profile store.
    pub seed_path: Option<PathBuf>,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self { database_url: None, max_connections: 5, seed_path: None }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrievalConfig {
    pub default_score_threshold: f64,
    pub max_limit: usize,
    pub default_diagnosis_count: usize,
    pub max_diagnosis_count: usize,
    pub request_timeout_ms: u64,
    pub read_retry_attempts: u32,
    pub retry_min_delay_ms: u64,
    pub retry_max_delay_ms: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_score_threshold: 0.65,
            max_limit: 100,
            default_diagnosis_count: 3,
            max_diagnosis_count: 10,
            request_timeout_ms: 10_000,
            read_retry_attempts: 3,
            retry_min_delay_ms: 50,
            retry_max_delay_ms: 500,
        }
    }
}

impl RetrievalConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn read_retry(&self) -> ReadRetry {
        ReadRetry {
            max_attempts: self.read_retry_attempts,
            min_delay: Duration::from_millis(self.retry_min_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
        }
    }
}

impl ServiceConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, or fall back to defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                let config = Self::from_toml_str(&raw)
                    .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
                tracing::info!(path = %path.display(), "configuration loaded");
                Ok(config)
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let r = &self.retrieval;
        if self.graph.dimension == 0 {
            return Err(Error::Config("graph.dimension must be positive".into()));
        }
        if self.graph.vector_index.is_empty() {
            return Err(Error::Config("graph.vector_index must not be empty".into()));
        }
        if !r.default_score_threshold.is_finite() {
            return Err(Error::Config("retrieval.default_score_threshold must be finite".into()));
        }
        if r.max_limit == 0 {
            return Err(Error::Config("retrieval.max_limit must be positive".into()));
        }
        if r.max_diagnosis_count == 0 || r.default_diagnosis_count > r.max_diagnosis_count {
            return Err(Error::Config(
                "retrieval.default_diagnosis_count must be within 1..=max_diagnosis_count".into(),
            ));
        }
        if r.request_timeout_ms == 0 {
            return Err(Error::Config("retrieval.request_timeout_ms must be positive".into()));
        }
        if r.read_retry_attempts == 0 {
            return Err(Error::Config("retrieval.read_retry_attempts must be at least 1".into()));
        }
        if r.retry_min_delay_ms > r.retry_max_delay_ms {
            return Err(Error::Config("retrieval.retry_min_delay_ms exceeds retry_max_delay_ms".into()));
        }
        Ok(())
    }
}
