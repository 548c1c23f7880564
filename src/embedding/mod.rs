//! # Embedding Gateway
//!
//! Turns text into a query vector by delegating to an external scoring
//! service. No local model.
//!
//! ## Gateways
//!
//! - `HttpEmbeddingGateway`: `GET <endpoint>?text=...` → `{"embeddings": [...]}`
//! - `DeterministicEmbeddingGateway`: hashed bag-of-words vectors for tests and
//!   offline runs

pub mod http;
pub mod deterministic;

use async_trait::async_trait;

use crate::{Error, Result};

pub use http::HttpEmbeddingGateway;
pub use deterministic::DeterministicEmbeddingGateway;

/// Text → vector. Implementations must be side-effect free and return the
/// same vector for the same text.
#[async_trait]
pub trait EmbeddingGateway: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// The gateway name for diagnostics.
    fn name(&self) -> &str;
}

/// What is wrong with `vector` as an index entry, if anything: empty,
/// non-finite, or not the dimension the similarity index expects.
pub fn embedding_problem(vector: &[f32], expected_dimension: usize) -> Option<String> {
    if vector.is_empty() {
        return Some("embedding is empty".into());
    }
    if vector.iter().any(|x| !x.is_finite()) {
        return Some("embedding contains non-finite components".into());
    }
    if vector.len() != expected_dimension {
        return Some(format!(
            "embedding has dimension {}, index expects {expected_dimension}",
            vector.len()
        ));
    }
    None
}

/// Reject vectors that indicate a degraded upstream.
pub fn validate_embedding(vector: Vec<f32>, expected_dimension: usize) -> Result<Vec<f32>> {
    match embedding_problem(&vector, expected_dimension) {
        Some(problem) => Err(Error::UpstreamDegraded(format!("embedding service: {problem}"))),
        None => Ok(vector),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_embedding() {
        assert_eq!(validate_embedding(vec![0.1, 0.2], 2).unwrap(), vec![0.1, 0.2]);
        assert!(matches!(validate_embedding(vec![], 2), Err(Error::UpstreamDegraded(_))));
        assert!(matches!(validate_embedding(vec![f32::NAN, 0.0], 2), Err(Error::UpstreamDegraded(_))));
        assert!(matches!(validate_embedding(vec![0.1, 0.2, 0.3], 2), Err(Error::UpstreamDegraded(_))));
    }

    #[test]
    fn test_embedding_problem() {
        assert_eq!(embedding_problem(&[0.1, 0.2], 2), None);
        assert_eq!(embedding_problem(&[f32::INFINITY, 0.2], 2).as_deref(),
            Some("embedding contains non-finite components"));
    }
}
