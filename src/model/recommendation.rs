//! Request and response shapes of the retrieval engine.

use serde::{Deserialize, Serialize};

use super::Candidate;

/// A single recommendation request. Request-scoped, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationQuery {
    /// External identifier (email or national ID) of the requesting user.
    pub external_id: String,
    /// Free text to embed. `None` synthesizes text from recent diagnoses.
    pub text: Option<String>,
    /// Restrict results to one affiliation id.
    pub affiliation: Option<String>,
    /// Candidate count for the similarity search. Signed so that the
    /// engine, not the caller, rejects non-positive values.
    pub limit: i64,
    /// Strict lower bound on similarity. `None` uses the configured default.
    pub score_threshold: Option<f64>,
    /// How many recent diagnoses feed the synthesized text.
    pub diagnosis_count: Option<usize>,
}

impl RecommendationQuery {
    pub fn new(external_id: impl Into<String>, limit: i64) -> Self {
        Self {
            external_id: external_id.into(),
            text: None,
            affiliation: None,
            limit,
            score_threshold: None,
            diagnosis_count: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_affiliation(mut self, affiliation: impl Into<String>) -> Self {
        self.affiliation = Some(affiliation.into());
        self
    }

    pub fn with_score_threshold(mut self, threshold: f64) -> Self {
        self.score_threshold = Some(threshold);
        self
    }

    pub fn with_diagnosis_count(mut self, count: usize) -> Self {
        self.diagnosis_count = Some(count);
        self
    }
}

/// A ranked recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub product_id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub score: f64,
}

impl From<Candidate> for RecommendationResult {
    fn from(c: Candidate) -> Self {
        Self {
            product_id: c.product_id,
            name: c.name,
            description: c.description,
            price: c.price,
            score: c.score,
        }
    }
}
