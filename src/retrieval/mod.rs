//! # Hybrid Retrieval
//!
//! One request moves through a fixed sequence of stages; the first failure
//! ends it with no partial results.
//!
//! ```text
//! ResolvingText → Provisioning → Embedding → Querying → Filtering → Done
//!       └──────────────┴─────────────┴───────────┴──────────┴──▶ Failed(kind)
//! ```
//!
//! The vector search returns up to `limit` candidates; graph predicates and
//! the score threshold are applied to that set, so a request can return
//! fewer than `limit` results, or none.

pub mod eligibility;
pub mod text;

use std::sync::Arc;
use std::time::Duration;

use crate::config::ServiceConfig;
use crate::embedding::{validate_embedding, EmbeddingGateway};
use crate::graph::GraphStore;
use crate::model::{RecommendationQuery, RecommendationResult};
use crate::profile::ProfileStore;
use crate::provisioning::ProvisioningService;
use crate::retry::ReadRetry;
use crate::{Error, ErrorKind, Result};

/// Where a request currently is. Carried on log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ResolvingText,
    Provisioning,
    Embedding,
    Querying,
    Filtering,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::ResolvingText => "resolving_text",
            Stage::Provisioning => "provisioning",
            Stage::Embedding => "embedding",
            Stage::Querying => "querying",
            Stage::Filtering => "filtering",
        }
    }
}

/// Engine limits, copied out of `ServiceConfig` at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub dimension: usize,
    pub default_score_threshold: f64,
    pub max_limit: usize,
    pub default_diagnosis_count: usize,
    pub max_diagnosis_count: usize,
    pub request_timeout: Duration,
    pub retry: ReadRetry,
}

impl EngineSettings {
    pub fn from_config(config: &ServiceConfig) -> Self {
        let r = &config.retrieval;
        Self {
            dimension: config.graph.dimension,
            default_score_threshold: r.default_score_threshold,
            max_limit: r.max_limit,
            default_diagnosis_count: r.default_diagnosis_count,
            max_diagnosis_count: r.max_diagnosis_count,
            request_timeout: r.request_timeout(),
            retry: r.read_retry(),
        }
    }
}

/// A validated request with every default filled in.
#[derive(Debug, Clone, PartialEq)]
struct Plan<'q> {
    external_id: &'q str,
    text: Option<&'q str>,
    affiliation: Option<&'q str>,
    limit: usize,
    threshold: f64,
    diagnosis_count: usize,
}

pub struct RecommendationEngine {
    graph: Arc<dyn GraphStore>,
    profiles: Arc<dyn ProfileStore>,
    embedder: Arc<dyn EmbeddingGateway>,
    provisioning: ProvisioningService,
    settings: EngineSettings,
}

impl RecommendationEngine {
    pub fn new(
        graph: Arc<dyn GraphStore>,
        profiles: Arc<dyn ProfileStore>,
        embedder: Arc<dyn EmbeddingGateway>,
        config: &ServiceConfig,
    ) -> Self {
        Self::with_settings(graph, profiles, embedder, EngineSettings::from_config(config))
    }

    pub fn with_settings(
        graph: Arc<dyn GraphStore>,
        profiles: Arc<dyn ProfileStore>,
        embedder: Arc<dyn EmbeddingGateway>,
        settings: EngineSettings,
    ) -> Self {
        let provisioning = ProvisioningService::new(graph.clone(), profiles.clone(), settings.retry);
        Self { graph, profiles, embedder, provisioning, settings }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn provisioning(&self) -> &ProvisioningService {
        &self.provisioning
    }

    /// Run one recommendation request under the configured deadline.
    #[tracing::instrument(skip_all, fields(user = %query.external_id, limit = query.limit))]
    pub async fn recommend(&self, query: RecommendationQuery) -> Result<Vec<RecommendationResult>> {
        let deadline = self.settings.request_timeout;
        let outcome = match tokio::time::timeout(deadline, self.execute(&query)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::Timeout(deadline)),
        };
        match &outcome {
            Ok(results) => tracing::info!(results = results.len(), "recommendation served"),
            Err(e) => tracing::warn!(kind = %e.kind(), error = %e, "recommendation failed"),
        }
        outcome
    }

    fn plan<'q>(&self, query: &'q RecommendationQuery) -> Result<Plan<'q>> {
        let external_id = query.external_id.trim();
        if external_id.is_empty() {
            return Err(Error::Validation("user id must not be empty".into()));
        }
        if query.limit <= 0 {
            return Err(Error::Validation(format!("limit must be positive, got {}", query.limit)));
        }
        let limit = usize::try_from(query.limit)
            .unwrap_or(usize::MAX)
            .min(self.settings.max_limit);

        let threshold = query.score_threshold.unwrap_or(self.settings.default_score_threshold);
        if !threshold.is_finite() {
            return Err(Error::Validation("score threshold must be a finite number".into()));
        }

        let diagnosis_count = match query.diagnosis_count {
            Some(0) => return Err(Error::Validation("diagnosis count must be positive".into())),
            Some(n) => n.min(self.settings.max_diagnosis_count),
            None => self.settings.default_diagnosis_count,
        };

        Ok(Plan {
            external_id,
            text: query.text.as_deref().filter(|t| !t.trim().is_empty()),
            affiliation: query.affiliation.as_deref().filter(|a| !a.is_empty()),
            limit,
            threshold,
            diagnosis_count,
        })
    }

    async fn execute(&self, query: &RecommendationQuery) -> Result<Vec<RecommendationResult>> {
        let plan = self.plan(query)?;

        enter(Stage::ResolvingText);
        let text = text::resolve_query_text(
            plan.text,
            self.profiles.as_ref(),
            plan.external_id,
            plan.diagnosis_count,
            &self.settings.retry,
        )
        .await
        .map_err(|e| failed(Stage::ResolvingText, e))?;

        enter(Stage::Provisioning);
        let user = self.provisioning
            .ensure_profile(plan.external_id)
            .await
            .map_err(|e| failed(Stage::Provisioning, e))?
            .into_user();

        enter(Stage::Embedding);
        let vector = self.embed(&text).await.map_err(|e| failed(Stage::Embedding, e))?;

        enter(Stage::Querying);
        let graph = &self.graph;
        let vector = vector.as_slice();
        let limit = plan.limit;
        let candidates = self.settings.retry
            .run("similar_products", move || graph.similar_products(vector, limit))
            .await
            .map_err(|e| failed(Stage::Querying, e.into_store_failure("graph store")))?;

        enter(Stage::Filtering);
        let considered = candidates.len();
        let ranked = eligibility::rank(candidates, &user, plan.affiliation, plan.threshold);
        tracing::debug!(considered, kept = ranked.len(), threshold = plan.threshold, "candidates filtered");

        Ok(ranked.into_iter().map(RecommendationResult::from).collect())
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let vector = self.embedder.embed(text).await.map_err(|e| match e.kind() {
            ErrorKind::UpstreamDegraded => e,
            _ => Error::UpstreamDegraded(format!("{}: {e}", self.embedder.name())),
        })?;
        validate_embedding(vector, self.settings.dimension)
    }
}

fn enter(stage: Stage) {
    tracing::debug!(stage = stage.as_str(), "stage");
}

fn failed(stage: Stage, e: Error) -> Error {
    tracing::debug!(stage = stage.as_str(), kind = %e.kind(), "stage failed");
    e
}
