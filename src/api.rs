//! # HTTP Boundary
//!
//! | Method | Path | Body |
//! |--------|------|------|
//! | `POST` | `/api/v1/product/recommendations` | `RecommendationRequest` → `RecommendationResponse` |
//! | `GET`  | `/health` | `{status, version}` |
//!
//! Failures render as `{"error": <kind>, "message": <text>}` with the status
//! picked by `status_for`.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::model::{RecommendationQuery, RecommendationResult};
use crate::retrieval::RecommendationEngine;
use crate::{Error, ErrorKind};

#[derive(Clone)]
pub struct ApiState {
    pub engine: Arc<RecommendationEngine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub user_id: String,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub affiliation_id: Option<String>,
    pub limit: i64,
    #[serde(default)]
    pub score_threshold: Option<f64>,
    #[serde(default)]
    pub diagnosis_count: Option<usize>,
}

impl From<RecommendationRequest> for RecommendationQuery {
    fn from(r: RecommendationRequest) -> Self {
        Self {
            external_id: r.user_id,
            text: r.query,
            affiliation: r.affiliation_id,
            limit: r.limit,
            score_threshold: r.score_threshold,
            diagnosis_count: r.diagnosis_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub recommendations: Vec<RecommendationResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::UpstreamDegraded => StatusCode::BAD_GATEWAY,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let message = match kind {
            // Storage internals stay in the logs.
            ErrorKind::Internal => "internal error".to_string(),
            _ => self.to_string(),
        };
        let body = ErrorBody { error: kind.as_str().to_string(), message };
        (status_for(kind), Json(body)).into_response()
    }
}

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/product/recommendations", post(recommend))
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(HealthResponse { status: "ok", version: env!("CARGO_PKG_VERSION") })
}

async fn recommend(
    State(state): State<ApiState>,
    payload: Result<Json<RecommendationRequest>, JsonRejection>,
) -> Result<Json<RecommendationResponse>, Error> {
    // Malformed bodies answer in the same error shape as every other failure.
    let Json(request) = payload.map_err(|rejection| Error::Validation(rejection.body_text()))?;
    let recommendations = state.engine.recommend(request.into()).await?;
    Ok(Json(RecommendationResponse { recommendations }))
}
