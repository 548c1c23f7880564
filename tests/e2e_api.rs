//! End-to-end tests for the HTTP boundary, driving the router in-process.

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::{json, Value as Json};
use tower::ServiceExt;

use common::*;
use graphrec::api::{create_router, ApiState, ErrorBody, RecommendationResponse};
use graphrec::{DeterministicEmbeddingGateway, ProductSpec, ProfileRecord, RecommendationEngine};

const DIM: usize = 128;

async fn app() -> axum::Router {
    let embedder = DeterministicEmbeddingGateway::new(DIM);
    let graph = memory_graph(DIM).await;
    add_products(
        &graph,
        &[
            ProductSpec::new("p1", "Oat protein bar")
                .with_description("high fibre snack")
                .with_price(3.5)
                .with_embedding(embedder.embed_sync("protein bar")),
            ProductSpec::new("p2", "Sleep tea").with_embedding(embedder.embed_sync("chamomile tea")),
        ],
    )
    .await;

    let engine = RecommendationEngine::new(
        Arc::new(graph),
        Arc::new(profiles([ProfileRecord::new("u1").with_gender("Male")])),
        Arc::new(embedder),
        &config(DIM),
    );
    create_router(ApiState { engine: Arc::new(engine) })
}

async fn post(app: axum::Router, body: Json) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/product/recommendations")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

#[tokio::test]
async fn test_health() {
    let response = app()
        .await
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_recommendations_ok() {
    let (status, body) = post(
        app().await,
        json!({"user_id": "u1", "query": "protein bar", "limit": 10}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let response: RecommendationResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(response.recommendations.len(), 1);
    let r = &response.recommendations[0];
    assert_eq!(r.product_id, "p1");
    assert_eq!(r.description, "high fibre snack");
    assert_eq!(r.price, 3.5);
}

#[tokio::test]
async fn test_caller_threshold_admits_more() {
    let (status, body) = post(
        app().await,
        json!({"user_id": "u1", "query": "protein bar", "limit": 10, "score_threshold": 0.1}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let response: RecommendationResponse = serde_json::from_slice(&body).unwrap();
    let ids: Vec<&str> = response.recommendations.iter().map(|r| r.product_id.as_str()).collect();
    assert_eq!(ids, vec!["p1", "p2"]);
}

#[tokio::test]
async fn test_invalid_limit_is_400() {
    let (status, body) = post(app().await, json!({"user_id": "u1", "limit": 0})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let err: ErrorBody = serde_json::from_slice(&body).unwrap();
    assert_eq!(err.error, "validation");
}

#[tokio::test]
async fn test_unknown_user_is_404() {
    let (status, body) = post(app().await, json!({"user_id": "nobody", "query": "x", "limit": 3})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let err: ErrorBody = serde_json::from_slice(&body).unwrap();
    assert_eq!(err.error, "not_found");
}

#[tokio::test]
async fn test_unreachable_graph_is_503() {
    let engine = RecommendationEngine::new(
        Arc::new(UnreachableGraph::default()),
        Arc::new(profiles([])),
        Arc::new(DeterministicEmbeddingGateway::new(2)),
        &config(2),
    );
    let app = create_router(ApiState { engine: Arc::new(engine) });

    let (status, body) = post(app, json!({"user_id": "u1", "query": "x", "limit": 3})).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let err: ErrorBody = serde_json::from_slice(&body).unwrap();
    assert_eq!(err.error, "store_unavailable");
}

#[tokio::test]
async fn test_malformed_bodies_are_400() {
    let bodies = [
        json!({"user_id": "u1"}),
        json!({"user_id": "u1", "limit": "5"}),
        json!({"limit": 5}),
    ];
    for body in bodies {
        let (status, bytes) = post(app().await, body.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {body}");
        let err: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(err.error, "validation");
        assert!(!err.message.is_empty());
    }
}
