//! End-to-end tests for the retrieval engine.
//!
//! Scripted stores pin exact similarity scores; the in-memory graph covers
//! the full provision → embed → query path.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use pretty_assertions::assert_eq;

use common::*;
use graphrec::{
    DeterministicEmbeddingGateway, Error, ErrorKind, InMemoryProfileStore, ProductSpec,
    ProfileRecord, RecommendationEngine, RecommendationQuery,
};

fn ids(results: &[graphrec::RecommendationResult]) -> Vec<&str> {
    results.iter().map(|r| r.product_id.as_str()).collect()
}

// ============================================================================
// 1. Gender predicate drops a higher-scoring candidate
// ============================================================================

#[tokio::test]
async fn test_gender_mismatch_excluded_despite_higher_score() {
    let graph = Arc::new(ScriptedGraph::new(
        user("u1", "Peanuts", "Male"),
        vec![
            tagged(candidate("p2", 0.90), "Not-Known", "Female", Some("aff1")),
            tagged(candidate("p1", 0.80), "Not-Known", "Unisex", Some("aff1")),
        ],
    ));
    let engine = RecommendationEngine::new(
        graph,
        Arc::new(InMemoryProfileStore::new()),
        Arc::new(RecordingEmbedder::new(vec![1.0, 0.0])),
        &config(2),
    );

    let results = engine
        .recommend(RecommendationQuery::new("u1", 10).with_text("cold").with_affiliation("aff1"))
        .await
        .unwrap();

    assert_eq!(ids(&results), vec!["p1"]);
    assert_eq!(results[0].score, 0.80);
}

// ============================================================================
// 2. Empty diagnosis history still reaches the embedding gateway
// ============================================================================

#[tokio::test]
async fn test_empty_history_embeds_empty_string() {
    let embedder = Arc::new(RecordingEmbedder::new(vec![1.0, 0.0]));
    let engine = RecommendationEngine::new(
        Arc::new(ScriptedGraph::new(user("u1", "", "Male"), vec![])),
        Arc::new(InMemoryProfileStore::new()),
        embedder.clone(),
        &config(2),
    );

    let results = engine.recommend(RecommendationQuery::new("u1", 5)).await.unwrap();

    assert!(results.is_empty());
    assert_eq!(*embedder.texts.lock(), vec![String::new()]);
}

#[tokio::test]
async fn test_history_feeds_query_text() {
    let profiles = InMemoryProfileStore::new();
    let day = |d| chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 3, d, 8, 0, 0).unwrap();
    profiles.record_diagnosis("u1", "eczema", day(1));
    profiles.record_diagnosis("u1", "dry skin", day(2));
    profiles.record_diagnosis("u1", "insomnia", day(3));

    let embedder = Arc::new(RecordingEmbedder::new(vec![1.0, 0.0]));
    let engine = RecommendationEngine::new(
        Arc::new(ScriptedGraph::new(user("u1", "", "Male"), vec![])),
        Arc::new(profiles),
        embedder.clone(),
        &config(2),
    );

    engine
        .recommend(RecommendationQuery::new("u1", 5).with_diagnosis_count(2))
        .await
        .unwrap();
    assert_eq!(*embedder.texts.lock(), vec!["insomnia dry skin".to_string()]);
}

#[tokio::test]
async fn test_blank_query_text_uses_history() {
    let profiles = InMemoryProfileStore::new();
    profiles.record_diagnosis("u1", "eczema", chrono::Utc::now());

    let embedder = Arc::new(RecordingEmbedder::new(vec![1.0, 0.0]));
    let engine = RecommendationEngine::new(
        Arc::new(ScriptedGraph::new(user("u1", "", "Male"), vec![])),
        Arc::new(profiles),
        embedder.clone(),
        &config(2),
    );

    engine
        .recommend(RecommendationQuery::new("u1", 5).with_text(""))
        .await
        .unwrap();
    engine
        .recommend(RecommendationQuery::new("u1", 5).with_text("  "))
        .await
        .unwrap();
    assert_eq!(*embedder.texts.lock(), vec!["eczema".to_string(), "eczema".to_string()]);
}

// ============================================================================
// 3. Nothing above the threshold is an empty result, not an error
// ============================================================================

#[tokio::test]
async fn test_all_candidates_at_or_below_threshold() {
    let engine = RecommendationEngine::new(
        Arc::new(ScriptedGraph::new(
            user("u1", "Peanuts", "Male"),
            vec![
                candidate("p1", 0.65),
                candidate("p2", 0.64),
                candidate("p3", 0.50),
                candidate("p4", 0.30),
                candidate("p5", 0.10),
            ],
        )),
        Arc::new(InMemoryProfileStore::new()),
        Arc::new(RecordingEmbedder::new(vec![1.0, 0.0])),
        &config(2),
    );

    let results = engine
        .recommend(RecommendationQuery::new("u1", 5).with_text("x").with_score_threshold(0.65))
        .await
        .unwrap();
    assert!(results.is_empty());
}

// ============================================================================
// 4. Unreachable graph fails before any embedding call
// ============================================================================

#[tokio::test]
async fn test_unreachable_graph_fails_fast() {
    let graph = Arc::new(UnreachableGraph::default());
    let embedder = Arc::new(RecordingEmbedder::new(vec![1.0, 0.0]));
    let mut config = config(2);
    config.retrieval.read_retry_attempts = 2;
    let engine = RecommendationEngine::new(
        graph.clone(),
        Arc::new(profiles([ProfileRecord::new("u1")])),
        embedder.clone(),
        &config,
    );

    let err = engine
        .recommend(RecommendationQuery::new("u1", 5).with_text("x"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
    assert_eq!(embedder.calls(), 0);
    // The user lookup is a read and was retried.
    assert_eq!(graph.calls.load(Ordering::SeqCst), 2);
}

// ============================================================================
// 5. Ordering, ties and the strict threshold
// ============================================================================

#[tokio::test]
async fn test_results_ordered_by_score_then_id() {
    let engine = RecommendationEngine::new(
        Arc::new(ScriptedGraph::new(
            user("u1", "Peanuts", "Female"),
            vec![
                candidate("p9", 0.70),
                candidate("p3", 0.91),
                candidate("p2", 0.80),
                candidate("p1", 0.80),
                candidate("p0", 0.65),
            ],
        )),
        Arc::new(InMemoryProfileStore::new()),
        Arc::new(RecordingEmbedder::new(vec![1.0, 0.0])),
        &config(2),
    );

    let results = engine
        .recommend(RecommendationQuery::new("u1", 5).with_text("x"))
        .await
        .unwrap();
    assert_eq!(ids(&results), vec!["p3", "p1", "p2", "p9"]);
}

#[tokio::test]
async fn test_allergen_match_excluded_unless_not_known() {
    let engine = RecommendationEngine::new(
        Arc::new(ScriptedGraph::new(
            user("u1", "Peanuts", "Male"),
            vec![
                tagged(candidate("p1", 0.90), "Peanuts", "Unisex", None),
                tagged(candidate("p2", 0.85), "Gluten", "Male", None),
                tagged(candidate("p3", 0.80), "Not-Known", "Male", None),
            ],
        )),
        Arc::new(InMemoryProfileStore::new()),
        Arc::new(RecordingEmbedder::new(vec![1.0, 0.0])),
        &config(2),
    );

    let results = engine
        .recommend(RecommendationQuery::new("u1", 5).with_text("x"))
        .await
        .unwrap();
    assert_eq!(ids(&results), vec!["p2", "p3"]);
}

// ============================================================================
// 6. Request validation and limit clamping
// ============================================================================

#[tokio::test]
async fn test_limit_validation_and_clamp() {
    let graph = Arc::new(ScriptedGraph::new(user("u1", "", "Male"), vec![]));
    let embedder = Arc::new(RecordingEmbedder::new(vec![1.0, 0.0]));
    let mut config = config(2);
    config.retrieval.max_limit = 25;
    let engine = RecommendationEngine::new(
        graph.clone(),
        Arc::new(InMemoryProfileStore::new()),
        embedder.clone(),
        &config,
    );

    for limit in [0, -3] {
        let err = engine
            .recommend(RecommendationQuery::new("u1", limit).with_text("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
    assert_eq!(embedder.calls(), 0);

    engine
        .recommend(RecommendationQuery::new("u1", 10_000).with_text("x"))
        .await
        .unwrap();
    assert_eq!(*graph.limits.lock(), vec![25]);
}

#[tokio::test]
async fn test_unknown_user_is_not_found() {
    let graph = Arc::new(memory_graph(2).await);
    let embedder = Arc::new(RecordingEmbedder::new(vec![1.0, 0.0]));
    let engine = RecommendationEngine::new(
        graph.clone(),
        Arc::new(InMemoryProfileStore::new()),
        embedder.clone(),
        &config(2),
    );

    let err = engine
        .recommend(RecommendationQuery::new("nobody", 5).with_text("x"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(embedder.calls(), 0);
    assert_eq!(graph.count_users("nobody").await.unwrap(), 0);
}

// ============================================================================
// 7. Embedding failures
// ============================================================================

#[tokio::test]
async fn test_embedding_failures_are_upstream_degraded() {
    let cases: Vec<Arc<dyn graphrec::EmbeddingGateway>> = vec![
        Arc::new(FailingEmbedder(|| Error::UpstreamDegraded("503".into()))),
        Arc::new(FailingEmbedder(|| Error::Config("bad client".into()))),
        Arc::new(RecordingEmbedder::new(vec![])),
        Arc::new(RecordingEmbedder::new(vec![1.0, 0.0, 0.0])),
        Arc::new(RecordingEmbedder::new(vec![f32::INFINITY, 0.0])),
    ];

    for embedder in cases {
        let engine = RecommendationEngine::new(
            Arc::new(ScriptedGraph::new(user("u1", "", "Male"), vec![candidate("p1", 0.9)])),
            Arc::new(InMemoryProfileStore::new()),
            embedder,
            &config(2),
        );
        let err = engine
            .recommend(RecommendationQuery::new("u1", 5).with_text("x"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UpstreamDegraded, "{err}");
    }
}

#[tokio::test]
async fn test_request_deadline() {
    let mut config = config(2);
    config.retrieval.request_timeout_ms = 20;
    let engine = RecommendationEngine::new(
        Arc::new(ScriptedGraph::new(user("u1", "", "Male"), vec![])),
        Arc::new(InMemoryProfileStore::new()),
        Arc::new(SlowEmbedder { delay: Duration::from_secs(10), dimension: 2 }),
        &config,
    );

    let err = engine
        .recommend(RecommendationQuery::new("u1", 5).with_text("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout(d) if d == Duration::from_millis(20)));
}

// ============================================================================
// 8. Full stack over the in-memory graph
// ============================================================================

#[tokio::test]
async fn test_provision_and_recommend_over_memory_graph() {
    let dim = 128;
    let embedder = DeterministicEmbeddingGateway::new(dim);
    let graph = memory_graph(dim).await;
    add_products(
        &graph,
        &[
            ProductSpec::new("p1", "Peanut protein bar")
                .with_allergen("Peanuts")
                .with_embedding(embedder.embed_sync("protein bar")),
            ProductSpec::new("p2", "Oat protein bar")
                .with_allergen("Not-Known")
                .with_affiliation("aff1")
                .with_embedding(embedder.embed_sync("protein bar oat")),
            ProductSpec::new("p3", "Women's multivitamin")
                .with_gender("Female")
                .with_affiliation("aff1")
                .with_embedding(embedder.embed_sync("protein bar")),
            ProductSpec::new("p4", "Sleep tea")
                .with_affiliation("aff2")
                .with_embedding(embedder.embed_sync("chamomile tea")),
        ],
    )
    .await;
    let graph = Arc::new(graph);

    let engine = RecommendationEngine::new(
        graph.clone(),
        Arc::new(profiles([ProfileRecord::new("ada@example.com")
            .with_gender("Male")
            .with_allergy("Peanuts")])),
        Arc::new(embedder),
        &config(dim),
    );

    let query = RecommendationQuery::new("ada@example.com", 10).with_text("protein bar");
    let results = engine.recommend(query.clone()).await.unwrap();
    assert_eq!(ids(&results), vec!["p2"]);
    assert!(results[0].score > 0.65);
    assert_eq!(graph.count_users("ada@example.com").await.unwrap(), 1);

    // Second request reuses the provisioned user.
    let again = engine.recommend(query.with_affiliation("aff2")).await.unwrap();
    assert!(again.is_empty());
    assert_eq!(graph.count_users("ada@example.com").await.unwrap(), 1);
}
