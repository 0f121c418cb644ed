//! Index management, document CRUD and the events they publish.

use semdex::{DistanceMetric, EngineError, EngineEvent, SearchQuery, VectorDocument};
use serde_json::json;

use crate::common::{DIMENSION, INDEX, hashing_engine, insert};

#[test]
fn test_index_registry() {
    let engine = hashing_engine();
    engine
        .create_index("notes", DIMENSION, DistanceMetric::Euclidean)
        .unwrap();
    assert_eq!(engine.list_indexes(), vec!["docs", "notes"]);

    let err = engine
        .create_index(INDEX, DIMENSION, DistanceMetric::Cosine)
        .unwrap_err();
    assert!(matches!(err, EngineError::IndexAlreadyExists { .. }));
    assert!(err.to_string().contains("Suggestion:"));

    let stats = engine.get_index_stats("notes").unwrap();
    assert_eq!(stats.dimension, DIMENSION);
    assert_eq!(stats.metric, DistanceMetric::Euclidean);
    assert_eq!(stats.document_count, 0);

    engine.drop_index("notes").unwrap();
    assert!(matches!(
        engine.get_index_stats("notes"),
        Err(EngineError::IndexNotFound { .. })
    ));
}

#[tokio::test]
async fn test_upsert_replaces_and_delete_is_idempotent() {
    let engine = hashing_engine();
    insert(&engine, "a", "rust ownership and borrowing").await;

    let outcome = engine
        .upsert_document(
            INDEX,
            VectorDocument::new("a", "garbage collection pauses").with_metadata("lang", "go"),
        )
        .await
        .unwrap();
    assert!(!outcome.created);
    assert_eq!(engine.get_index_stats(INDEX).unwrap().document_count, 1);

    let stored = engine.get_document(INDEX, "a").unwrap();
    assert_eq!(stored.content(), "garbage collection pauses");
    assert_eq!(stored.metadata["lang"], json!("go"));

    assert!(engine.delete_document(INDEX, "a").unwrap());
    assert!(!engine.delete_document(INDEX, "a").unwrap());

    let response = engine
        .semantic_search(INDEX, &SearchQuery::new("garbage collection"))
        .await
        .unwrap();
    assert!(response.is_empty());
}

#[tokio::test]
async fn test_update_document_reembeds() {
    let engine = hashing_engine();
    insert(&engine, "a", "sourdough bread baking").await;
    insert(&engine, "b", "espresso coffee brewing").await;

    engine
        .update_document(INDEX, "a", "espresso coffee roasting", None)
        .await
        .unwrap();

    let response = engine
        .semantic_search(INDEX, &SearchQuery::new("espresso coffee").with_top_k(2))
        .await
        .unwrap();
    assert_eq!(response.len(), 2);
    assert!(response.results[1].score > 0.5);

    let err = engine
        .update_document(INDEX, "missing", "text", None)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_wrong_dimension_is_rejected() {
    let engine = hashing_engine();
    let err = engine
        .upsert_document(
            INDEX,
            VectorDocument::new("short", "x").with_embedding(vec![0.5; DIMENSION / 2]),
        )
        .await
        .unwrap_err();
    match err {
        EngineError::DimensionMismatch {
            expected, actual, ..
        } => {
            assert_eq!(expected, DIMENSION);
            assert_eq!(actual, DIMENSION / 2);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(engine.get_index_stats(INDEX).unwrap().document_count, 0);
}

#[tokio::test]
async fn test_events_follow_operations() {
    let engine = hashing_engine();
    let mut events = engine.subscribe();

    insert(&engine, "a", "first document").await;
    engine.delete_document(INDEX, "a").unwrap();

    let mut names = Vec::new();
    while let Ok(event) = events.try_recv() {
        names.push(event.name());
        if let EngineEvent::DocumentUpserted { degraded, .. } = event {
            assert!(!degraded);
        }
    }
    assert_eq!(names, vec!["document:upserted", "document:deleted"]);
}
