//! Provider outages degrade results instead of failing operations.

use std::sync::Arc;

use semdex::embedding::{CacheOptions, EmbeddingSource};
use semdex::{EngineEvent, InMemoryDurableCache, SearchEngine, SearchQuery, VectorDocument};

use crate::common::{DIMENSION, INDEX, SwitchableProvider};

fn engine_over(provider: Arc<SwitchableProvider>) -> SearchEngine {
    let engine = SearchEngine::builder(provider).build();
    engine
        .create_index(INDEX, DIMENSION, semdex::DistanceMetric::Cosine)
        .unwrap();
    engine
}

#[tokio::test]
async fn test_outage_marks_documents_and_queries_degraded() {
    let provider = SwitchableProvider::new(true);
    let engine = engine_over(provider.clone());
    let mut events = engine.subscribe();

    let outcome = engine
        .upsert_document(INDEX, VectorDocument::new("a", "payment retries"))
        .await
        .unwrap();
    assert!(outcome.degraded);
    assert!(matches!(
        events.try_recv().unwrap(),
        EngineEvent::EmbeddingDegraded { .. }
    ));

    // Fallback vectors are seeded by the text, so the same text finds itself
    let response = engine
        .semantic_search(INDEX, &SearchQuery::new("payment retries"))
        .await
        .unwrap();
    assert!(response.degraded);
    assert_eq!(response.ids(), vec!["a"]);
    assert!((response.results[0].score - 1.0).abs() < 1e-5);

    assert_eq!(engine.embeddings().memory_len(), 0);
}

#[tokio::test]
async fn test_recovered_provider_replaces_fallback() {
    let provider = SwitchableProvider::new(true);
    let engine = engine_over(provider.clone());

    let degraded = engine.embeddings().embed("late binding").await;
    assert_eq!(degraded.source, EmbeddingSource::Fallback);

    provider.set_down(false);
    let recovered = engine.embeddings().embed("late binding").await;
    assert_eq!(recovered.source, EmbeddingSource::Provider);
    assert!(!recovered.degraded);
    assert_ne!(recovered.vector, degraded.vector);

    let cached = engine.embeddings().embed("late binding").await;
    assert_eq!(cached.source, EmbeddingSource::Memory);
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn test_durable_tier_is_shared_between_engines() {
    let durable = Arc::new(InMemoryDurableCache::new());

    let first_provider = SwitchableProvider::new(false);
    let first = SearchEngine::builder(first_provider.clone())
        .durable_cache(durable.clone())
        .build();
    let computed = first.embeddings().embed("shared text").await;
    assert_eq!(computed.source, EmbeddingSource::Provider);

    let second_provider = SwitchableProvider::new(true);
    let second = SearchEngine::builder(second_provider.clone())
        .durable_cache(durable.clone())
        .build();
    let reused = second.embeddings().embed("shared text").await;
    assert_eq!(reused.source, EmbeddingSource::Durable);
    assert_eq!(reused.vector, computed.vector);
    assert_eq!(second_provider.calls(), 0);

    second.embeddings().invalidate("shared text").await;
    assert!(durable.is_empty());
    assert!(second.embeddings().embed("shared text").await.degraded);
}

#[tokio::test]
async fn test_batches_report_progress() {
    let provider = SwitchableProvider::new(false);
    let options = CacheOptions {
        batch_size: 2,
        ..CacheOptions::default()
    };
    let engine = SearchEngine::builder(provider.clone())
        .cache_options(options)
        .build();
    engine
        .create_index(INDEX, DIMENSION, semdex::DistanceMetric::Cosine)
        .unwrap();
    let mut events = engine.subscribe();

    let documents = (0..5)
        .map(|i| VectorDocument::new(format!("d{i}"), format!("document number {i}")))
        .collect();
    let outcomes = engine.upsert_documents(INDEX, documents).await.unwrap();
    assert_eq!(outcomes.len(), 5);

    let mut progress = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let EngineEvent::EmbeddingBatch { completed, total } = event {
            progress.push((completed, total));
        }
    }
    assert_eq!(progress, vec![(2, 5), (4, 5), (5, 5)]);
}
