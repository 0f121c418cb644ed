//! Semantic and hybrid ranking over small corpora.

use semdex::{HybridOptions, SearchQuery, VectorDocument};

use crate::common::{INDEX, hashing_engine, insert};

#[tokio::test]
async fn test_semantic_ranking_prefers_shared_vocabulary() {
    let engine = hashing_engine();
    insert(&engine, "rust", "rust compiler borrow checker lifetimes").await;
    insert(&engine, "bread", "sourdough starter flour hydration").await;
    insert(&engine, "tea", "green tea leaves steeping temperature").await;

    let response = engine
        .semantic_search(INDEX, &SearchQuery::new("borrow checker lifetimes").with_top_k(3))
        .await
        .unwrap();
    assert!(!response.degraded);
    assert_eq!(response.results[0].document_id, "rust");
    assert!(response.results[0].score > response.results[1].score);
}

#[tokio::test]
async fn test_keyword_only_hybrid_ranks_the_term_match_first() {
    let engine = hashing_engine();
    insert(&engine, "a", "vector databases store embeddings").await;
    insert(&engine, "b", "tokio runtime schedules tasks").await;
    insert(&engine, "c", "embeddings power semantic retrieval").await;

    let response = engine
        .hybrid_search(
            INDEX,
            &SearchQuery::new("tokio"),
            HybridOptions::weights(0.0, 1.0),
        )
        .await
        .unwrap();

    assert_eq!(response.results[0].document_id, "b");
    assert!((response.results[0].score - 1.0).abs() < 1e-6);
    // Documents without the term stay ranked with a zero keyword score
    assert_eq!(response.len(), 3);
    assert!(response.results[1..].iter().all(|r| r.score == 0.0));
}

#[tokio::test]
async fn test_filters_apply_before_top_k() {
    let engine = hashing_engine();
    for (id, lang, text) in [
        ("en-1", "en", "search engine ranking basics"),
        ("de-1", "de", "search engine ranking search engine ranking"),
        ("de-2", "de", "search engine ranking details"),
        ("en-2", "en", "ranking functions for search"),
        ("en-3", "en", "unrelated gardening notes"),
    ] {
        engine
            .upsert_document(INDEX, VectorDocument::new(id, text).with_metadata("lang", lang))
            .await
            .unwrap();
    }

    let query = SearchQuery::new("search engine ranking")
        .with_top_k(2)
        .with_filter("lang", "en");
    let response = engine.semantic_search(INDEX, &query).await.unwrap();

    assert_eq!(response.ids(), vec!["en-1", "en-2"]);
    assert!(response.results.iter().all(|r| r.metadata["lang"] == "en"));
}

#[tokio::test]
async fn test_min_score_and_metadata_toggle() {
    let engine = hashing_engine();
    engine
        .upsert_document(
            INDEX,
            VectorDocument::new("match", "kafka consumer groups").with_metadata("topic", "queues"),
        )
        .await
        .unwrap();
    insert(&engine, "other", "watercolor painting techniques").await;

    let query = SearchQuery::new("kafka consumer groups")
        .with_min_score(0.9)
        .include_metadata(false);
    let response = engine.semantic_search(INDEX, &query).await.unwrap();

    assert_eq!(response.ids(), vec!["match"]);
    assert!(response.results[0].metadata.is_empty());
}

#[tokio::test]
async fn test_highlights_mark_matching_sentences() {
    let engine = hashing_engine();
    insert(
        &engine,
        "doc",
        "Caching speeds up reads. Eviction drops cold entries. Nothing else here.",
    )
    .await;

    let response = engine
        .hybrid_search(INDEX, &SearchQuery::new("eviction"), HybridOptions::default())
        .await
        .unwrap();
    assert_eq!(
        response.results[0].highlights,
        vec!["Eviction drops cold entries.".to_string()]
    );
}

#[tokio::test]
async fn test_rerank_keeps_every_candidate() {
    let engine = hashing_engine();
    insert(&engine, "phrase", "connection pool exhaustion under load").await;
    insert(&engine, "scattered", "load balancer pool of connection slots").await;
    insert(&engine, "noise", "holiday travel checklist").await;

    let options = HybridOptions::default().with_rerank(2);
    let response = engine
        .hybrid_search(INDEX, &SearchQuery::new("connection pool exhaustion"), options)
        .await
        .unwrap();

    assert_eq!(response.len(), 3);
    assert_eq!(response.results[0].document_id, "phrase");
    assert!(response.results.iter().all(|r| r.score <= 1.0));
}

#[tokio::test]
async fn test_invalid_hybrid_weights() {
    let engine = hashing_engine();
    let err = engine
        .hybrid_search(INDEX, &SearchQuery::new("x"), HybridOptions::weights(-1.0, 1.0))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), "INVALID_ARGUMENT");
}

#[tokio::test]
async fn test_keyword_search_returns_only_term_matches() {
    let engine = hashing_engine();
    insert(&engine, "runtime", "tokio runtime schedules tasks").await;
    insert(&engine, "garden", "unrelated gardening notes").await;
    insert(&engine, "db", "postgres vacuum and index bloat").await;

    let response = engine
        .keyword_search(INDEX, &SearchQuery::new("tokio"))
        .unwrap();

    assert!(!response.degraded);
    assert_eq!(response.ids(), vec!["runtime"]);
    assert!(response.results[0].score > 0.0);
    assert_eq!(response.results[0].highlights, vec!["tokio runtime schedules tasks"]);

    let none = engine
        .keyword_search(INDEX, &SearchQuery::new("kubernetes"))
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_keyword_search_filters_before_top_k() {
    let engine = hashing_engine();
    for (id, lang, text) in [
        ("de-1", "de", "search engine ranking search engine ranking"),
        ("en-1", "en", "search engine ranking basics"),
        ("en-2", "en", "gardening notes"),
    ] {
        engine
            .upsert_document(INDEX, VectorDocument::new(id, text).with_metadata("lang", lang))
            .await
            .unwrap();
    }

    let query = SearchQuery::new("search engine ranking")
        .with_top_k(1)
        .with_filter("lang", "en");
    let response = engine.keyword_search(INDEX, &query).unwrap();

    assert_eq!(response.ids(), vec!["en-1"]);
}
