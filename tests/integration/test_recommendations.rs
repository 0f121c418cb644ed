//! Similar-document recommendations and preference-weighted search.

use semdex::{RecommendOptions, SearchQuery, VectorDocument};

use crate::common::{INDEX, hashing_engine, insert};

async fn seeded_catalog() -> semdex::SearchEngine {
    let engine = hashing_engine();
    for (id, genre, text) in [
        ("dune", "scifi", "desert planet spice empire"),
        ("foundation", "scifi", "galactic empire psychohistory collapse"),
        ("hyperion", "scifi", "pilgrims time tombs planet"),
        ("emma", "classic", "matchmaking village society manners"),
    ] {
        engine
            .upsert_document(INDEX, VectorDocument::new(id, text).with_metadata("genre", genre))
            .await
            .unwrap();
    }
    engine
}

#[tokio::test]
async fn test_recommend_excludes_source_and_ranks_by_similarity() {
    let engine = seeded_catalog().await;

    let response = engine
        .recommend(INDEX, "dune", &RecommendOptions::new(3))
        .unwrap();
    assert!(!response.ids().contains(&"dune"));
    assert_eq!(response.len(), 3);
    assert!(
        response
            .results
            .windows(2)
            .all(|w| w[0].score >= w[1].score)
    );
    assert_eq!(response.results[2].document_id, "emma");
}

#[tokio::test]
async fn test_recommend_filters_and_seeded_diversity() {
    let engine = seeded_catalog().await;

    let filtered = engine
        .recommend(
            INDEX,
            "dune",
            &RecommendOptions::new(10).with_filter("genre", "classic"),
        )
        .unwrap();
    assert_eq!(filtered.ids(), vec!["emma"]);

    let options = RecommendOptions::new(3).with_diversity(0.5).with_seed(11);
    let first = engine.recommend(INDEX, "dune", &options).unwrap();
    let second = engine.recommend(INDEX, "dune", &options).unwrap();
    assert_eq!(first.ids(), second.ids());

    // Reported scores stay the true similarities whatever the order
    let plain = engine
        .recommend(INDEX, "dune", &RecommendOptions::new(3))
        .unwrap();
    for result in &first.results {
        let same = plain
            .results
            .iter()
            .find(|r| r.document_id == result.document_id)
            .unwrap();
        assert_eq!(same.score, result.score);
    }
}

#[tokio::test]
async fn test_preferences_reorder_search() {
    let engine = hashing_engine();
    insert(&engine, "plain", "rust async runtime").await;
    engine
        .upsert_document(
            INDEX,
            VectorDocument::new("liked", "rust async runtime").with_metadata("source", "blog"),
        )
        .await
        .unwrap();

    engine.set_user_preference("ana", "source:blog", 1.0);
    let query = SearchQuery::new("rust async runtime").with_top_k(2);
    let response = engine
        .personalized_search(INDEX, "ana", &query)
        .await
        .unwrap();

    assert_eq!(response.ids(), vec!["liked", "plain"]);
    // 1.0 * 0.7 + 1.0 * 0.3 against 1.0 * 0.7 + neutral 0.5 * 0.3
    assert!((response.results[0].score - 1.0).abs() < 1e-5);
    assert!((response.results[1].score - 0.85).abs() < 1e-5);

    // Without preferences both documents sit at the neutral blend
    let neutral = engine
        .personalized_search(INDEX, "someone-else", &query)
        .await
        .unwrap();
    assert!(neutral.results.iter().all(|r| (r.score - 0.85).abs() < 1e-5));
}

#[tokio::test]
async fn test_missing_source_document() {
    let engine = hashing_engine();
    let err = engine
        .recommend(INDEX, "ghost", &RecommendOptions::default())
        .unwrap_err();
    assert!(err.is_not_found());
}
