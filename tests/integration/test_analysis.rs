//! Clustering and duplicate detection through the engine.

use std::sync::Arc;

use semdex::{
    ClusterOptions, DistanceMetric, EngineEvent, HashingEmbedder, SearchEngine, VectorDocument,
};

use crate::common::{INDEX, hashing_engine, insert};

#[tokio::test]
async fn test_near_duplicates_are_paired() {
    let engine = hashing_engine();
    insert(&engine, "a", "The cat sat on the mat").await;
    insert(&engine, "b", "A cat sat on a mat").await;
    insert(&engine, "c", "Quarterly revenue grew in Europe").await;

    let pairs = engine.find_duplicates(INDEX, 0.9).unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!((pairs[0].id_a.as_str(), pairs[0].id_b.as_str()), ("a", "b"));
    assert!(pairs[0].similarity >= 0.9);
}

#[tokio::test]
async fn test_two_topics_form_two_clusters() {
    let engine = hashing_engine();
    for (id, text) in [
        ("db-1", "postgres index vacuum"),
        ("db-2", "vacuum postgres index"),
        ("db-3", "index vacuum postgres"),
        ("ml-1", "gradient descent momentum"),
        ("ml-2", "momentum gradient descent"),
        ("ml-3", "descent momentum gradient"),
    ] {
        insert(&engine, id, text).await;
    }
    let mut events = engine.subscribe();

    let clusters = engine
        .cluster(INDEX, &ClusterOptions::new(2).with_seed(7))
        .unwrap();
    assert_eq!(clusters.len(), 2);

    let mut groups: Vec<Vec<&str>> = clusters
        .iter()
        .map(|c| c.document_ids.iter().map(String::as_str).collect())
        .collect();
    groups.sort();
    assert_eq!(
        groups,
        vec![vec!["db-1", "db-2", "db-3"], vec!["ml-1", "ml-2", "ml-3"]]
    );

    for cluster in &clusters {
        let label_terms: Vec<&str> = cluster.label.split(", ").collect();
        assert_eq!(label_terms.len(), 3);
        let member = cluster.document_ids.iter().next().unwrap();
        let content = engine.get_document(INDEX, member).unwrap();
        assert!(label_terms.iter().all(|t| content.content().contains(t)));
    }

    match events.try_recv().unwrap() {
        EngineEvent::ClusterCompleted {
            clusters, converged, ..
        } => {
            assert_eq!(clusters, 2);
            assert!(converged);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_cluster_count_is_capped_by_documents() {
    let engine = hashing_engine();
    insert(&engine, "only", "a single document").await;
    insert(&engine, "second", "another one entirely").await;

    let clusters = engine.cluster(INDEX, &ClusterOptions::new(5)).unwrap();
    assert_eq!(clusters.len(), 2);
    assert!(clusters.iter().all(|c| c.document_ids.len() == 1));

    assert!(engine.cluster(INDEX, &ClusterOptions::new(0)).unwrap().is_empty());
}

#[tokio::test]
async fn test_zero_threshold_pairs_every_hashed_document() {
    // Eight buckets for ten words forces hash collisions
    let engine = SearchEngine::builder(Arc::new(HashingEmbedder::new(8))).build();
    engine.create_index("tiny", 8, DistanceMetric::Cosine).unwrap();
    let words = [
        "apple", "river", "engine", "violin", "harbor", "pepper", "glacier", "lantern", "meadow",
        "quartz",
    ];
    for word in words {
        engine
            .upsert_document("tiny", VectorDocument::new(word, word))
            .await
            .unwrap();
    }

    let pairs = engine.find_duplicates("tiny", 0.0).unwrap();
    assert_eq!(pairs.len(), words.len() * (words.len() - 1) / 2);
    assert!(pairs.iter().all(|p| p.similarity >= 0.0));
}
