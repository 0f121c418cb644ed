//! Concurrent writers and readers on one index, on a multi-threaded runtime.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use semdex::{ClusterOptions, HashingEmbedder, SearchEngine, SearchQuery, VectorDocument};

use crate::common::{DIMENSION, INDEX, SlowProvider, engine_with, hashing_engine, insert};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_upserts_to_one_id_leave_a_consistent_winner() {
    let engine = Arc::new(engine_with(SlowProvider::new(Duration::from_millis(5))));

    let mut writers = Vec::new();
    for i in 0..16 {
        let engine = Arc::clone(&engine);
        writers.push(tokio::spawn(async move {
            engine
                .upsert_document(INDEX, VectorDocument::new("shared", format!("version marker{i}")))
                .await
        }));
    }
    for writer in writers {
        writer.await.unwrap().unwrap();
    }

    assert_eq!(engine.get_index_stats(INDEX).unwrap().document_count, 1);

    // Vector, content and keyword entry all belong to the same writer
    let stored = engine.get_document(INDEX, "shared").unwrap();
    let expected = HashingEmbedder::new(DIMENSION).embed_text(stored.content());
    assert_eq!(stored.embedding.as_deref(), Some(expected.as_slice()));

    for i in 0..16 {
        let marker = format!("marker{i}");
        let hits = engine
            .keyword_search(INDEX, &SearchQuery::new(marker.as_str()))
            .unwrap();
        if stored.content() == format!("version {marker}") {
            assert_eq!(hits.ids(), vec!["shared"]);
        } else {
            assert!(hits.is_empty(), "stale keyword entry for {marker}");
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_clustering_and_duplicates_see_a_consistent_snapshot() {
    const INITIAL: usize = 20;
    const LATE: usize = 60;

    let engine = Arc::new(hashing_engine());
    for i in 0..INITIAL {
        insert(&engine, &format!("early-{i}"), &format!("topic{} note{i}", i % 3)).await;
    }

    let writer = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            for i in 0..LATE {
                insert(&engine, &format!("late-{i}"), &format!("topic{} entry{i}", i % 3)).await;
                tokio::task::yield_now().await;
            }
        })
    };

    let mut readers = Vec::new();
    for seed in 0..4u64 {
        let engine = Arc::clone(&engine);
        readers.push(tokio::task::spawn_blocking(move || {
            let clusters = engine
                .cluster(INDEX, &ClusterOptions::new(3).with_seed(seed))
                .unwrap();
            let pairs = engine.find_duplicates(INDEX, 0.0).unwrap();
            (clusters, pairs)
        }));
    }

    for reader in readers {
        let (clusters, pairs) = reader.await.unwrap();

        let members: usize = clusters.iter().map(|c| c.document_ids.len()).sum();
        let distinct: HashSet<&String> = clusters.iter().flat_map(|c| &c.document_ids).collect();
        assert_eq!(members, distinct.len(), "a document landed in two clusters");
        assert!((INITIAL..=INITIAL + LATE).contains(&members));

        // Hashed vectors never score below zero, so a consistent snapshot of
        // n documents yields exactly n(n-1)/2 pairs
        let n = (INITIAL..=INITIAL + LATE)
            .find(|n| n * (n - 1) / 2 == pairs.len());
        assert!(n.is_some(), "{} pairs match no snapshot size", pairs.len());
    }

    writer.await.unwrap();
    assert_eq!(
        engine.get_index_stats(INDEX).unwrap().document_count,
        INITIAL + LATE
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_update_racing_a_delete_does_not_resurrect_the_document() {
    let engine = Arc::new(engine_with(SlowProvider::new(Duration::from_millis(100))));
    insert(&engine, "doc", "original content").await;

    let update = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            engine
                .update_document(INDEX, "doc", "rewritten content", None)
                .await
        })
    };

    // Let the update read the document and start embedding
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(engine.delete_document(INDEX, "doc").unwrap());

    let err = update.await.unwrap().unwrap_err();
    assert!(err.is_not_found());
    assert!(engine.get_document(INDEX, "doc").is_err());
    assert_eq!(engine.get_index_stats(INDEX).unwrap().document_count, 0);
    assert!(
        engine
            .keyword_search(INDEX, &SearchQuery::new("rewritten"))
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_update_of_a_present_document_reembeds_it() {
    let engine: SearchEngine = hashing_engine();
    insert(&engine, "doc", "original content").await;

    let outcome = engine
        .update_document(INDEX, "doc", "rewritten content", None)
        .await
        .unwrap();
    assert!(!outcome.created);

    let stored = engine.get_document(INDEX, "doc").unwrap();
    assert_eq!(stored.content(), "rewritten content");
    assert_eq!(
        stored.embedding,
        Some(HashingEmbedder::new(DIMENSION).embed_text("rewritten content"))
    );
}
