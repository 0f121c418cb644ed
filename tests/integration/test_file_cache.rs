//! File-backed durable cache and configuration-driven engines.

use std::sync::Arc;

use semdex::embedding::EmbeddingSource;
use semdex::{FileDurableCache, HashingEmbedder, SearchEngine, Settings};
use tempfile::TempDir;

#[tokio::test]
async fn test_file_cache_survives_engine_restart() {
    let dir = TempDir::new().unwrap();

    let first = SearchEngine::builder(Arc::new(HashingEmbedder::new(32)))
        .durable_cache(Arc::new(FileDurableCache::new(dir.path())))
        .build();
    let computed = first.embeddings().embed("persisted across runs").await;
    assert_eq!(computed.source, EmbeddingSource::Provider);
    drop(first);

    let second = SearchEngine::builder(Arc::new(HashingEmbedder::new(32)))
        .durable_cache(Arc::new(FileDurableCache::new(dir.path())))
        .build();
    let reloaded = second.embeddings().embed("persisted across runs").await;
    assert_eq!(reloaded.source, EmbeddingSource::Durable);
    assert_eq!(reloaded.vector, computed.vector);
}

#[tokio::test]
async fn test_engine_from_settings_file() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("settings.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
[embedding]
dimensions = 48

[cache]
directory = "{}"

[chunking]
strategy = "sentence"
"#,
            dir.path().join("cache").display()
        ),
    )
    .unwrap();

    let settings = Settings::load_from(&config_path).unwrap();
    let engine = SearchEngine::from_settings(&settings).unwrap();
    assert_eq!(engine.embeddings().dimension(), 48);
    assert_eq!(engine.embeddings().model_name(), "feature-hashing");

    engine
        .create_index("notes", 48, semdex::DistanceMetric::Cosine)
        .unwrap();
    let outcomes = engine
        .ingest(
            "notes",
            "todo",
            "Buy milk. Call the bank.",
            None,
            &semdex::Metadata::new(),
        )
        .await
        .unwrap();
    assert_eq!(outcomes.len(), 2);
    assert!(dir.path().join("cache").is_dir());
}
