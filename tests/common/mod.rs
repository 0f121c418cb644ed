#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use semdex::{
    DistanceMetric, EmbeddingError, EmbeddingProvider, HashingEmbedder, SearchEngine,
    VectorDocument,
};

pub const DIMENSION: usize = 256;
pub const INDEX: &str = "docs";

/// Engine over the offline hashing embedder with an empty `docs` index.
pub fn hashing_engine() -> SearchEngine {
    let engine = SearchEngine::builder(Arc::new(HashingEmbedder::new(DIMENSION))).build();
    engine
        .create_index(INDEX, DIMENSION, DistanceMetric::Cosine)
        .expect("Failed to create index");
    engine
}

pub async fn insert(engine: &SearchEngine, id: &str, content: &str) {
    engine
        .upsert_document(INDEX, VectorDocument::new(id, content))
        .await
        .expect("Failed to upsert document");
}

/// Hashing provider that can be switched off and counts provider calls.
pub struct SwitchableProvider {
    inner: HashingEmbedder,
    down: AtomicBool,
    calls: AtomicUsize,
}

impl SwitchableProvider {
    pub fn new(down: bool) -> Arc<Self> {
        Arc::new(Self {
            inner: HashingEmbedder::new(DIMENSION),
            down: AtomicBool::new(down),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for SwitchableProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            return Err(EmbeddingError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(self.inner.embed_text(text))
    }

    fn model_name(&self) -> &str {
        "switchable"
    }

    fn dimensions(&self) -> usize {
        DIMENSION
    }
}

/// Hashing provider that sleeps before every embedding, so callers stay
/// suspended long enough for other tasks to run.
pub struct SlowProvider {
    inner: HashingEmbedder,
    delay: Duration,
}

impl SlowProvider {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            inner: HashingEmbedder::new(DIMENSION),
            delay,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for SlowProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.inner.embed_text(text))
    }

    fn model_name(&self) -> &str {
        "slow"
    }

    fn dimensions(&self) -> usize {
        DIMENSION
    }
}

/// Engine over `provider` with an empty `docs` index.
pub fn engine_with(provider: Arc<dyn EmbeddingProvider>) -> SearchEngine {
    let engine = SearchEngine::builder(provider).build();
    engine
        .create_index(INDEX, DIMENSION, DistanceMetric::Cosine)
        .expect("Failed to create index");
    engine
}
