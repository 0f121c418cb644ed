//! Two-tier memoizing embedding cache.
//!
//! Lookup order is memory, durable, provider. Provider results are written
//! back to both tiers; fallback vectors are never cached so a recovered
//! provider replaces them on the next call. Keys are SHA-256 hex digests of
//! the raw text, which makes identical text map to the same entry.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::embedding::fallback::degraded_vector;
use crate::embedding::{
    DurableCache, Embedding, EmbeddingError, EmbeddingProvider, EmbeddingSource,
};
use crate::events::{EngineEvent, EventBroadcaster};

/// Namespace for embedding entries in a shared durable cache.
pub const DURABLE_KEY_PREFIX: &str = "embedding:";

/// Serialized form stored in the durable tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub vector: Vec<f32>,
    pub inserted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
    pub memory_capacity: usize,
    pub ttl: Duration,
    pub batch_size: usize,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            memory_capacity: 10_000,
            ttl: Duration::from_secs(7 * 24 * 60 * 60),
            batch_size: 100,
        }
    }
}

/// Hex cache key and raw digest of `text`. The digest seeds fallback
/// vectors.
fn digest(text: &str) -> (String, [u8; 32]) {
    let result = Sha256::digest(text.as_bytes());
    (format!("{result:x}"), result.into())
}

/// SHA-256 hex key for `text`.
pub fn cache_key(text: &str) -> String {
    digest(text).0
}

pub struct EmbeddingCache {
    provider: Arc<dyn EmbeddingProvider>,
    durable: Option<Arc<dyn DurableCache>>,
    memory: Mutex<LruCache<String, Vec<f32>>>,
    options: CacheOptions,
    events: EventBroadcaster,
}

impl EmbeddingCache {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, options: CacheOptions) -> Self {
        let capacity = NonZeroUsize::new(options.memory_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            provider,
            durable: None,
            memory: Mutex::new(LruCache::new(capacity)),
            options,
            events: EventBroadcaster::default(),
        }
    }

    pub fn with_durable(mut self, durable: Arc<dyn DurableCache>) -> Self {
        self.durable = Some(durable);
        self
    }

    pub fn with_events(mut self, events: EventBroadcaster) -> Self {
        self.events = events;
        self
    }

    pub fn dimension(&self) -> usize {
        self.provider.dimensions()
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    pub fn memory_len(&self) -> usize {
        self.memory.lock().len()
    }

    /// Embeds one text. Never fails: provider errors produce a degraded
    /// vector.
    pub async fn embed(&self, text: &str) -> Embedding {
        let (key, digest) = digest(text);

        if let Some(hit) = self.lookup(&key).await {
            return hit;
        }

        match self.provider.embed(text).await {
            Ok(vector) if vector.len() == self.dimension() => {
                self.store(&key, &vector).await;
                Embedding::new(vector, EmbeddingSource::Provider)
            }
            Ok(vector) => {
                let error = EmbeddingError::DimensionMismatch {
                    expected: self.dimension(),
                    actual: vector.len(),
                };
                self.degrade(&key, digest, &error.to_string())
            }
            Err(e) => self.degrade(&key, digest, &e.to_string()),
        }
    }

    /// Embeds many texts in fixed-size sequential batches.
    ///
    /// Each batch sends its cache misses to the provider in one call and
    /// emits an `embedding:batch` event when done. Output order matches
    /// input order.
    pub async fn embed_many(&self, texts: &[String]) -> Vec<Embedding> {
        let total = texts.len();
        let batch_size = self.options.batch_size.max(1);
        let mut out = Vec::with_capacity(total);

        for (batch_index, batch) in texts.chunks(batch_size).enumerate() {
            let mut slots: Vec<Option<Embedding>> = Vec::with_capacity(batch.len());
            // Distinct missing keys in first-seen order, with every position that wants them
            let mut misses: Vec<(String, [u8; 32], String)> = Vec::new();
            let mut positions: HashMap<String, Vec<usize>> = HashMap::new();

            for (i, text) in batch.iter().enumerate() {
                let (key, digest) = digest(text);
                if let Some(waiting) = positions.get_mut(&key) {
                    waiting.push(i);
                    slots.push(None);
                    continue;
                }
                match self.lookup(&key).await {
                    Some(hit) => slots.push(Some(hit)),
                    None => {
                        positions.insert(key.clone(), vec![i]);
                        misses.push((key, digest, text.clone()));
                        slots.push(None);
                    }
                }
            }

            if !misses.is_empty() {
                let inputs: Vec<String> = misses.iter().map(|(_, _, t)| t.clone()).collect();
                let fetched = match self.provider.embed_batch(&inputs).await {
                    Ok(vectors) if vectors.len() == misses.len() => Ok(vectors),
                    Ok(vectors) => Err(EmbeddingError::BatchSize {
                        expected: misses.len(),
                        actual: vectors.len(),
                    }),
                    Err(e) => Err(e),
                };

                for (n, (key, digest, _)) in misses.iter().enumerate() {
                    let embedding = match &fetched {
                        Ok(vectors) if vectors[n].len() == self.dimension() => {
                            self.store(key, &vectors[n]).await;
                            Embedding::new(vectors[n].clone(), EmbeddingSource::Provider)
                        }
                        Ok(vectors) => {
                            let error = EmbeddingError::DimensionMismatch {
                                expected: self.dimension(),
                                actual: vectors[n].len(),
                            };
                            self.degrade(key, *digest, &error.to_string())
                        }
                        Err(error) => self.degrade(key, *digest, &error.to_string()),
                    };
                    for &i in positions.get(key).into_iter().flatten() {
                        slots[i] = Some(embedding.clone());
                    }
                }
            }

            out.extend(slots.into_iter().flatten());

            let completed = (batch_index * batch_size + batch.len()).min(total);
            debug!(completed, total, "embedding batch done");
            self.events
                .send(EngineEvent::EmbeddingBatch { completed, total });
        }

        out
    }

    /// Drops `text` from both tiers.
    pub async fn invalidate(&self, text: &str) {
        let key = cache_key(text);
        self.memory.lock().pop(&key);

        if let Some(durable) = &self.durable {
            if let Err(e) = durable.delete(&durable_key(&key)).await {
                warn!(key = %key, error = %e, "failed to delete durable cache entry");
            }
        }

        self.events
            .send(EngineEvent::CacheInvalidated { cache_key: key });
    }

    async fn lookup(&self, key: &str) -> Option<Embedding> {
        let cached = self.memory.lock().get(key).cloned();
        if let Some(vector) = cached {
            debug!(key, "embedding memory cache hit");
            return Some(Embedding::new(vector, EmbeddingSource::Memory));
        }

        let durable = self.durable.as_ref()?;
        let raw = match durable.get(&durable_key(key)).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "durable cache read failed");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, error = %e, "ignoring unreadable durable cache entry");
                return None;
            }
        };
        if entry.vector.len() != self.dimension() {
            warn!(
                key,
                stored = entry.vector.len(),
                expected = self.dimension(),
                "ignoring durable cache entry with wrong dimension"
            );
            return None;
        }

        debug!(key, "embedding durable cache hit");
        self.memory.lock().put(key.to_string(), entry.vector.clone());
        Some(Embedding::new(entry.vector, EmbeddingSource::Durable))
    }

    async fn store(&self, key: &str, vector: &[f32]) {
        self.memory.lock().put(key.to_string(), vector.to_vec());

        let Some(durable) = &self.durable else {
            return;
        };
        let entry = CacheEntry {
            vector: vector.to_vec(),
            inserted_at: Utc::now(),
        };
        let result = match serde_json::to_string(&entry) {
            Ok(raw) => durable.set(&durable_key(key), raw, self.options.ttl).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            warn!(key, error = %e, "durable cache write failed, continuing without it");
        }
    }

    fn degrade(&self, key: &str, digest: [u8; 32], reason: &str) -> Embedding {
        warn!(key, reason, "embedding provider failed, using degraded vector");
        self.events.send(EngineEvent::EmbeddingDegraded {
            cache_key: key.to_string(),
            reason: reason.to_string(),
        });
        Embedding::new(
            degraded_vector(digest, self.dimension()),
            EmbeddingSource::Fallback,
        )
    }
}

fn durable_key(key: &str) -> String {
    format!("{DURABLE_KEY_PREFIX}{key}")
}
