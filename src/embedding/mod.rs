//! Text to vector conversion.
//!
//! [`EmbeddingCache`] is the only entry point the engine uses. It consults
//! an in-process LRU tier, then an optional [`DurableCache`], then the
//! configured [`EmbeddingProvider`]. When the provider fails the cache
//! hands out a deterministic pseudo-random vector flagged as degraded
//! instead of an error.

mod cache;
mod durable;
mod fallback;
mod hashing;
mod provider;

pub use cache::{CacheEntry, CacheOptions, DURABLE_KEY_PREFIX, EmbeddingCache, cache_key};
pub use durable::{DurableCache, FileDurableCache, InMemoryDurableCache};
pub use fallback::degraded_vector;
pub use hashing::HashingEmbedder;
pub use provider::{EmbeddingProvider, HttpEmbeddingProvider};

use serde::Serialize;
use thiserror::Error;

/// Errors raised by embedding providers.
///
/// These never escape [`EmbeddingCache`]; they become degraded vectors.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Embedding request failed: {0}\nSuggestion: Check embedding.endpoint and network access")]
    Http(#[from] reqwest::Error),

    #[error("Embedding provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed embedding payload: {0}")]
    MalformedPayload(String),

    #[error(
        "Embedding has {actual} dimensions, expected {expected}\nSuggestion: Align embedding.dimensions with the model output"
    )]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Provider returned {actual} embeddings for {expected} inputs")]
    BatchSize { expected: usize, actual: usize },
}

/// Where an [`Embedding`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingSource {
    Memory,
    Durable,
    Provider,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Embedding {
    pub vector: Vec<f32>,
    pub source: EmbeddingSource,
    /// Set when the vector is a fallback and carries no meaning.
    pub degraded: bool,
}

impl Embedding {
    pub(crate) fn new(vector: Vec<f32>, source: EmbeddingSource) -> Self {
        Self {
            degraded: source == EmbeddingSource::Fallback,
            vector,
            source,
        }
    }
}
