//! semdex: an in-process semantic search engine.
//!
//! Documents live in named vector indexes and are ranked by embedding
//! similarity, BM25 keywords, or a weighted blend of both. Embeddings come
//! from a pluggable provider behind a two-tier cache that degrades to
//! deterministic pseudo-random vectors when the provider fails. On top of
//! search the engine offers k-means clustering, near-duplicate detection
//! and recommendations.

pub mod chunking;
pub mod config;
pub mod display;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod events;
pub mod index;
pub mod lexical;
pub mod logging;
pub mod search;
pub mod types;
pub mod vector;

// Explicit exports for better API clarity
pub use chunking::{ChunkStrategy, Chunker, ChunkingError};
pub use config::Settings;
pub use embedding::{
    DurableCache, Embedding, EmbeddingCache, EmbeddingError, EmbeddingProvider,
    FileDurableCache, HashingEmbedder, HttpEmbeddingProvider, InMemoryDurableCache,
};
pub use engine::{EngineBuilder, SearchEngine};
pub use error::{EngineError, EngineResult};
pub use events::{EngineEvent, EventBroadcaster};
pub use types::{
    Cluster, ClusterOptions, HybridOptions, IndexStats, Metadata, RecommendOptions,
    SearchQuery, SearchResponse, SearchResult, UpsertOutcome, UserPreferences, VectorDocument,
};
pub use vector::{DistanceMetric, DuplicatePair};
