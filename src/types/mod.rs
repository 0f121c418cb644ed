//! Data model shared by the engine, search paths and the CLI.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::vector::{ClusterId, DistanceMetric};

/// Arbitrary per-document attributes, matched by equality in filters.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// A document as stored in an index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorDocument {
    pub id: String,
    content: String,
    /// Computed from `content` at upsert time when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub metadata: Metadata,
    pub timestamp: DateTime<Utc>,
}

impl VectorDocument {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            embedding: None,
            metadata: Metadata::new(),
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Replaces the content. The embedding no longer describes it and is dropped.
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.embedding = None;
        self.timestamp = Utc::now();
    }
}

/// Parameters of one search call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    pub top_k: usize,
    /// Metadata equality constraints, all of which must hold.
    #[serde(default)]
    pub filters: Metadata,
    #[serde(default)]
    pub min_score: Option<f32>,
    #[serde(default = "default_true")]
    pub include_metadata: bool,
}

fn default_true() -> bool {
    true
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            top_k: 10,
            filters: Metadata::new(),
            min_score: None,
            include_metadata: true,
        }
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    #[must_use]
    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = Some(min_score);
        self
    }

    #[must_use]
    pub fn include_metadata(mut self, include: bool) -> Self {
        self.include_metadata = include;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub document_id: String,
    pub content: String,
    pub score: f32,
    /// Empty when the query did not ask for metadata.
    pub metadata: Metadata,
    /// Sentences of `content` containing a query term, in document order.
    pub highlights: Vec<String>,
}

/// Ranked results plus whether the query embedding was degraded.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    /// Semantic scores were computed against a fallback vector and
    /// should not be trusted.
    pub degraded: bool,
}

impl SearchResponse {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.document_id.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: ClusterId,
    pub centroid: Vec<f32>,
    pub document_ids: BTreeSet<String>,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub name: String,
    pub document_count: usize,
    pub dimension: usize,
    pub metric: DistanceMetric,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertOutcome {
    pub document_id: String,
    /// False when an existing document was overwritten.
    pub created: bool,
    /// The stored vector is a fallback.
    pub degraded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HybridOptions {
    pub semantic_weight: f32,
    pub keyword_weight: f32,
    pub rerank: bool,
    pub rerank_top_k: usize,
}

impl Default for HybridOptions {
    fn default() -> Self {
        Self {
            semantic_weight: 0.7,
            keyword_weight: 0.3,
            rerank: false,
            rerank_top_k: 20,
        }
    }
}

impl HybridOptions {
    pub fn weights(semantic_weight: f32, keyword_weight: f32) -> Self {
        Self {
            semantic_weight,
            keyword_weight,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_rerank(mut self, rerank_top_k: usize) -> Self {
        self.rerank = true;
        self.rerank_top_k = rerank_top_k;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterOptions {
    pub k: usize,
    pub max_iterations: usize,
    pub convergence_threshold: f32,
    /// Fixed seed for reproducible centroid initialization.
    pub seed: Option<u64>,
}

impl ClusterOptions {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iterations: crate::vector::DEFAULT_MAX_ITERATIONS,
            convergence_threshold: crate::vector::DEFAULT_CONVERGENCE_THRESHOLD,
            seed: None,
        }
    }

    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    #[must_use]
    pub fn with_convergence_threshold(mut self, threshold: f32) -> Self {
        self.convergence_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendOptions {
    pub top_k: usize,
    /// Amplitude of the random ranking jitter; 0 disables it.
    pub diversity_factor: f32,
    #[serde(default)]
    pub filters: Metadata,
    pub seed: Option<u64>,
}

impl Default for RecommendOptions {
    fn default() -> Self {
        Self {
            top_k: 10,
            diversity_factor: 0.0,
            filters: Metadata::new(),
            seed: None,
        }
    }
}

impl RecommendOptions {
    pub fn new(top_k: usize) -> Self {
        Self {
            top_k,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_diversity(mut self, diversity_factor: f32) -> Self {
        self.diversity_factor = diversity_factor;
        self
    }

    #[must_use]
    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Per-user weights keyed by `"key:value"` or bare `"key"`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserPreferences {
    pub weights: BTreeMap<String, f32>,
}

impl UserPreferences {
    pub fn set(&mut self, key: impl Into<String>, weight: f32) {
        self.weights.insert(key.into(), weight);
    }

    pub fn get(&self, key: &str) -> Option<f32> {
        self.weights.get(key).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}
