//! Configuration module for the search engine.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file (`.semdex/settings.toml`)
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `SEMDEX_` and use double
//! underscores to separate nested levels:
//! - `SEMDEX_CACHE__MEMORY_CAPACITY=500` sets `cache.memory_capacity`
//! - `SEMDEX_SEARCH__TOP_K=5` sets `search.top_k`
//! - `SEMDEX_EMBEDDING__ENDPOINT=http://localhost:8080/embed` sets `embedding.endpoint`

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::chunking::{ChunkStrategy, Chunker, ChunkingError};
use crate::embedding::CacheOptions;
use crate::types::HybridOptions;

pub const CONFIG_DIR: &str = ".semdex";
pub const CONFIG_FILE: &str = "settings.toml";
const ENV_PREFIX: &str = "SEMDEX_";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Global debug mode
    #[serde(default)]
    pub debug: bool,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub clustering: ClusteringConfig,

    #[serde(default)]
    pub duplicates: DuplicatesConfig,

    #[serde(default)]
    pub events: EventsConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EmbeddingConfig {
    /// HTTP embedding endpoint. Without one the offline hashing embedder is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Send `dimensions` in provider requests
    #[serde(default)]
    pub send_dimensions: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CacheConfig {
    /// Entries kept in the in-process tier
    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: usize,

    /// Durable tier expiry in seconds
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Directory for the file-backed durable tier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ChunkingConfig {
    #[serde(default)]
    pub strategy: ChunkStrategy,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SearchConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f32,

    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f32,

    #[serde(default)]
    pub rerank: bool,

    #[serde(default = "default_rerank_top_k")]
    pub rerank_top_k: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ClusteringConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    #[serde(default = "default_convergence_threshold")]
    pub convergence_threshold: f32,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DuplicatesConfig {
    #[serde(default = "default_duplicate_threshold")]
    pub threshold: f32,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EventsConfig {
    /// Broadcast channel capacity
    #[serde(default = "default_events_capacity")]
    pub capacity: usize,
}

fn default_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_dimensions() -> usize {
    crate::vector::DEFAULT_DIMENSION
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_memory_capacity() -> usize {
    10_000
}
fn default_ttl_secs() -> u64 {
    7 * 24 * 60 * 60
}
fn default_batch_size() -> usize {
    100
}
fn default_chunk_size() -> usize {
    crate::chunking::DEFAULT_CHUNK_SIZE
}
fn default_overlap() -> usize {
    crate::chunking::DEFAULT_OVERLAP
}
fn default_top_k() -> usize {
    10
}
fn default_semantic_weight() -> f32 {
    0.7
}
fn default_keyword_weight() -> f32 {
    0.3
}
fn default_rerank_top_k() -> usize {
    20
}
fn default_max_iterations() -> usize {
    crate::vector::DEFAULT_MAX_ITERATIONS
}
fn default_convergence_threshold() -> f32 {
    crate::vector::DEFAULT_CONVERGENCE_THRESHOLD
}
fn default_duplicate_threshold() -> f32 {
    0.95
}
fn default_events_capacity() -> usize {
    256
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            embedding: EmbeddingConfig::default(),
            cache: CacheConfig::default(),
            chunking: ChunkingConfig::default(),
            search: SearchConfig::default(),
            clustering: ClusteringConfig::default(),
            duplicates: DuplicatesConfig::default(),
            events: EventsConfig::default(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            model: default_model(),
            dimensions: default_dimensions(),
            send_dimensions: false,
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory_capacity: default_memory_capacity(),
            ttl_secs: default_ttl_secs(),
            batch_size: default_batch_size(),
            directory: None,
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            strategy: ChunkStrategy::default(),
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            semantic_weight: default_semantic_weight(),
            keyword_weight: default_keyword_weight(),
            rerank: false,
            rerank_top_k: default_rerank_top_k(),
        }
    }
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            convergence_threshold: default_convergence_threshold(),
        }
    }
}

impl Default for DuplicatesConfig {
    fn default() -> Self {
        Self {
            threshold: default_duplicate_threshold(),
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: default_events_capacity(),
        }
    }
}

impl CacheConfig {
    pub fn options(&self) -> CacheOptions {
        CacheOptions {
            memory_capacity: self.memory_capacity,
            ttl: Duration::from_secs(self.ttl_secs),
            batch_size: self.batch_size,
        }
    }
}

impl ChunkingConfig {
    pub fn chunker(&self) -> Result<Chunker, ChunkingError> {
        Chunker::new(self.chunk_size, self.overlap)
    }
}

impl SearchConfig {
    pub fn hybrid_options(&self) -> HybridOptions {
        HybridOptions {
            semantic_weight: self.semantic_weight,
            keyword_weight: self.keyword_weight,
            rerank: self.rerank,
            rerank_top_k: self.rerank_top_k,
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| Path::new(CONFIG_DIR).join(CONFIG_FILE));
        Self::load_from(config_path)
    }

    /// Load configuration from a specific file, still honoring env overrides.
    /// A missing file leaves the defaults in place.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            // Double underscore separates nested levels; single underscores stay in field names
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Find `.semdex/settings.toml` by walking up from the current directory
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .map(|ancestor| ancestor.join(CONFIG_DIR))
            .find(|dir| dir.is_dir())
            .map(|dir| dir.join(CONFIG_FILE))
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file with helpful comments
    pub fn init_config_file(
        path: impl AsRef<Path>,
        force: bool,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = path.as_ref().to_path_buf();

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let defaults = Settings::default();
        let template = format!(
            r#"# semdex configuration file

# Global debug mode
debug = false

[embedding]
# HTTP endpoint answering POST {{input, model, dimensions?}} with {{embedding}}.
# Leave unset to use the offline feature-hashing embedder.
# endpoint = "http://localhost:8080/embed"
model = "{model}"
dimensions = {dimensions}
# Include `dimensions` in requests (for models with adjustable output size)
send_dimensions = false
# api_key = "sk-..."
timeout_secs = {timeout}

[cache]
# Entries kept in memory before the least recently used are evicted
memory_capacity = {capacity}
# Durable cache expiry in seconds (7 days)
ttl_secs = {ttl}
# Texts per provider batch
batch_size = {batch}
# directory = ".semdex/cache"

[chunking]
# One of: fixed-size, paragraph, sentence, recursive
strategy = "{strategy}"
chunk_size = {chunk_size}
overlap = {overlap}

[search]
top_k = {top_k}
semantic_weight = {semantic}
keyword_weight = {keyword}
rerank = false
rerank_top_k = {rerank_top_k}

[clustering]
max_iterations = {max_iterations}
convergence_threshold = {threshold}

[duplicates]
threshold = {dup}

[events]
capacity = {events}
"#,
            model = defaults.embedding.model,
            dimensions = defaults.embedding.dimensions,
            timeout = defaults.embedding.timeout_secs,
            capacity = defaults.cache.memory_capacity,
            ttl = defaults.cache.ttl_secs,
            batch = defaults.cache.batch_size,
            strategy = defaults.chunking.strategy,
            chunk_size = defaults.chunking.chunk_size,
            overlap = defaults.chunking.overlap,
            top_k = defaults.search.top_k,
            semantic = defaults.search.semantic_weight,
            keyword = defaults.search.keyword_weight,
            rerank_top_k = defaults.search.rerank_top_k,
            max_iterations = defaults.clustering.max_iterations,
            threshold = defaults.clustering.convergence_threshold,
            dup = defaults.duplicates.threshold,
            events = defaults.events.capacity,
        );

        std::fs::write(&config_path, template)?;
        Ok(config_path)
    }
}
