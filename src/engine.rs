//! The search engine facade.
//!
//! [`SearchEngine`] owns named indexes and the embedding cache, and exposes
//! every public operation: index management, document CRUD, semantic,
//! keyword and hybrid search, clustering, duplicate detection,
//! recommendation and personalized search.
//!
//! # Concurrency
//!
//! Each index sits behind its own `RwLock`. Embedding is the only await
//! point and always happens before the lock is taken, so no lock is held
//! across a suspension. Upserts to one index serialize on the write lock
//! (last writer wins for a shared id). Clustering and duplicate detection
//! copy the vectors under a read lock and run on that snapshot, so
//! concurrent upserts neither block nor disturb them.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::chunking::{ChunkStrategy, Chunker};
use crate::config::Settings;
use crate::embedding::{
    CacheOptions, DurableCache, EmbeddingCache, EmbeddingProvider, FileDurableCache,
    HashingEmbedder, HttpEmbeddingProvider,
};
use crate::error::{EngineError, EngineResult};
use crate::events::{EngineEvent, EventBroadcaster};
use crate::index::Collection;
use crate::search::hybrid::{combine, normalize_by_max, sort_ranked};
use crate::search::recommend::{diversify, personalize, preference_score};
use crate::search::rerank::rerank;
use crate::search::{highlights, matches_filters, query_terms};
use crate::types::{
    Cluster, ClusterOptions, HybridOptions, IndexStats, Metadata, RecommendOptions,
    SearchQuery, SearchResponse, SearchResult, UpsertOutcome, UserPreferences, VectorDocument,
};
use crate::vector::{
    ClusterId, DistanceMetric, DuplicatePair, KMeansConfig, VectorDimension, cosine_similarity,
    find_duplicate_pairs, kmeans_clustering,
};

/// Number of top terms used as a cluster label.
const LABEL_TERMS: usize = 3;

/// Candidate pool multiplier for personalized search.
const PERSONALIZED_POOL: usize = 3;

type SharedCollection = Arc<RwLock<Collection>>;

pub struct SearchEngine {
    indexes: DashMap<String, SharedCollection>,
    embeddings: EmbeddingCache,
    preferences: DashMap<String, UserPreferences>,
    events: EventBroadcaster,
    chunker: Chunker,
    strategy: ChunkStrategy,
}

/// Assembles a [`SearchEngine`] from its collaborators.
pub struct EngineBuilder {
    provider: Arc<dyn EmbeddingProvider>,
    durable: Option<Arc<dyn DurableCache>>,
    cache_options: CacheOptions,
    event_capacity: usize,
    chunker: Chunker,
    strategy: ChunkStrategy,
}

impl EngineBuilder {
    pub fn cache_options(mut self, options: CacheOptions) -> Self {
        self.cache_options = options;
        self
    }

    pub fn durable_cache(mut self, durable: Arc<dyn DurableCache>) -> Self {
        self.durable = Some(durable);
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    pub fn chunking(mut self, chunker: Chunker, strategy: ChunkStrategy) -> Self {
        self.chunker = chunker;
        self.strategy = strategy;
        self
    }

    pub fn build(self) -> SearchEngine {
        let events = EventBroadcaster::new(self.event_capacity);
        let mut embeddings =
            EmbeddingCache::new(self.provider, self.cache_options).with_events(events.clone());
        if let Some(durable) = self.durable {
            embeddings = embeddings.with_durable(durable);
        }

        SearchEngine {
            indexes: DashMap::new(),
            embeddings,
            preferences: DashMap::new(),
            events,
            chunker: self.chunker,
            strategy: self.strategy,
        }
    }
}

impl SearchEngine {
    pub fn builder(provider: Arc<dyn EmbeddingProvider>) -> EngineBuilder {
        EngineBuilder {
            provider,
            durable: None,
            cache_options: CacheOptions::default(),
            event_capacity: 256,
            chunker: Chunker::default(),
            strategy: ChunkStrategy::default(),
        }
    }

    /// Builds an engine from configuration.
    ///
    /// Without `embedding.endpoint` the offline hashing embedder is used.
    /// `cache.directory` enables the file-backed durable tier.
    pub fn from_settings(settings: &Settings) -> EngineResult<Self> {
        let embedding = &settings.embedding;
        let provider: Arc<dyn EmbeddingProvider> = match &embedding.endpoint {
            Some(endpoint) => Arc::new(
                HttpEmbeddingProvider::new(endpoint, &embedding.model, embedding.dimensions)
                    .and_then(|p| p.with_timeout(Duration::from_secs(embedding.timeout_secs)))
                    .map_err(|e| EngineError::invalid(e.to_string()))?
                    .with_api_key(embedding.api_key.clone())
                    .with_send_dimensions(embedding.send_dimensions),
            ),
            None => Arc::new(HashingEmbedder::new(embedding.dimensions)),
        };

        let mut builder = Self::builder(provider)
            .cache_options(settings.cache.options())
            .event_capacity(settings.events.capacity)
            .chunking(settings.chunking.chunker()?, settings.chunking.strategy);
        if let Some(directory) = &settings.cache.directory {
            builder = builder.durable_cache(Arc::new(FileDurableCache::new(directory)));
        }
        Ok(builder.build())
    }

    pub fn embeddings(&self) -> &EmbeddingCache {
        &self.embeddings
    }

    /// Receives every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    fn collection(&self, name: &str) -> EngineResult<SharedCollection> {
        self.indexes
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| EngineError::IndexNotFound {
                name: name.to_string(),
            })
    }

    // Index management

    pub fn create_index(
        &self,
        name: &str,
        dimension: usize,
        metric: DistanceMetric,
    ) -> EngineResult<IndexStats> {
        if name.is_empty() {
            return Err(EngineError::invalid("index name must not be empty"));
        }
        let dimension = VectorDimension::new(dimension)?;

        let stats = match self.indexes.entry(name.to_string()) {
            Entry::Occupied(_) => {
                return Err(EngineError::IndexAlreadyExists {
                    name: name.to_string(),
                });
            }
            Entry::Vacant(slot) => {
                let collection = Collection::new(name, dimension, metric);
                let stats = collection.stats();
                slot.insert(Arc::new(RwLock::new(collection)));
                stats
            }
        };

        info!(index = name, dimension = dimension.get(), %metric, "index created");
        self.events.send(EngineEvent::IndexCreated {
            index: name.to_string(),
            dimension: dimension.get(),
            metric,
        });
        Ok(stats)
    }

    pub fn drop_index(&self, name: &str) -> EngineResult<()> {
        if self.indexes.remove(name).is_none() {
            return Err(EngineError::IndexNotFound {
                name: name.to_string(),
            });
        }
        info!(index = name, "index dropped");
        Ok(())
    }

    /// Index names in sorted order.
    pub fn list_indexes(&self) -> Vec<String> {
        let mut names: Vec<String> = self.indexes.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn get_index_stats(&self, index: &str) -> EngineResult<IndexStats> {
        Ok(self.collection(index)?.read().stats())
    }

    // Documents

    /// Stores a document, embedding its content when no embedding is given.
    pub async fn upsert_document(
        &self,
        index: &str,
        mut document: VectorDocument,
    ) -> EngineResult<UpsertOutcome> {
        validate_id(&document.id)?;
        let collection = self.collection(index)?;

        let (vector, degraded) = match document.embedding.take() {
            Some(vector) => (vector, false),
            None => {
                let embedding = self.embeddings.embed(document.content()).await;
                (embedding.vector, embedding.degraded)
            }
        };

        self.store(index, &collection, document, &vector, degraded)
    }

    /// Upserts many documents, embedding the missing vectors in batches.
    ///
    /// Each document is stored atomically; the first failure stops the run
    /// and earlier documents stay stored.
    pub async fn upsert_documents(
        &self,
        index: &str,
        documents: Vec<VectorDocument>,
    ) -> EngineResult<Vec<UpsertOutcome>> {
        let collection = self.collection(index)?;
        for document in &documents {
            validate_id(&document.id)?;
            if let Some(vector) = &document.embedding {
                collection.read().check_dimension(vector)?;
            }
        }

        let texts: Vec<String> = documents
            .iter()
            .filter(|d| d.embedding.is_none())
            .map(|d| d.content().to_string())
            .collect();
        let mut computed = self.embeddings.embed_many(&texts).await.into_iter();

        let mut outcomes = Vec::with_capacity(documents.len());
        for mut document in documents {
            let (vector, degraded) = match document.embedding.take() {
                Some(vector) => (vector, false),
                None => match computed.next() {
                    Some(embedding) => (embedding.vector, embedding.degraded),
                    None => return Err(EngineError::invalid("embedding batch came back short")),
                },
            };
            outcomes.push(self.store(index, &collection, document, &vector, degraded)?);
        }
        Ok(outcomes)
    }

    fn store(
        &self,
        index: &str,
        collection: &RwLock<Collection>,
        document: VectorDocument,
        vector: &[f32],
        degraded: bool,
    ) -> EngineResult<UpsertOutcome> {
        let document_id = document.id.clone();
        let created = collection.write().upsert(document, vector, degraded)?;
        Ok(self.announce_upsert(index, document_id, created, degraded))
    }

    fn announce_upsert(
        &self,
        index: &str,
        document_id: String,
        created: bool,
        degraded: bool,
    ) -> UpsertOutcome {
        debug!(index, document_id = %document_id, created, degraded, "document upserted");
        self.events.send(EngineEvent::DocumentUpserted {
            index: index.to_string(),
            document_id: document_id.clone(),
            degraded,
        });
        UpsertOutcome {
            document_id,
            created,
            degraded,
        }
    }

    /// Replaces a document's content and re-embeds it. `metadata`, when
    /// given, replaces the stored metadata.
    ///
    /// Existence is checked again under the write lock, so a document
    /// deleted while its new content was being embedded stays deleted and
    /// the call fails with `DocumentNotFound`.
    pub async fn update_document(
        &self,
        index: &str,
        id: &str,
        content: impl Into<String>,
        metadata: Option<Metadata>,
    ) -> EngineResult<UpsertOutcome> {
        let collection = self.collection(index)?;
        let mut document = collection
            .read()
            .get(id)
            .ok_or_else(|| EngineError::DocumentNotFound {
                index: index.to_string(),
                id: id.to_string(),
            })?;
        document.set_content(content);
        if let Some(metadata) = metadata {
            document.metadata = metadata;
        }

        let embedding = self.embeddings.embed(document.content()).await;
        collection
            .write()
            .update(document, &embedding.vector, embedding.degraded)?;
        Ok(self.announce_upsert(index, id.to_string(), false, embedding.degraded))
    }

    /// Removes a document and its vector. Returns whether it existed;
    /// deleting an unknown id is not an error.
    pub fn delete_document(&self, index: &str, id: &str) -> EngineResult<bool> {
        let removed = self.collection(index)?.write().remove(id);
        if removed {
            debug!(index, document_id = id, "document deleted");
            self.events.send(EngineEvent::DocumentDeleted {
                index: index.to_string(),
                document_id: id.to_string(),
            });
        }
        Ok(removed)
    }

    pub fn get_document(&self, index: &str, id: &str) -> EngineResult<VectorDocument> {
        self.collection(index)?
            .read()
            .get(id)
            .ok_or_else(|| EngineError::DocumentNotFound {
                index: index.to_string(),
                id: id.to_string(),
            })
    }

    /// Chunks `content` and upserts every chunk as `"{prefix}#{n}"`.
    ///
    /// Each chunk carries `metadata` plus `source` and `chunk` entries.
    pub async fn ingest(
        &self,
        index: &str,
        prefix: &str,
        content: &str,
        strategy: Option<ChunkStrategy>,
        metadata: &Metadata,
    ) -> EngineResult<Vec<UpsertOutcome>> {
        let documents = self.chunk_documents(prefix, content, strategy, metadata);
        self.upsert_documents(index, documents).await
    }

    /// The documents [`ingest`](Self::ingest) would upsert, without storing
    /// them.
    pub fn chunk_documents(
        &self,
        prefix: &str,
        content: &str,
        strategy: Option<ChunkStrategy>,
        metadata: &Metadata,
    ) -> Vec<VectorDocument> {
        self.chunker
            .chunk(content, strategy.unwrap_or(self.strategy))
            .into_iter()
            .enumerate()
            .map(|(n, chunk)| {
                let mut document = VectorDocument::new(format!("{prefix}#{n}"), chunk);
                document.metadata = metadata.clone();
                document
                    .with_metadata("source", prefix)
                    .with_metadata("chunk", n)
            })
            .collect()
    }

    // Search

    pub async fn semantic_search(
        &self,
        index: &str,
        query: &SearchQuery,
    ) -> EngineResult<SearchResponse> {
        let collection = self.collection(index)?;
        let embedding = self.embeddings.embed(&query.text).await;

        let guard = collection.read();
        let mut ranked = guard.semantic_scores(&embedding.vector, |d| {
            matches_filters(&d.metadata, &query.filters)
        })?;
        sort_ranked(&mut ranked);

        Ok(SearchResponse {
            results: finish(&guard, ranked, query),
            degraded: embedding.degraded,
        })
    }

    /// BM25 ranking alone. Documents sharing no term with the query are
    /// left out, and the query is never embedded.
    pub fn keyword_search(&self, index: &str, query: &SearchQuery) -> EngineResult<SearchResponse> {
        let collection = self.collection(index)?;
        let guard = collection.read();
        let ranked = guard.keywords().score_where(&query.text, |id| {
            guard
                .document(id)
                .is_some_and(|d| matches_filters(&d.metadata, &query.filters))
        });

        Ok(SearchResponse {
            results: finish(&guard, ranked, query),
            degraded: false,
        })
    }

    /// Weighted semantic plus keyword ranking with optional re-ranking.
    pub async fn hybrid_search(
        &self,
        index: &str,
        query: &SearchQuery,
        options: HybridOptions,
    ) -> EngineResult<SearchResponse> {
        for (name, weight) in [
            ("semantic_weight", options.semantic_weight),
            ("keyword_weight", options.keyword_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(EngineError::invalid(format!(
                    "{name} must be a non-negative number, got {weight}"
                )));
            }
        }

        let collection = self.collection(index)?;
        let embedding = if options.semantic_weight > 0.0 {
            Some(self.embeddings.embed(&query.text).await)
        } else {
            None
        };

        let guard = collection.read();
        let keep = |d: &VectorDocument| matches_filters(&d.metadata, &query.filters);

        let semantic = match &embedding {
            Some(embedding) => guard.semantic_scores(&embedding.vector, keep)?,
            None => guard
                .iter_vectors()
                .filter(|(id, _)| guard.document(id).is_some_and(keep))
                .map(|(id, _)| (id.to_string(), 0.0))
                .collect(),
        };
        let mut keyword = guard.keywords().score_where(&query.text, |id| {
            guard.document(id).is_some_and(keep)
        });
        normalize_by_max(&mut keyword);

        let mut ranked = combine(
            &semantic,
            &keyword,
            options.semantic_weight,
            options.keyword_weight,
        );
        if options.rerank {
            ranked = rerank(&query.text, ranked, options.rerank_top_k, |id| {
                guard.document(id).map(VectorDocument::content)
            });
        }

        Ok(SearchResponse {
            results: finish(&guard, ranked, query),
            degraded: embedding.is_some_and(|e| e.degraded),
        })
    }

    /// Documents most similar to `source_id` by cosine similarity.
    ///
    /// Reported scores are the true similarities even when diversity
    /// jitter reorders them.
    pub fn recommend(
        &self,
        index: &str,
        source_id: &str,
        options: &RecommendOptions,
    ) -> EngineResult<SearchResponse> {
        let collection = self.collection(index)?;
        let guard = collection.read();
        let source = guard
            .vector(source_id)
            .ok_or_else(|| EngineError::DocumentNotFound {
                index: index.to_string(),
                id: source_id.to_string(),
            })?;

        let mut ranked: Vec<(String, f32)> = guard
            .iter_vectors()
            .filter(|(id, _)| *id != source_id)
            .filter(|(id, _)| {
                guard
                    .document(id)
                    .is_some_and(|d| matches_filters(&d.metadata, &options.filters))
            })
            .map(|(id, vector)| (id.to_string(), cosine_similarity(source, vector)))
            .collect();
        sort_ranked(&mut ranked);
        diversify(&mut ranked, options.diversity_factor, options.seed);
        ranked.truncate(options.top_k);

        let results = ranked
            .into_iter()
            .filter_map(|(id, score)| build_result(&guard, &id, score, None, true))
            .collect();
        Ok(SearchResponse {
            results,
            degraded: guard.is_degraded(source_id),
        })
    }

    /// Semantic search reweighted by the user's stored preferences:
    /// `score * 0.7 + preference * 0.3`.
    pub async fn personalized_search(
        &self,
        index: &str,
        user_id: &str,
        query: &SearchQuery,
    ) -> EngineResult<SearchResponse> {
        let mut base_query = query
            .clone()
            .with_top_k(query.top_k.saturating_mul(PERSONALIZED_POOL))
            .include_metadata(true);
        base_query.min_score = None;

        let mut response = self.semantic_search(index, &base_query).await?;
        let preferences = self.user_preferences(user_id);

        for result in &mut response.results {
            let preference = preference_score(&result.metadata, &preferences);
            result.score = personalize(result.score, preference);
        }
        response.results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.document_id.cmp(&b.document_id))
        });
        if let Some(min_score) = query.min_score {
            response.results.retain(|r| r.score >= min_score);
        }
        response.results.truncate(query.top_k);
        if !query.include_metadata {
            for result in &mut response.results {
                result.metadata.clear();
            }
        }
        Ok(response)
    }

    pub fn set_user_preference(&self, user_id: &str, key: impl Into<String>, weight: f32) {
        self.preferences
            .entry(user_id.to_string())
            .or_default()
            .set(key, weight);
    }

    pub fn user_preferences(&self, user_id: &str) -> UserPreferences {
        self.preferences
            .get(user_id)
            .map(|p| p.value().clone())
            .unwrap_or_default()
    }

    // Analysis

    /// Groups the index into `options.k` clusters with k-means.
    ///
    /// An empty index or `k == 0` gives no clusters; `k` above the document
    /// count is lowered to one cluster per document.
    pub fn cluster(&self, index: &str, options: &ClusterOptions) -> EngineResult<Vec<Cluster>> {
        let collection = self.collection(index)?;
        let snapshot = collection.read().snapshot();
        if snapshot.is_empty() || options.k == 0 {
            return Ok(Vec::new());
        }

        let k = options.k.min(snapshot.len());
        let (ids, vectors): (Vec<String>, Vec<Vec<f32>>) = snapshot.into_iter().unzip();
        let mut config = KMeansConfig::new(k)
            .with_max_iterations(options.max_iterations)
            .with_convergence_threshold(options.convergence_threshold);
        if let Some(seed) = options.seed {
            config = config.with_seed(seed);
        }
        let result = kmeans_clustering(&vectors, &config)?;

        let mut members: Vec<BTreeSet<String>> = vec![BTreeSet::new(); k];
        for (id, assignment) in ids.into_iter().zip(&result.assignments) {
            members[assignment.index()].insert(id);
        }

        let guard = collection.read();
        let clusters: Vec<Cluster> = result
            .centroids
            .into_iter()
            .zip(members)
            .enumerate()
            .map(|(i, (centroid, document_ids))| Cluster {
                id: ClusterId::from_index(i),
                label: cluster_label(&guard, &document_ids),
                centroid,
                document_ids,
            })
            .collect();
        drop(guard);

        info!(
            index,
            clusters = clusters.len(),
            iterations = result.iterations,
            converged = result.converged,
            "clustering completed"
        );
        self.events.send(EngineEvent::ClusterCompleted {
            index: index.to_string(),
            clusters: clusters.len(),
            iterations: result.iterations,
            converged: result.converged,
        });
        Ok(clusters)
    }

    /// All document pairs with cosine similarity `>= threshold`, most
    /// similar first.
    pub fn find_duplicates(&self, index: &str, threshold: f32) -> EngineResult<Vec<DuplicatePair>> {
        if threshold.is_nan() {
            return Err(EngineError::invalid("similarity threshold must be a number"));
        }
        let snapshot = self.collection(index)?.read().snapshot();
        let pairs = find_duplicate_pairs(&snapshot, threshold);

        info!(index, pairs = pairs.len(), threshold, "duplicate scan completed");
        self.events.send(EngineEvent::DuplicatesFound {
            index: index.to_string(),
            pairs: pairs.len(),
        });
        Ok(pairs)
    }
}

fn validate_id(id: &str) -> EngineResult<()> {
    if id.is_empty() {
        return Err(EngineError::invalid("document id must not be empty"));
    }
    Ok(())
}

/// Applies `min_score` and `top_k` to a ranked list and materializes results.
fn finish(
    collection: &Collection,
    ranked: Vec<(String, f32)>,
    query: &SearchQuery,
) -> Vec<SearchResult> {
    let terms = query_terms(&query.text);
    ranked
        .into_iter()
        .filter(|(_, score)| query.min_score.is_none_or(|min| *score >= min))
        .take(query.top_k)
        .filter_map(|(id, score)| {
            build_result(collection, &id, score, Some(&terms), query.include_metadata)
        })
        .collect()
}

fn build_result(
    collection: &Collection,
    id: &str,
    score: f32,
    terms: Option<&std::collections::HashSet<String>>,
    include_metadata: bool,
) -> Option<SearchResult> {
    let document = collection.document(id)?;
    Some(SearchResult {
        document_id: id.to_string(),
        content: document.content().to_string(),
        score,
        metadata: if include_metadata {
            document.metadata.clone()
        } else {
            Metadata::new()
        },
        highlights: terms
            .map(|terms| highlights(document.content(), terms))
            .unwrap_or_default(),
    })
}

/// Top member terms by in-cluster term frequency times index IDF.
fn cluster_label(collection: &Collection, members: &BTreeSet<String>) -> String {
    let keywords = collection.keywords();
    let mut frequencies: HashMap<&str, u32> = HashMap::new();
    for id in members {
        // Documents deleted since the snapshot no longer contribute
        if let Some(terms) = keywords.term_frequencies(id) {
            for (term, count) in terms {
                *frequencies.entry(term.as_str()).or_default() += count;
            }
        }
    }

    let mut weighted: Vec<(&str, f32)> = frequencies
        .into_iter()
        .map(|(term, tf)| (term, tf as f32 * keywords.idf(term)))
        .collect();
    weighted.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });

    weighted
        .into_iter()
        .take(LABEL_TERMS)
        .map(|(term, _)| term)
        .collect::<Vec<_>>()
        .join(", ")
}
