//! One named index: documents, their vectors and BM25 statistics.
//!
//! The three stores are only mutated together through [`Collection::upsert`],
//! [`Collection::update`] and [`Collection::remove`], so a reader holding the collection lock never
//! sees a document without its vector or keyword entry.

use std::collections::{HashMap, HashSet};

use crate::error::{EngineError, EngineResult};
use crate::lexical::Bm25Index;
use crate::types::{IndexStats, VectorDocument};
use crate::vector::{DistanceMetric, VectorArena, VectorDimension, score};

#[derive(Debug)]
pub struct Collection {
    name: String,
    metric: DistanceMetric,
    arena: VectorArena,
    /// Stored without `embedding`; the arena owns vectors.
    documents: HashMap<String, VectorDocument>,
    keywords: Bm25Index,
    /// Documents whose vector is a degraded fallback.
    degraded: HashSet<String>,
}

impl Collection {
    pub fn new(name: impl Into<String>, dimension: VectorDimension, metric: DistanceMetric) -> Self {
        Self {
            name: name.into(),
            metric,
            arena: VectorArena::new(dimension),
            documents: HashMap::new(),
            keywords: Bm25Index::new(),
            degraded: HashSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn dimension(&self) -> usize {
        self.arena.dimension().get()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Checks a vector against the index dimension.
    pub fn check_dimension(&self, vector: &[f32]) -> EngineResult<()> {
        if vector.len() != self.dimension() {
            return Err(EngineError::DimensionMismatch {
                index: self.name.clone(),
                expected: self.dimension(),
                actual: vector.len(),
            });
        }
        Ok(())
    }

    /// Stores `document` with `vector`, replacing any previous version.
    ///
    /// Returns `true` when the id is new to the index.
    pub fn upsert(
        &mut self,
        mut document: VectorDocument,
        vector: &[f32],
        degraded: bool,
    ) -> EngineResult<bool> {
        self.check_dimension(vector)?;
        let created = self.arena.insert(&document.id, vector)?;

        self.keywords.add(&document.id, document.content());
        if degraded {
            self.degraded.insert(document.id.clone());
        } else {
            self.degraded.remove(&document.id);
        }
        document.embedding = None;
        self.documents.insert(document.id.clone(), document);
        Ok(created)
    }

    /// Replaces an existing document. Unlike [`upsert`](Self::upsert) this
    /// never creates one: an id that is no longer stored is reported as
    /// `DocumentNotFound`.
    pub fn update(
        &mut self,
        document: VectorDocument,
        vector: &[f32],
        degraded: bool,
    ) -> EngineResult<()> {
        if !self.contains(&document.id) {
            return Err(EngineError::DocumentNotFound {
                index: self.name.clone(),
                id: document.id,
            });
        }
        self.upsert(document, vector, degraded).map(|_| ())
    }

    /// Removes a document and its vector. Unknown ids are a no-op.
    pub fn remove(&mut self, id: &str) -> bool {
        if self.documents.remove(id).is_none() {
            return false;
        }
        self.arena.remove(id);
        self.keywords.remove(id);
        self.degraded.remove(id);
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.documents.contains_key(id)
    }

    /// Stored document without its vector.
    pub fn document(&self, id: &str) -> Option<&VectorDocument> {
        self.documents.get(id)
    }

    /// Owned copy of a document with its embedding filled in.
    pub fn get(&self, id: &str) -> Option<VectorDocument> {
        let mut document = self.documents.get(id)?.clone();
        document.embedding = self.arena.get(id).map(<[f32]>::to_vec);
        Some(document)
    }

    pub fn vector(&self, id: &str) -> Option<&[f32]> {
        self.arena.get(id)
    }

    pub fn is_degraded(&self, id: &str) -> bool {
        self.degraded.contains(id)
    }

    /// Every document accepted by `keep`, scored against `query` under the
    /// index metric, in arena order.
    pub fn semantic_scores(
        &self,
        query: &[f32],
        keep: impl Fn(&VectorDocument) -> bool,
    ) -> EngineResult<Vec<(String, f32)>> {
        self.check_dimension(query)?;

        let mut scored = Vec::new();
        for (id, vector) in self.arena.iter() {
            let Some(document) = self.documents.get(id) else {
                continue;
            };
            if keep(document) {
                scored.push((id.to_string(), score(query, vector, self.metric)?));
            }
        }
        Ok(scored)
    }

    pub fn keywords(&self) -> &Bm25Index {
        &self.keywords
    }

    /// `(id, vector)` pairs in arena order.
    pub fn iter_vectors(&self) -> impl Iterator<Item = (&str, &[f32])> + '_ {
        self.arena.iter()
    }

    /// Owned copy of all vectors, for passes that run outside the lock.
    pub fn snapshot(&self) -> Vec<(String, Vec<f32>)> {
        self.arena.snapshot()
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            name: self.name.clone(),
            document_count: self.len(),
            dimension: self.dimension(),
            metric: self.metric,
        }
    }
}
