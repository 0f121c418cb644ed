//! Okapi BM25 keyword scoring.
//!
//! The index keeps per-document term frequencies plus collection-wide
//! document frequencies and total length, updated on every add/remove.
//! Average document length is derived from those counters at query time,
//! so scores always reflect the index as it is now.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::lexical::tokenizer::tokenize;

/// Term frequency saturation.
pub const K1: f32 = 1.5;

/// Length normalization strength.
pub const B: f32 = 0.75;

#[derive(Debug, Clone, Default)]
struct DocTerms {
    frequencies: HashMap<String, u32>,
    length: usize,
}

/// Inverted statistics for BM25 over one index.
#[derive(Debug, Clone, Default)]
pub struct Bm25Index {
    docs: HashMap<String, DocTerms>,
    doc_freq: HashMap<String, usize>,
    total_length: usize,
}

impl Bm25Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes `text` under `id`, replacing any previous text for that id.
    pub fn add(&mut self, id: &str, text: &str) {
        self.remove(id);

        let tokens = tokenize(text);
        let mut frequencies: HashMap<String, u32> = HashMap::new();
        for token in &tokens {
            *frequencies.entry(token.clone()).or_default() += 1;
        }
        for term in frequencies.keys() {
            *self.doc_freq.entry(term.clone()).or_default() += 1;
        }

        self.total_length += tokens.len();
        self.docs.insert(
            id.to_string(),
            DocTerms {
                frequencies,
                length: tokens.len(),
            },
        );
    }

    /// Removes `id`. Unknown ids are ignored.
    pub fn remove(&mut self, id: &str) -> bool {
        let Some(doc) = self.docs.remove(id) else {
            return false;
        };

        self.total_length -= doc.length;
        for term in doc.frequencies.keys() {
            if let Some(count) = self.doc_freq.get_mut(term) {
                *count -= 1;
                if *count == 0 {
                    self.doc_freq.remove(term);
                }
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Mean document length in tokens over the current population.
    pub fn average_length(&self) -> f32 {
        if self.docs.is_empty() {
            0.0
        } else {
            self.total_length as f32 / self.docs.len() as f32
        }
    }

    /// Inverse document frequency, `ln(1 + (N - n + 0.5) / (n + 0.5))`.
    ///
    /// Always positive, also for terms present in every document.
    pub fn idf(&self, term: &str) -> f32 {
        let n = self.doc_freq.get(term).copied().unwrap_or(0) as f32;
        let total = self.docs.len() as f32;
        (1.0 + (total - n + 0.5) / (n + 0.5)).ln()
    }

    /// Scores every document containing at least one query term.
    ///
    /// Documents matching no term are left out entirely. Results are
    /// sorted by descending score, ties by id.
    pub fn score_all(&self, query: &str) -> Vec<(String, f32)> {
        self.score_where(query, |_| true)
    }

    /// Like [`Bm25Index::score_all`], restricted to ids accepted by `keep`.
    ///
    /// IDF and average length still use the full population.
    pub fn score_where(&self, query: &str, keep: impl Fn(&str) -> bool) -> Vec<(String, f32)> {
        if self.docs.is_empty() {
            return Vec::new();
        }

        let mut seen = HashSet::new();
        let terms: Vec<(String, f32)> = tokenize(query)
            .into_iter()
            .filter(|t| self.doc_freq.contains_key(t) && seen.insert(t.clone()))
            .map(|t| {
                let idf = self.idf(&t);
                (t, idf)
            })
            .collect();
        if terms.is_empty() {
            return Vec::new();
        }

        let avg_length = self.average_length().max(f32::EPSILON);
        let mut scored: Vec<(String, f32)> = self
            .docs
            .iter()
            .filter(|(id, _)| keep(id))
            .filter_map(|(id, doc)| {
                let mut score = 0.0f32;
                let mut matched = false;
                for (term, idf) in &terms {
                    let Some(&tf) = doc.frequencies.get(term) else {
                        continue;
                    };
                    matched = true;
                    let tf = tf as f32;
                    let norm = 1.0 - B + B * doc.length as f32 / avg_length;
                    score += idf * (tf * (K1 + 1.0)) / (tf + K1 * norm);
                }
                matched.then(|| (id.clone(), score))
            })
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored
    }

    /// Raw term frequencies for a document, used for cluster labels.
    pub fn term_frequencies(&self, id: &str) -> Option<&HashMap<String, u32>> {
        self.docs.get(id).map(|d| &d.frequencies)
    }
}
