//! Pairwise near-duplicate detection.
//!
//! Compares every pair of vectors by cosine similarity, so the cost is
//! O(n² · d). That is fine for indexes in the hundreds of thousands of
//! documents on a single node; anything larger needs an approximate
//! nearest-neighbour structure instead of this exhaustive scan.

use std::cmp::Ordering;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::vector::similarity::cosine_similarity;

/// A pair of documents whose vectors are at least as similar as the threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicatePair {
    pub id_a: String,
    pub id_b: String,
    pub similarity: f32,
}

/// Finds all pairs `(a, b)` with `a` before `b` in `vectors` whose cosine
/// similarity is `>= threshold`, sorted by descending similarity.
///
/// Ties keep input order, so results are deterministic.
pub fn find_duplicate_pairs(vectors: &[(String, Vec<f32>)], threshold: f32) -> Vec<DuplicatePair> {
    if vectors.len() < 2 {
        return Vec::new();
    }

    let mut pairs: Vec<(usize, usize, f32)> = (0..vectors.len())
        .into_par_iter()
        .flat_map_iter(|i| {
            let (_, a) = &vectors[i];
            ((i + 1)..vectors.len()).filter_map(move |j| {
                let similarity = cosine_similarity(a, &vectors[j].1);
                (similarity >= threshold).then_some((i, j, similarity))
            })
        })
        .collect();

    pairs.sort_by(|x, y| {
        y.2.partial_cmp(&x.2)
            .unwrap_or(Ordering::Equal)
            .then_with(|| (x.0, x.1).cmp(&(y.0, y.1)))
    });

    pairs
        .into_iter()
        .map(|(i, j, similarity)| DuplicatePair {
            id_a: vectors[i].0.clone(),
            id_b: vectors[j].0.clone(),
            similarity,
        })
        .collect()
}
