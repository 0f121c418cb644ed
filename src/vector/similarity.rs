//! Similarity kernels.
//!
//! Every kernel accumulates in `f64` and reports `f32`. Cosine similarity
//! of a vector with itself is exactly `1.0`, which duplicate detection
//! with a threshold of `1.0` relies on.
//!
//! [`score`] is the only public entry point and rejects mismatched lengths.
//! The raw kernels are crate-private; their callers compare vectors already
//! validated against one index dimension.

use crate::vector::types::{DistanceMetric, VectorError};

/// Scores two vectors under `metric`, larger meaning closer.
///
/// - cosine: in `[-1, 1]`
/// - euclidean: `1 / (1 + distance)`, in `(0, 1]`
/// - dot product: unnormalized
///
/// # Errors
/// Returns [`VectorError::DimensionMismatch`] when the lengths differ.
pub fn score(a: &[f32], b: &[f32], metric: DistanceMetric) -> Result<f32, VectorError> {
    if a.len() != b.len() {
        return Err(VectorError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    Ok(match metric {
        DistanceMetric::Cosine => cosine_similarity(a, b),
        DistanceMetric::Euclidean => (1.0 / (1.0 + euclidean_distance_f64(a, b))) as f32,
        DistanceMetric::DotProduct => dot_f64(a, b) as f32,
    })
}

/// Computes cosine similarity between two equal-length vectors.
///
/// Zero vectors have no direction and score `0.0`.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vectors must have same dimension");

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    // sqrt(n * n) == n exactly, so identical vectors land on 1.0
    (dot / (norm_a * norm_b).sqrt()).clamp(-1.0, 1.0) as f32
}

/// Squared Euclidean distance, used by k-means assignment.
pub(crate) fn squared_euclidean(a: &[f32], b: &[f32]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "Vectors must have same dimension");
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = f64::from(x) - f64::from(y);
            d * d
        })
        .sum()
}

fn euclidean_distance_f64(a: &[f32], b: &[f32]) -> f64 {
    squared_euclidean(a, b).sqrt()
}

fn dot_f64(a: &[f32], b: &[f32]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "Vectors must have same dimension");
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| f64::from(x) * f64::from(y))
        .sum()
}

/// Normalizes a vector in-place to unit length.
///
/// Vectors with a near-zero norm are left untouched.
pub fn normalize(vector: &mut [f32]) {
    let norm = vector
        .iter()
        .map(|&x| f64::from(x) * f64::from(x))
        .sum::<f64>()
        .sqrt();
    if norm > 1e-12 {
        for value in vector.iter_mut() {
            *value = (f64::from(*value) / norm) as f32;
        }
    }
}
