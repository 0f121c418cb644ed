//! K-means clustering over index vectors.
//!
//! # Algorithm Details
//! - Distance metric: Euclidean
//! - Initialization: k distinct input vectors sampled without replacement
//! - Empty clusters keep their previous centroid
//! - Stops once the largest centroid displacement drops below the
//!   convergence threshold, or after `max_iterations`
//! - Membership is recomputed once against the final centroids, so the
//!   reported assignments always agree with the reported centroids
//!
//! # Performance Characteristics
//! - O(n * k * d * iterations) time complexity
//! - O(k * d) space for centroids
//! - Assignment step runs on the rayon pool

use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use thiserror::Error;

use crate::vector::similarity::squared_euclidean;
use crate::vector::types::ClusterId;

/// Default maximum number of iterations.
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Default convergence threshold on centroid displacement.
pub const DEFAULT_CONVERGENCE_THRESHOLD: f32 = 1e-4;

/// Parameters for a single k-means run.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansConfig {
    pub k: usize,
    pub max_iterations: usize,
    pub convergence_threshold: f32,
    /// Fixes centroid initialization for reproducible runs.
    pub seed: Option<u64>,
}

impl KMeansConfig {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            convergence_threshold: DEFAULT_CONVERGENCE_THRESHOLD,
            seed: None,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_convergence_threshold(mut self, threshold: f32) -> Self {
        self.convergence_threshold = threshold;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Result of K-means clustering operation.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansResult {
    /// Cluster centroids, each a vector of the same dimension as input vectors.
    pub centroids: Vec<Vec<f32>>,

    /// Cluster assignment for each input vector.
    pub assignments: Vec<ClusterId>,

    /// Number of update iterations performed.
    pub iterations: usize,

    /// Whether the displacement threshold was reached before `max_iterations`.
    pub converged: bool,
}

/// Errors that can occur during clustering operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClusteringError {
    #[error(
        "Empty vector set provided for clustering\nSuggestion: Ensure documents are indexed before clustering"
    )]
    EmptyVectorSet,

    #[error("Invalid cluster count: {0}\nSuggestion: Use k between 1 and the number of vectors")]
    InvalidClusterCount(usize),

    #[error(
        "Dimension mismatch in vectors\nSuggestion: Ensure all vectors come from the same embedding model"
    )]
    DimensionMismatch,
}

/// Performs K-means clustering on a set of vectors.
///
/// # Arguments
/// * `vectors` - Input vectors to cluster (must be non-empty and same dimension)
/// * `config` - Cluster count and stopping criteria; `k` must be in `1..=vectors.len()`
#[must_use = "clustering results should be used or the computation is wasted"]
pub fn kmeans_clustering(
    vectors: &[Vec<f32>],
    config: &KMeansConfig,
) -> Result<KMeansResult, ClusteringError> {
    if vectors.is_empty() {
        return Err(ClusteringError::EmptyVectorSet);
    }

    let k = config.k;
    if k == 0 || k > vectors.len() {
        return Err(ClusteringError::InvalidClusterCount(k));
    }

    let dimension = vectors[0].len();
    if vectors.iter().any(|v| v.len() != dimension) {
        return Err(ClusteringError::DimensionMismatch);
    }

    let mut centroids = initialize_centroids(vectors, k, config.seed);
    let threshold = f64::from(config.convergence_threshold);
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iterations {
        iterations += 1;

        let assignments = assign_all(vectors, &centroids);
        let new_centroids = update_centroids(vectors, &assignments, &centroids);
        let displacement = max_displacement(&centroids, &new_centroids);
        centroids = new_centroids;

        if displacement < threshold {
            converged = true;
            break;
        }
    }

    if !converged {
        tracing::warn!(
            iterations,
            "k-means did not reach the convergence threshold; returning best effort centroids"
        );
    }

    let assignments = assign_all(vectors, &centroids);

    Ok(KMeansResult {
        centroids,
        assignments,
        iterations,
        converged,
    })
}

/// Assigns a vector to the nearest centroid by Euclidean distance.
///
/// Ties go to the lowest cluster position.
pub fn assign_to_nearest_centroid(vector: &[f32], centroids: &[&[f32]]) -> ClusterId {
    let mut best_distance = f64::INFINITY;
    let mut best_cluster = 0;

    for (i, centroid) in centroids.iter().enumerate() {
        let distance = squared_euclidean(vector, centroid);
        if distance < best_distance {
            best_distance = distance;
            best_cluster = i;
        }
    }

    ClusterId::from_index(best_cluster)
}

fn assign_all(vectors: &[Vec<f32>], centroids: &[Vec<f32>]) -> Vec<ClusterId> {
    let centroid_refs: Vec<&[f32]> = centroids.iter().map(|c| c.as_slice()).collect();
    vectors
        .par_iter()
        .map(|vector| assign_to_nearest_centroid(vector, &centroid_refs))
        .collect()
}

/// Picks `k` distinct input vectors as the starting centroids.
fn initialize_centroids(vectors: &[Vec<f32>], k: usize, seed: Option<u64>) -> Vec<Vec<f32>> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    };

    rand::seq::index::sample(&mut rng, vectors.len(), k)
        .into_iter()
        .map(|i| vectors[i].clone())
        .collect()
}

/// Recomputes each centroid as the mean of its members.
///
/// A cluster with no members keeps its previous centroid.
fn update_centroids(
    vectors: &[Vec<f32>],
    assignments: &[ClusterId],
    previous: &[Vec<f32>],
) -> Vec<Vec<f32>> {
    let k = previous.len();
    let dimension = previous[0].len();
    let mut sums = vec![vec![0.0f64; dimension]; k];
    let mut sizes = vec![0usize; k];

    for (vector, cluster) in vectors.iter().zip(assignments.iter()) {
        let idx = cluster.index();
        for (sum, &value) in sums[idx].iter_mut().zip(vector.iter()) {
            *sum += f64::from(value);
        }
        sizes[idx] += 1;
    }

    sums.into_iter()
        .zip(sizes)
        .zip(previous.iter())
        .map(|((sum, size), old)| {
            if size == 0 {
                old.clone()
            } else {
                sum.into_iter().map(|s| (s / size as f64) as f32).collect()
            }
        })
        .collect()
}

/// Largest Euclidean distance any centroid moved.
fn max_displacement(old: &[Vec<f32>], new: &[Vec<f32>]) -> f64 {
    old.iter()
        .zip(new.iter())
        .map(|(o, n)| squared_euclidean(o, n).sqrt())
        .fold(0.0, f64::max)
}
