//! Offline embedding by feature hashing.
//!
//! Each non-stopword token adds one to one of `dimension` buckets and the
//! counts are L2-normalized. Texts that share vocabulary land close
//! together, which is enough for tests and for running the CLI without an
//! embedding service. Counts are never negative, so cosine similarity
//! between two hashed texts stays in `[0, 1]`.

use async_trait::async_trait;

use crate::embedding::{EmbeddingError, EmbeddingProvider};
use crate::lexical::tokenize;
use crate::vector::similarity::normalize;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "is", "it", "of", "on",
    "or", "that", "the", "this", "to", "was", "were", "with",
];

#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    /// Synchronous embedding, used directly by tests and the async trait.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        if self.dimension == 0 {
            return vector;
        }

        for token in tokenize(text) {
            if STOPWORDS.contains(&token.as_str()) {
                continue;
            }
            let bucket = (fnv1a(token.as_bytes()) % self.dimension as u64) as usize;
            vector[bucket] += 1.0;
        }

        normalize(&mut vector);
        vector
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, &b| {
        (hash ^ u64::from(b)).wrapping_mul(FNV_PRIME)
    })
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.embed_text(text))
    }

    fn model_name(&self) -> &str {
        "feature-hashing"
    }

    fn dimensions(&self) -> usize {
        self.dimension
    }
}
