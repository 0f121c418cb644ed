//! Keyword side of search: tokenization and BM25 scoring.

mod bm25;
mod tokenizer;

pub use bm25::{B, Bm25Index, K1};
pub use tokenizer::tokenize;
