//! Lexical re-ranking of a result prefix.
//!
//! A cheap stand-in for a cross-encoder: each candidate in the prefix is
//! rescored from query term coverage, query bigram overlap and its prior
//! fused score. Candidates past the prefix keep their order and score.

use std::collections::HashSet;

use crate::lexical::tokenize;
use crate::search::hybrid::sort_ranked;

const COVERAGE_WEIGHT: f32 = 0.6;
const PHRASE_WEIGHT: f32 = 0.2;
const PRIOR_WEIGHT: f32 = 0.2;

/// Rescores the first `top_k` entries of `ranked` and re-sorts them;
/// the remainder is appended unchanged.
pub fn rerank<'a>(
    query: &str,
    mut ranked: Vec<(String, f32)>,
    top_k: usize,
    content_of: impl Fn(&str) -> Option<&'a str>,
) -> Vec<(String, f32)> {
    let query_tokens = tokenize(query);
    let terms: HashSet<&str> = query_tokens.iter().map(String::as_str).collect();
    let phrases = bigrams(&query_tokens);

    let split = top_k.min(ranked.len());
    let rest = ranked.split_off(split);
    let max_prior = ranked.iter().map(|(_, s)| *s).fold(0.0f32, f32::max);

    for (id, score) in ranked.iter_mut() {
        let tokens = tokenize(content_of(id).unwrap_or_default());
        let doc_terms: HashSet<&str> = tokens.iter().map(String::as_str).collect();

        let coverage = if terms.is_empty() {
            0.0
        } else {
            terms.intersection(&doc_terms).count() as f32 / terms.len() as f32
        };
        let phrase = if phrases.is_empty() {
            coverage
        } else {
            let doc_phrases = bigrams(&tokens);
            phrases.intersection(&doc_phrases).count() as f32 / phrases.len() as f32
        };
        let prior = if max_prior > 0.0 {
            (*score / max_prior).clamp(0.0, 1.0)
        } else {
            0.0
        };

        *score = COVERAGE_WEIGHT * coverage + PHRASE_WEIGHT * phrase + PRIOR_WEIGHT * prior;
    }

    sort_ranked(&mut ranked);
    ranked.extend(rest);
    ranked
}

fn bigrams(tokens: &[String]) -> HashSet<(&str, &str)> {
    tokens
        .windows(2)
        .map(|w| (w[0].as_str(), w[1].as_str()))
        .collect()
}
