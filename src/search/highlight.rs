//! Sentence highlights for search results.

use std::collections::HashSet;

use crate::chunking::split_sentences;
use crate::lexical::tokenize;

/// Distinct query terms, as the keyword scorer sees them.
pub fn query_terms(query: &str) -> HashSet<String> {
    tokenize(query).into_iter().collect()
}

/// Sentences of `content` sharing at least one term with the query, in
/// document order.
pub fn highlights(content: &str, terms: &HashSet<String>) -> Vec<String> {
    if terms.is_empty() {
        return Vec::new();
    }

    split_sentences(content)
        .into_iter()
        .filter(|sentence| tokenize(sentence).iter().any(|t| terms.contains(t)))
        .collect()
}
