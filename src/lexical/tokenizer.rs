//! Lexical tokenization shared by BM25, re-ranking, highlighting and
//! cluster labelling.
//!
//! Lowercase, punctuation stripped, whitespace split. No stemming and no
//! stopword removal.

/// Splits `text` into lowercase terms.
///
/// Punctuation is deleted rather than treated as a separator, so
/// `"don't"` becomes `"dont"` and `"e-mail"` becomes `"email"`.
pub fn tokenize(text: &str) -> Vec<String> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();

    cleaned.split_whitespace().map(str::to_string).collect()
}
