//! Document chunking.
//!
//! Splits raw content into retrieval units before embedding. Sizes are
//! measured in characters, never bytes, so multi-byte text is never cut
//! inside a code point.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_OVERLAP: usize = 200;

static BLANK_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t\r\f\v]*\n").expect("Invalid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChunkStrategy {
    /// Sliding character window with overlap.
    FixedSize,
    /// Blank-line separated blocks.
    Paragraph,
    /// Naive split after `.`, `!` and `?`.
    Sentence,
    /// Paragraphs, with oversized ones packed from sentences.
    #[default]
    Recursive,
}

impl ChunkStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FixedSize => "fixed-size",
            Self::Paragraph => "paragraph",
            Self::Sentence => "sentence",
            Self::Recursive => "recursive",
        }
    }
}

impl fmt::Display for ChunkStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChunkStrategy {
    type Err = ChunkingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fixed-size" | "fixed_size" | "fixed" => Ok(Self::FixedSize),
            "paragraph" => Ok(Self::Paragraph),
            "sentence" => Ok(Self::Sentence),
            "recursive" => Ok(Self::Recursive),
            _ => Err(ChunkingError::UnknownStrategy(s.to_string())),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChunkingError {
    #[error(
        "Chunk size must be at least 1\nSuggestion: Set chunking.chunk_size to a positive number of characters"
    )]
    InvalidChunkSize,

    #[error(
        "Overlap {overlap} must be smaller than chunk size {chunk_size}\nSuggestion: Lower chunking.overlap or raise chunking.chunk_size"
    )]
    InvalidOverlap { overlap: usize, chunk_size: usize },

    #[error(
        "Unknown chunking strategy '{0}'\nSuggestion: Use one of fixed-size, paragraph, sentence, recursive"
    )]
    UnknownStrategy(String),
}

/// Splits content into chunks under a fixed size and overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

impl Chunker {
    /// # Errors
    /// Fails when `chunk_size` is zero or `overlap >= chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ChunkingError> {
        if chunk_size == 0 {
            return Err(ChunkingError::InvalidChunkSize);
        }
        if overlap >= chunk_size {
            return Err(ChunkingError::InvalidOverlap {
                overlap,
                chunk_size,
            });
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Splits `content` under `strategy`.
    ///
    /// Whitespace-only chunks are dropped. Any input with at least one
    /// non-whitespace character yields at least one chunk.
    pub fn chunk(&self, content: &str, strategy: ChunkStrategy) -> Vec<String> {
        if content.trim().is_empty() {
            return Vec::new();
        }

        let chunks = match strategy {
            ChunkStrategy::FixedSize => fixed_size(content, self.chunk_size, self.overlap),
            ChunkStrategy::Paragraph => paragraphs(content),
            ChunkStrategy::Sentence => split_sentences(content),
            ChunkStrategy::Recursive => self.recursive(content),
        };

        if chunks.is_empty() {
            vec![content.trim().to_string()]
        } else {
            chunks
        }
    }

    fn recursive(&self, content: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        for paragraph in paragraphs(content) {
            if paragraph.chars().count() <= self.chunk_size {
                chunks.push(paragraph);
                continue;
            }

            let mut current = String::new();
            let mut current_len = 0;
            for sentence in split_sentences(&paragraph) {
                let sentence_len = sentence.chars().count();

                if sentence_len > self.chunk_size {
                    if !current.is_empty() {
                        chunks.push(std::mem::take(&mut current));
                        current_len = 0;
                    }
                    chunks.extend(fixed_size(&sentence, self.chunk_size, 0));
                    continue;
                }

                let joined_len = if current.is_empty() {
                    sentence_len
                } else {
                    current_len + 1 + sentence_len
                };
                if joined_len > self.chunk_size {
                    chunks.push(std::mem::take(&mut current));
                    current = sentence;
                    current_len = sentence_len;
                } else {
                    if !current.is_empty() {
                        current.push(' ');
                    }
                    current.push_str(&sentence);
                    current_len = joined_len;
                }
            }
            if !current.is_empty() {
                chunks.push(current);
            }
        }
        chunks
    }
}

/// Sliding window of `size` characters advancing by `size - overlap`.
///
/// Chunks are not trimmed, so dropping the first `overlap` characters of
/// every chunk after the first and concatenating gives back the input.
fn fixed_size(content: &str, size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = content.chars().collect();
    let step = size.saturating_sub(overlap).max(1);

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + size).min(chars.len());
        let chunk: String = chars[start..end].iter().collect();
        if !chunk.trim().is_empty() {
            chunks.push(chunk);
        }
        if end == chars.len() {
            break;
        }
        start += step;
    }
    chunks
}

fn paragraphs(content: &str) -> Vec<String> {
    BLANK_LINE
        .split(content)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Splits after each run of `.`, `!` or `?`, trimming every sentence.
///
/// No abbreviation handling: "Dr. Smith" is two sentences.
pub fn split_sentences(content: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        let terminal = matches!(c, '.' | '!' | '?');
        let next_terminal = matches!(chars.peek(), Some('.' | '!' | '?'));
        if terminal && !next_terminal {
            push_trimmed(&mut out, &current);
            current.clear();
        }
    }
    push_trimmed(&mut out, &current);
    out
}

fn push_trimmed(out: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}
