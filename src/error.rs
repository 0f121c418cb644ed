//! Error types for the search engine
//!
//! Configuration and data errors surface to callers through [`EngineError`].
//! Embedding provider and durable cache failures never appear here: they
//! degrade results instead (see [`crate::embedding`]).

use std::path::PathBuf;

use thiserror::Error;

use crate::chunking::ChunkingError;
use crate::vector::{ClusteringError, VectorError};

/// Main error type for engine operations
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Index '{name}' not found\nSuggestion: Create it first with create_index")]
    IndexNotFound { name: String },

    #[error("Index '{name}' already exists\nSuggestion: Pick another name or drop the existing index")]
    IndexAlreadyExists { name: String },

    #[error(
        "Embedding for index '{index}' has {actual} dimensions, expected {expected}\nSuggestion: Use the same embedding model for every document in an index"
    )]
    DimensionMismatch {
        index: String,
        expected: usize,
        actual: usize,
    },

    #[error("Document '{id}' not found in index '{index}'")]
    DocumentNotFound { index: String, id: String },

    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("Failed to read '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Vector(#[from] VectorError),

    #[error(transparent)]
    Clustering(#[from] ClusteringError),

    #[error(transparent)]
    Chunking(#[from] ChunkingError),
}

impl EngineError {
    /// Get a stable status code for this error type.
    ///
    /// Returns a string identifier that can be used in JSON responses
    /// for programmatic error handling.
    pub fn status_code(&self) -> &'static str {
        match self {
            Self::IndexNotFound { .. } => "INDEX_NOT_FOUND",
            Self::IndexAlreadyExists { .. } => "INDEX_ALREADY_EXISTS",
            Self::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            Self::DocumentNotFound { .. } => "DOCUMENT_NOT_FOUND",
            Self::InvalidArgument { .. } => "INVALID_ARGUMENT",
            Self::FileRead { .. } => "FILE_READ_ERROR",
            Self::Vector(_) => "VECTOR_ERROR",
            Self::Clustering(_) => "CLUSTERING_ERROR",
            Self::Chunking(_) => "CHUNKING_ERROR",
        }
    }

    /// Whether the error means something asked for does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::IndexNotFound { .. } | Self::DocumentNotFound { .. }
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::IndexNotFound { .. } => vec![
                "Check the index name for typos",
                "List existing indexes with list_indexes",
            ],
            Self::IndexAlreadyExists { .. } => vec![
                "Reuse the existing index instead of creating it again",
                "Drop the index first if you want to change its dimension or metric",
            ],
            Self::DimensionMismatch { .. } => vec![
                "Check embedding.dimensions in .semdex/settings.toml",
                "Recreate the index with the dimension your embedding model produces",
            ],
            Self::DocumentNotFound { .. } => vec![
                "The document may have been deleted",
                "Upsert the document before referencing it",
            ],
            Self::FileRead { .. } => vec![
                "Check that the file exists and you have read permissions",
                "Only UTF-8 text files can be indexed",
            ],
            Self::Chunking(_) => vec!["Ensure chunking.overlap is smaller than chunking.chunk_size"],
            _ => vec![],
        }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
