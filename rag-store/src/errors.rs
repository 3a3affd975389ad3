//! Unified error types for the crate.

use ai_llm_service::AiLlmError;
use thiserror::Error;

/// Top-level error for rag-store operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// I/O or filesystem errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing / serialization errors.
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Invalid or unsupported configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Embedding length differs from the collection dimension.
    #[error("vector size mismatch: got {got}, want {want}")]
    VectorSizeMismatch { got: usize, want: usize },

    /// The embedding backend failed.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Qdrant client errors (wrapped).
    #[error("qdrant error: {0}")]
    Qdrant(String),

    /// Query text was empty after trimming.
    #[error("query must not be empty")]
    EmptyQuery,
}

impl From<AiLlmError> for RagError {
    fn from(err: AiLlmError) -> Self {
        Self::Embedding(err.to_string())
    }
}

impl From<qdrant_client::QdrantError> for RagError {
    fn from(err: qdrant_client::QdrantError) -> Self {
        Self::Qdrant(err.to_string())
    }
}
