//! Typed error for the contextor crate.
//!
//! `ClientClosed` and `Generation` are distinct outcomes: the HTTP layer
//! renders the first as 499 and the second as 500.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContextorError {
    /// The request failed validation; nothing was sent upstream.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Retrieval failed (embedding or vector store).
    #[error("retrieval failed: {0}")]
    Rag(#[from] rag_store::RagError),

    /// The generation engine failed to start or failed mid-way.
    #[error("generation failed: {0}")]
    Generation(#[from] ai_llm_service::AiLlmError),

    /// The client went away before the answer was complete.
    #[error("client closed request")]
    ClientClosed,

    /// Invalid or unsupported configuration.
    #[error("config error: {0}")]
    Config(String),

    /// A background task panicked or was cancelled by the runtime.
    #[error("internal error: {0}")]
    Internal(String),
}
