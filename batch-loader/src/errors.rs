use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a load.
///
/// Per-batch failures are not errors: they are counted in the summary.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("no dataset configured: set DATA_BUCKET and DATA_KEY (S3) or DATA_PATH (local file)")]
    MissingSource,

    #[error("incomplete S3 location: {set} is set but {missing} is not")]
    IncompleteS3 { set: &'static str, missing: &'static str },

    #[error("object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Rag(#[from] rag_store::RagError),

    #[error(transparent)]
    Llm(#[from] ai_llm_service::AiLlmError),
}
