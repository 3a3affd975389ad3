//! Embedding provider seam.

use futures::future::BoxFuture;

use crate::errors::RagError;

mod llm_embedder;

pub use llm_embedder::LlmEmbedder;

/// Maps text to fixed-length vectors.
///
/// Implementations must return exactly one vector per input, in input order,
/// each of length [`EmbeddingsProvider::dimension`].
pub trait EmbeddingsProvider: Send + Sync {
    /// Length of every produced vector.
    fn dimension(&self) -> usize;

    /// Embeds a batch of texts.
    fn embed_batch<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>, RagError>>;

    /// Embeds a single text.
    fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>, RagError>> {
        Box::pin(async move {
            let mut out = self.embed_batch(&[text.to_string()]).await?;
            out.pop()
                .ok_or_else(|| RagError::Embedding("provider returned no vector".into()))
        })
    }
}

/// Fails unless every vector has the expected length.
pub(crate) fn check_dimensions(vectors: &[Vec<f32>], want: usize) -> Result<(), RagError> {
    match vectors.iter().find(|v| v.len() != want) {
        Some(bad) => Err(RagError::VectorSizeMismatch {
            got: bad.len(),
            want,
        }),
        None => Ok(()),
    }
}
