use ai_llm_service::service_profiles::EmbeddingClient;
use futures::future::BoxFuture;
use tracing::debug;

use super::{EmbeddingsProvider, check_dimensions};
use crate::errors::RagError;

/// [`EmbeddingsProvider`] backed by the shared LLM embedding client.
#[derive(Debug, Clone)]
pub struct LlmEmbedder {
    client: EmbeddingClient,
    dim: usize,
}

impl LlmEmbedder {
    /// `dim` is the dimension the collection was created with
    /// (384 for `all-minilm`).
    pub fn new(client: EmbeddingClient, dim: usize) -> Self {
        Self { client, dim }
    }
}

impl EmbeddingsProvider for LlmEmbedder {
    fn dimension(&self) -> usize {
        self.dim
    }

    fn embed_batch<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>, RagError>> {
        Box::pin(async move {
            let vectors = self.client.embed_batch(texts).await?;
            if vectors.len() != texts.len() {
                return Err(RagError::Embedding(format!(
                    "expected {} vectors, got {}",
                    texts.len(),
                    vectors.len()
                )));
            }
            check_dimensions(&vectors, self.dim)?;
            debug!(count = vectors.len(), model = %self.client.config().model, "embedded batch");
            Ok(vectors)
        })
    }
}
