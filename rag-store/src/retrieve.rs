//! Retrieval: embed the query text, search, order hits best first.

use std::time::Instant;

use tracing::debug;

use crate::embed::EmbeddingsProvider;
use crate::errors::RagError;
use crate::record::RetrievalHit;
use crate::vector_store::VectorStore;

/// Returns at most `top_k` hits for `query`, sorted by descending score.
///
/// # Errors
/// - [`RagError::EmptyQuery`] before any external call if `query` is blank
/// - embedding or vector store failures otherwise
pub async fn retrieve(
    store: &dyn VectorStore,
    embedder: &dyn EmbeddingsProvider,
    query: &str,
    top_k: u64,
    exact: bool,
) -> Result<Vec<RetrievalHit>, RagError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(RagError::EmptyQuery);
    }
    let started = Instant::now();

    let vector = embedder.embed(query).await?;
    let mut hits = store.search(vector, top_k, exact).await?;

    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits.truncate(top_k as usize);

    debug!(
        top_k,
        hits = hits.len(),
        latency_ms = started.elapsed().as_millis(),
        "retrieval done"
    );
    Ok(hits)
}
