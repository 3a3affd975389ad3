//! Document store facade: ingestion + retrieval over a vector collection.
//!
//! This crate provides a small API to:
//! - parse NDJSON datasets tolerantly ([`parse_ndjson`], [`read_ndjson_file`])
//! - (re)build the collection from documents in concurrent batches
//! - retrieve the top-K documents for a textual query
//!
//! The vector store and the embedder are trait objects ([`VectorStore`],
//! [`EmbeddingsProvider`]) constructed once and shared behind `Arc`s.

mod config;
mod embed;
mod errors;
mod ingest;
mod io_jsonl;
mod qdrant_facade;
mod record;
mod retrieve;
mod vector_store;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use config::{DistanceKind, RagConfig, VectorSpace};
pub use embed::{EmbeddingsProvider, LlmEmbedder};
pub use errors::RagError;
pub use ingest::{IngestOptions, IngestReport, batch_progress_bar};
pub use io_jsonl::{ParsedDataset, parse_ndjson, read_ndjson_file};
pub use qdrant_facade::QdrantFacade;
pub use record::{Document, IndexedPoint, RetrievalHit, UNKNOWN};
pub use vector_store::VectorStore;

use std::sync::Arc;

use indicatif::ProgressBar;
use tracing::{debug, trace};

/// High-level facade that wires configuration, vector store and embedder.
///
/// This is the single entry point recommended for application code.
#[derive(Clone)]
pub struct RagStore {
    cfg: RagConfig,
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingsProvider>,
}

impl RagStore {
    /// Connects to Qdrant with the given configuration.
    ///
    /// # Errors
    /// [`RagError::Config`] / [`RagError::Qdrant`] if the client cannot be built.
    pub fn connect(cfg: RagConfig, embedder: Arc<dyn EmbeddingsProvider>) -> Result<Self, RagError> {
        trace!("RagStore::connect collection={}", cfg.collection);
        let store = Arc::new(QdrantFacade::new(&cfg)?);
        Self::with_store(cfg, store, embedder)
    }

    /// Builds the facade over an existing store.
    ///
    /// # Errors
    /// [`RagError::Config`] if the embedder dimension differs from `cfg.embedding_dim`.
    pub fn with_store(
        cfg: RagConfig,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingsProvider>,
    ) -> Result<Self, RagError> {
        cfg.validate()?;
        if embedder.dimension() != cfg.embedding_dim {
            return Err(RagError::Config(format!(
                "embedder dimension {} differs from EMBEDDING_DIM {}",
                embedder.dimension(),
                cfg.embedding_dim
            )));
        }
        Ok(Self {
            cfg,
            store,
            embedder,
        })
    }

    pub fn config(&self) -> &RagConfig {
        &self.cfg
    }

    /// Destructively rebuilds the collection from `documents`.
    ///
    /// # Errors
    /// Only collection recreation failures; see [`IngestReport`] for batch failures.
    pub async fn rebuild(
        &self,
        documents: &[Document],
        progress: &ProgressBar,
    ) -> Result<IngestReport, RagError> {
        debug!("RagStore::rebuild documents={}", documents.len());
        let opts = IngestOptions {
            distance: self.cfg.distance,
            batch_size: self.cfg.upsert_batch,
            concurrency: self.cfg.batch_concurrency,
        };
        ingest::ingest_documents(
            self.store.as_ref(),
            self.embedder.as_ref(),
            documents,
            opts,
            progress,
        )
        .await
    }

    /// Top-K documents for `query`, best first.
    ///
    /// # Errors
    /// [`RagError::EmptyQuery`] for a blank query; embedding and store failures.
    pub async fn retrieve(&self, query: &str, top_k: u64) -> Result<Vec<RetrievalHit>, RagError> {
        trace!("RagStore::retrieve top_k={top_k}");
        retrieve::retrieve(
            self.store.as_ref(),
            self.embedder.as_ref(),
            query,
            top_k,
            self.cfg.exact_search,
        )
        .await
    }

    /// Points currently stored in the collection.
    ///
    /// # Errors
    /// Vector store failures.
    pub async fn points_count(&self) -> Result<u64, RagError> {
        self.store.points_count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{HashingEmbedder, InMemoryVectorStore};

    #[test]
    fn dimension_mismatch_is_a_config_error() {
        let cfg = RagConfig::new_default("http://localhost:6334", "kb");
        let res = RagStore::with_store(
            cfg,
            Arc::new(InMemoryVectorStore::new()),
            Arc::new(HashingEmbedder::new(8)),
        );
        assert!(matches!(res, Err(RagError::Config(_))));
    }
}
