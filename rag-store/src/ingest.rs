//! Batch ingestion: recreate collection → split into batches → embed → upsert.
//!
//! Batches run concurrently (`buffer_unordered`). A batch that fails to embed
//! or upsert is logged and counted as failed; it never stops its siblings.
//! Only the collection recreation is fatal.

use futures::{StreamExt, stream};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use services::ids::stable_point_id;
use tracing::{debug, error, info};

use crate::config::{DistanceKind, VectorSpace};
use crate::embed::{EmbeddingsProvider, check_dimensions};
use crate::errors::RagError;
use crate::record::{Document, IndexedPoint};
use crate::vector_store::VectorStore;

/// Batching knobs for one ingestion run.
#[derive(Clone, Copy, Debug)]
pub struct IngestOptions {
    pub distance: DistanceKind,
    pub batch_size: usize,
    pub concurrency: usize,
}

/// Outcome of one ingestion run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub batches: usize,
    pub failed_batches: usize,
    /// Points written by successful batches.
    pub ingested: u64,
}

/// Progress bar over batches; hidden when `visible` is false.
pub fn batch_progress_bar(batches: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(batches);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} batches ({eta})",
    ) {
        pb.set_style(style.progress_chars("##-"));
    }
    pb
}

/// Recreates the collection with the embedder's dimension and loads `documents`.
///
/// # Errors
/// Only a failed collection recreation is returned; batch failures are
/// reported through [`IngestReport::failed_batches`].
pub async fn ingest_documents(
    store: &dyn VectorStore,
    embedder: &dyn EmbeddingsProvider,
    documents: &[Document],
    opts: IngestOptions,
    progress: &ProgressBar,
) -> Result<IngestReport, RagError> {
    let space = VectorSpace {
        size: embedder.dimension(),
        distance: opts.distance,
    };
    store.recreate_collection(space).await?;

    let batch_size = opts.batch_size.max(1);
    let batches = documents.len().div_ceil(batch_size);
    progress.set_length(batches as u64);
    info!(
        documents = documents.len(),
        batches,
        batch_size,
        concurrency = opts.concurrency,
        "starting ingestion"
    );

    let mut report = IngestReport {
        batches,
        ..IngestReport::default()
    };

    let mut results = stream::iter(documents.chunks(batch_size).enumerate())
        .map(|(index, chunk)| async move {
            (index, ingest_batch(store, embedder, chunk, space.size).await)
        })
        .buffer_unordered(opts.concurrency.max(1));

    while let Some((index, result)) = results.next().await {
        match result {
            Ok(written) => {
                debug!(batch = index, written, "batch stored");
                report.ingested += written;
            }
            Err(err) => {
                error!(batch = index, error = %err, "batch failed; skipping");
                report.failed_batches += 1;
            }
        }
        progress.inc(1);
    }

    progress.finish_and_clear();
    info!(
        ingested = report.ingested,
        failed_batches = report.failed_batches,
        "ingestion finished"
    );
    Ok(report)
}

async fn ingest_batch(
    store: &dyn VectorStore,
    embedder: &dyn EmbeddingsProvider,
    chunk: &[Document],
    dim: usize,
) -> Result<u64, RagError> {
    let texts: Vec<String> = chunk.iter().map(|d| d.text.clone()).collect();
    let vectors = embedder.embed_batch(&texts).await?;
    if vectors.len() != chunk.len() {
        return Err(RagError::Embedding(format!(
            "expected {} vectors, got {}",
            chunk.len(),
            vectors.len()
        )));
    }
    check_dimensions(&vectors, dim)?;

    let points = chunk
        .iter()
        .zip(vectors)
        .map(|(doc, vector)| IndexedPoint {
            id: stable_point_id(&doc.text),
            vector,
            document: doc.clone(),
        })
        .collect();
    store.upsert(points).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingEmbedder, HashingEmbedder, InMemoryVectorStore};

    fn docs(n: usize) -> Vec<Document> {
        (0..n)
            .map(|i| Document::new(format!("document number {i}"), "test", "unit"))
            .collect()
    }

    fn opts(batch_size: usize) -> IngestOptions {
        IngestOptions {
            distance: DistanceKind::Cosine,
            batch_size,
            concurrency: 3,
        }
    }

    #[tokio::test]
    async fn all_batches_are_written() {
        let store = InMemoryVectorStore::new();
        let embedder = HashingEmbedder::new(16);

        let report = ingest_documents(&store, &embedder, &docs(250), opts(100), &ProgressBar::hidden())
            .await
            .expect("ingest");

        assert_eq!(report, IngestReport { batches: 3, failed_batches: 0, ingested: 250 });
        assert_eq!(store.len(), 250);
        assert_eq!(store.space().map(|s| s.size), Some(16));
    }

    #[tokio::test]
    async fn failing_batch_does_not_stop_others() {
        let store = InMemoryVectorStore::new();
        let embedder = FailingEmbedder::on_text(HashingEmbedder::new(8), "document number 150");

        let report = ingest_documents(&store, &embedder, &docs(250), opts(100), &ProgressBar::hidden())
            .await
            .expect("ingest");

        assert_eq!(report.failed_batches, 1);
        assert_eq!(report.ingested, 150);
        assert_eq!(store.len(), 150);
    }

    #[tokio::test]
    async fn failed_upsert_counts_as_failed_batch() {
        let store = InMemoryVectorStore::failing_upsert_of("document number 42");
        let embedder = HashingEmbedder::new(8);

        let report = ingest_documents(&store, &embedder, &docs(250), opts(100), &ProgressBar::hidden())
            .await
            .expect("ingest");

        assert_eq!(report, IngestReport { batches: 3, failed_batches: 1, ingested: 150 });
        assert_eq!(store.len(), 150);
    }

    /// Returns vectors one element short for batches containing `marker`.
    struct ShortVectors {
        inner: HashingEmbedder,
        marker: &'static str,
    }

    impl EmbeddingsProvider for ShortVectors {
        fn dimension(&self) -> usize {
            self.inner.dimension()
        }

        fn embed_batch<'a>(
            &'a self,
            texts: &'a [String],
        ) -> futures::future::BoxFuture<'a, Result<Vec<Vec<f32>>, RagError>> {
            Box::pin(async move {
                let short = texts.iter().any(|t| t == self.marker);
                Ok(texts
                    .iter()
                    .map(|t| {
                        let mut v = self.inner.vector(t);
                        if short {
                            v.pop();
                        }
                        v
                    })
                    .collect())
            })
        }
    }

    #[tokio::test]
    async fn wrong_vector_size_fails_only_its_batch() {
        let store = InMemoryVectorStore::new();
        let embedder = ShortVectors {
            inner: HashingEmbedder::new(8),
            marker: "document number 5",
        };

        let report = ingest_documents(&store, &embedder, &docs(12), opts(4), &ProgressBar::hidden())
            .await
            .expect("ingest");

        assert_eq!(report, IngestReport { batches: 3, failed_batches: 1, ingested: 8 });
        assert_eq!(store.len(), 8);
    }

    #[tokio::test]
    async fn recreate_discards_previous_points() {
        let store = InMemoryVectorStore::new();
        let embedder = HashingEmbedder::new(8);
        let data = docs(40);

        for _ in 0..2 {
            ingest_documents(&store, &embedder, &data, opts(7), &ProgressBar::hidden())
                .await
                .expect("ingest");
        }
        assert_eq!(store.len(), 40);
        assert_eq!(store.recreations(), 2);
    }

    #[tokio::test]
    async fn empty_input_still_recreates() {
        let store = InMemoryVectorStore::new();
        let report = ingest_documents(&store, &HashingEmbedder::new(4), &[], opts(10), &ProgressBar::hidden())
            .await
            .expect("ingest");
        assert_eq!(report, IngestReport::default());
        assert_eq!(store.recreations(), 1);
    }
}
