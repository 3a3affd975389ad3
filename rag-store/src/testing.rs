//! In-process doubles for the vector store and the embedder.
//!
//! Enabled with the `test-util` feature.

use std::{
    collections::BTreeMap,
    sync::{
        Mutex, MutexGuard,
        atomic::{AtomicUsize, Ordering},
    },
};

use futures::future::BoxFuture;
use services::ids::stable_point_id;

use crate::{
    config::VectorSpace,
    embed::EmbeddingsProvider,
    errors::RagError,
    record::{Document, IndexedPoint, RetrievalHit},
    vector_store::VectorStore,
};

#[derive(Default)]
struct Collection {
    space: Option<VectorSpace>,
    points: BTreeMap<u64, IndexedPoint>,
}

/// Cosine-similarity store kept in memory.
#[derive(Default)]
pub struct InMemoryVectorStore {
    inner: Mutex<Collection>,
    recreations: AtomicUsize,
    searches: AtomicUsize,
    fail_search: bool,
    fail_upsert_id: Option<u64>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose `search` always fails.
    pub fn failing_search() -> Self {
        Self {
            fail_search: true,
            ..Self::default()
        }
    }

    /// A store that rejects any upsert batch containing `text`'s point id.
    pub fn failing_upsert_of(text: &str) -> Self {
        Self {
            fail_upsert_id: Some(stable_point_id(text)),
            ..Self::default()
        }
    }

    fn lock(&self) -> MutexGuard<'_, Collection> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn len(&self) -> usize {
        self.lock().points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn space(&self) -> Option<VectorSpace> {
        self.lock().space
    }

    pub fn recreations(&self) -> usize {
        self.recreations.load(Ordering::SeqCst)
    }

    /// Number of `search` calls, failed ones included.
    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    /// Embeds and stores documents directly, bypassing batching.
    pub async fn insert_documents(&self, embedder: &dyn EmbeddingsProvider, docs: &[Document]) {
        let texts: Vec<String> = docs.iter().map(|d| d.text.clone()).collect();
        let vectors = embedder.embed_batch(&texts).await.unwrap_or_default();
        let mut inner = self.lock();
        for (doc, vector) in docs.iter().zip(vectors) {
            let id = stable_point_id(&doc.text);
            inner.points.insert(
                id,
                IndexedPoint {
                    id,
                    vector,
                    document: doc.clone(),
                },
            );
        }
    }
}

impl VectorStore for InMemoryVectorStore {
    fn recreate_collection<'a>(&'a self, space: VectorSpace) -> BoxFuture<'a, Result<(), RagError>> {
        Box::pin(async move {
            let mut inner = self.lock();
            inner.points.clear();
            inner.space = Some(space);
            self.recreations.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    fn upsert<'a>(&'a self, points: Vec<IndexedPoint>) -> BoxFuture<'a, Result<u64, RagError>> {
        Box::pin(async move {
            let mut inner = self.lock();
            let Some(space) = inner.space else {
                return Err(RagError::Qdrant("collection does not exist".into()));
            };
            if let Some(bad) = points.iter().find(|p| p.vector.len() != space.size) {
                return Err(RagError::VectorSizeMismatch {
                    got: bad.vector.len(),
                    want: space.size,
                });
            }
            if let Some(id) = self.fail_upsert_id.filter(|id| points.iter().any(|p| p.id == *id)) {
                return Err(RagError::Qdrant(format!("upsert rejected for point {id}")));
            }
            let count = points.len() as u64;
            for p in points {
                inner.points.insert(p.id, p);
            }
            Ok(count)
        })
    }

    fn search<'a>(
        &'a self,
        vector: Vec<f32>,
        top_k: u64,
        _exact: bool,
    ) -> BoxFuture<'a, Result<Vec<RetrievalHit>, RagError>> {
        Box::pin(async move {
            self.searches.fetch_add(1, Ordering::SeqCst);
            if self.fail_search {
                return Err(RagError::Qdrant("search unavailable".into()));
            }
            let inner = self.lock();
            let mut hits: Vec<RetrievalHit> = inner
                .points
                .values()
                .map(|p| RetrievalHit {
                    text: p.document.text.clone(),
                    source: p.document.source.clone(),
                    score: cosine(&vector, &p.vector),
                })
                .collect();
            hits.sort_by(|a, b| b.score.total_cmp(&a.score));
            hits.truncate(top_k as usize);
            Ok(hits)
        })
    }

    fn points_count<'a>(&'a self) -> BoxFuture<'a, Result<u64, RagError>> {
        Box::pin(async move { Ok(self.len() as u64) })
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 { 0.0 } else { dot / (na * nb) }
}

/// Bag-of-words embedder: each lowercase word bumps one hashed bucket.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dim: usize,
    calls: std::sync::Arc<AtomicUsize>,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self {
        Self {
            dim: dim.max(1),
            calls: Default::default(),
        }
    }

    /// Number of `embed_batch` calls (single embeds included).
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0_f32; self.dim];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let bucket = stable_point_id(&word.to_lowercase()) as usize % self.dim;
            v[bucket] += 1.0;
        }
        v
    }
}

impl EmbeddingsProvider for HashingEmbedder {
    fn dimension(&self) -> usize {
        self.dim
    }

    fn embed_batch<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>, RagError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|t| self.vector(t)).collect())
        })
    }
}

/// Wraps an embedder and fails selected batches.
#[derive(Debug, Clone)]
pub struct FailingEmbedder {
    inner: HashingEmbedder,
    marker: Option<String>,
}

impl FailingEmbedder {
    /// Fails every call.
    pub fn always(dim: usize) -> Self {
        Self {
            inner: HashingEmbedder::new(dim),
            marker: None,
        }
    }

    /// Fails any batch that contains `marker` exactly.
    pub fn on_text(inner: HashingEmbedder, marker: &str) -> Self {
        Self {
            inner,
            marker: Some(marker.to_string()),
        }
    }
}

impl EmbeddingsProvider for FailingEmbedder {
    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn embed_batch<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>, RagError>> {
        let fails = match &self.marker {
            None => true,
            Some(m) => texts.iter().any(|t| t == m),
        };
        if fails {
            return Box::pin(async { Err(RagError::Embedding("embedding backend unavailable".into())) });
        }
        self.inner.embed_batch(texts)
    }
}
