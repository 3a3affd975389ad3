//! Vector store seam: the three operations the loader and query path need,
//! plus a point count for post-load verification and health checks.

use futures::future::BoxFuture;

use crate::{
    config::VectorSpace,
    errors::RagError,
    record::{IndexedPoint, RetrievalHit},
};

pub trait VectorStore: Send + Sync {
    /// Drops the collection if it exists and creates it empty.
    fn recreate_collection<'a>(&'a self, space: VectorSpace) -> BoxFuture<'a, Result<(), RagError>>;

    /// Inserts or replaces points by id; returns how many were written.
    fn upsert<'a>(&'a self, points: Vec<IndexedPoint>) -> BoxFuture<'a, Result<u64, RagError>>;

    /// Nearest neighbours of `vector`, best first, at most `top_k`.
    fn search<'a>(
        &'a self,
        vector: Vec<f32>,
        top_k: u64,
        exact: bool,
    ) -> BoxFuture<'a, Result<Vec<RetrievalHit>, RagError>>;

    /// Number of points currently stored.
    fn points_count<'a>(&'a self) -> BoxFuture<'a, Result<u64, RagError>>;
}
