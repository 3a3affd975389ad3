//! Thin adapter around `qdrant-client` to isolate API usage.
//!
//! All Qdrant interactions live here behind the [`VectorStore`] trait, so the
//! rest of the workspace never touches the builder API.

use std::collections::HashMap;

use futures::future::BoxFuture;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, Distance, PointStruct, SearchParamsBuilder,
    SearchPointsBuilder, UpsertPointsBuilder, Value as QValue, VectorParamsBuilder, value::Kind,
};
use qdrant_client::{Payload, Qdrant};
use tracing::{debug, info};

use crate::config::{DistanceKind, RagConfig, VectorSpace};
use crate::errors::RagError;
use crate::record::{IndexedPoint, RetrievalHit, UNKNOWN};
use crate::vector_store::VectorStore;

/// Qdrant client bound to one collection.
pub struct QdrantFacade {
    client: Qdrant,
    collection: String,
}

impl QdrantFacade {
    /// Creates a new facade from the given configuration.
    ///
    /// The connection is lazy; the first call reveals an unreachable server.
    ///
    /// # Errors
    /// [`RagError::Config`] for invalid config, [`RagError::Qdrant`] if the client cannot be built.
    pub fn new(cfg: &RagConfig) -> Result<Self, RagError> {
        cfg.validate()?;

        let mut builder = Qdrant::from_url(&cfg.qdrant_url);
        if let Some(key) = &cfg.qdrant_api_key {
            builder = builder.api_key(key.clone());
        }
        let client = builder.build()?;

        info!(url = %cfg.qdrant_url, collection = %cfg.collection, "Qdrant client ready");
        Ok(Self {
            client,
            collection: cfg.collection.clone(),
        })
    }

    async fn recreate(&self, space: VectorSpace) -> Result<(), RagError> {
        if self.client.collection_exists(&self.collection).await? {
            info!(collection = %self.collection, "dropping existing collection");
            self.client.delete_collection(&self.collection).await?;
        }

        let distance = match space.distance {
            DistanceKind::Cosine => Distance::Cosine,
            DistanceKind::Dot => Distance::Dot,
            DistanceKind::Euclid => Distance::Euclid,
        };
        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(VectorParamsBuilder::new(space.size as u64, distance)),
            )
            .await?;

        info!(
            collection = %self.collection,
            size = space.size,
            distance = ?space.distance,
            "collection created"
        );
        Ok(())
    }

    async fn upsert_points(&self, points: Vec<IndexedPoint>) -> Result<u64, RagError> {
        if points.is_empty() {
            return Ok(0);
        }
        let count = points.len() as u64;

        let structs = points
            .into_iter()
            .map(|p| -> Result<PointStruct, RagError> {
                let payload = Payload::try_from(serde_json::to_value(&p.document)?)?;
                Ok(PointStruct::new(p.id, p.vector, payload))
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, structs).wait(true))
            .await?;

        debug!(collection = %self.collection, count, "points upserted");
        Ok(count)
    }

    async fn search_points(
        &self,
        vector: Vec<f32>,
        top_k: u64,
        exact: bool,
    ) -> Result<Vec<RetrievalHit>, RagError> {
        let mut builder =
            SearchPointsBuilder::new(&self.collection, vector, top_k).with_payload(true);
        if exact {
            builder = builder.params(SearchParamsBuilder::default().exact(true));
        }

        let res = self.client.search_points(builder).await?;
        let hits: Vec<RetrievalHit> = res
            .result
            .into_iter()
            .map(|p| RetrievalHit {
                text: payload_str(&p.payload, "text").unwrap_or_default(),
                source: payload_str(&p.payload, "source").unwrap_or_else(|| UNKNOWN.into()),
                score: p.score,
            })
            .collect();

        debug!(collection = %self.collection, top_k, hits = hits.len(), "search completed");
        Ok(hits)
    }

    async fn count(&self) -> Result<u64, RagError> {
        let res = self
            .client
            .count(CountPointsBuilder::new(&self.collection).exact(true))
            .await?;
        Ok(res.result.map(|r| r.count).unwrap_or(0))
    }
}

impl VectorStore for QdrantFacade {
    fn recreate_collection<'a>(&'a self, space: VectorSpace) -> BoxFuture<'a, Result<(), RagError>> {
        Box::pin(self.recreate(space))
    }

    fn upsert<'a>(&'a self, points: Vec<IndexedPoint>) -> BoxFuture<'a, Result<u64, RagError>> {
        Box::pin(self.upsert_points(points))
    }

    fn search<'a>(
        &'a self,
        vector: Vec<f32>,
        top_k: u64,
        exact: bool,
    ) -> BoxFuture<'a, Result<Vec<RetrievalHit>, RagError>> {
        Box::pin(self.search_points(vector, top_k, exact))
    }

    fn points_count<'a>(&'a self) -> BoxFuture<'a, Result<u64, RagError>> {
        Box::pin(self.count())
    }
}

fn payload_str(payload: &HashMap<String, QValue>, key: &str) -> Option<String> {
    match payload.get(key).and_then(|v| v.kind.as_ref()) {
        Some(Kind::StringValue(s)) => Some(s.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_strings_are_extracted() {
        let mut payload = HashMap::new();
        payload.insert("text".to_string(), QValue::from("hello"));
        payload.insert("score".to_string(), QValue::from(3_i64));

        assert_eq!(payload_str(&payload, "text").as_deref(), Some("hello"));
        assert_eq!(payload_str(&payload, "score"), None);
        assert_eq!(payload_str(&payload, "missing"), None);
    }

    #[test]
    fn invalid_config_is_rejected_before_connecting() {
        let cfg = RagConfig::new_default("", "kb");
        assert!(matches!(QdrantFacade::new(&cfg), Err(RagError::Config(_))));
    }
}
