//! Runtime and collection configuration.

use std::str::FromStr;

use ai_llm_service::error_handler::env_opt_string;

use crate::errors::RagError;

/// Distance function used for the vector space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DistanceKind {
    /// Cosine distance (default).
    Cosine,
    /// Dot product (useful for normalized vectors).
    Dot,
    /// Euclidean distance (L2).
    Euclid,
}

impl FromStr for DistanceKind {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "dot" => Ok(Self::Dot),
            "euclid" | "euclidean" | "l2" => Ok(Self::Euclid),
            other => Err(RagError::Config(format!("unsupported distance `{other}`"))),
        }
    }
}

/// Describes the vector space of the collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VectorSpace {
    /// Dimensionality of vectors.
    pub size: usize,
    /// Distance function.
    pub distance: DistanceKind,
}

/// Configuration for ingestion and retrieval.
#[derive(Clone, Debug)]
pub struct RagConfig {
    /// Qdrant gRPC endpoint, e.g. `http://localhost:6334`.
    pub qdrant_url: String,
    /// Optional API key for Qdrant Cloud.
    pub qdrant_api_key: Option<String>,
    /// Target collection name.
    pub collection: String,
    pub distance: DistanceKind,
    /// Expected embedding dimension; the collection is created with it.
    pub embedding_dim: usize,
    /// Documents per ingestion batch.
    pub upsert_batch: usize,
    /// Batches embedded and upserted concurrently.
    pub batch_concurrency: usize,
    /// Exact search flag (false = HNSW ANN).
    pub exact_search: bool,
}

impl RagConfig {
    /// Defaults for a given Qdrant endpoint and collection.
    pub fn new_default(url: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            qdrant_url: url.into(),
            qdrant_api_key: None,
            collection: collection.into(),
            distance: DistanceKind::Cosine,
            embedding_dim: 384,
            upsert_batch: 100,
            batch_concurrency: 4,
            exact_search: false,
        }
    }

    /// Reads the config from `QDRANT_*`, `EMBEDDING_DIM`, `UPSERT_BATCH`,
    /// `BATCH_CONCURRENCY` and `RAG_EXACT_SEARCH`.
    ///
    /// Retrieval bounds (`RAG_*_TOP_K`) belong to the query service config.
    ///
    /// # Errors
    /// [`RagError::Config`] for unparsable values or a failed [`RagConfig::validate`].
    pub fn from_env() -> Result<Self, RagError> {
        let mut cfg = Self::new_default(
            env_opt_string("QDRANT_URL").unwrap_or_else(|| "http://127.0.0.1:6334".into()),
            env_opt_string("QDRANT_COLLECTION").unwrap_or_else(|| "knowledge_base".into()),
        );
        cfg.qdrant_api_key = env_opt_string("QDRANT_API_KEY");
        if let Some(d) = env_opt_string("QDRANT_DISTANCE") {
            cfg.distance = d.parse()?;
        }
        cfg.embedding_dim = env_parse("EMBEDDING_DIM", cfg.embedding_dim)?;
        cfg.upsert_batch = env_parse("UPSERT_BATCH", cfg.upsert_batch)?;
        cfg.batch_concurrency = env_parse("BATCH_CONCURRENCY", cfg.batch_concurrency)?;
        cfg.exact_search = env_parse("RAG_EXACT_SEARCH", cfg.exact_search)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validates config values.
    pub fn validate(&self) -> Result<(), RagError> {
        if self.qdrant_url.trim().is_empty() {
            return Err(RagError::Config("qdrant_url is empty".into()));
        }
        if self.collection.trim().is_empty() {
            return Err(RagError::Config("collection is empty".into()));
        }
        if self.embedding_dim == 0 {
            return Err(RagError::Config("embedding_dim must be > 0".into()));
        }
        if self.upsert_batch == 0 {
            return Err(RagError::Config("upsert_batch must be > 0".into()));
        }
        if self.batch_concurrency == 0 {
            return Err(RagError::Config("batch_concurrency must be > 0".into()));
        }
        Ok(())
    }

    pub fn vector_space(&self) -> VectorSpace {
        VectorSpace {
            size: self.embedding_dim,
            distance: self.distance,
        }
    }
}

fn env_parse<T: FromStr>(var: &str, default: T) -> Result<T, RagError> {
    match env_opt_string(var) {
        Some(raw) => raw
            .parse()
            .map_err(|_| RagError::Config(format!("{var} has an invalid value `{raw}`"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_names() {
        assert_eq!("Cosine".parse::<DistanceKind>().ok(), Some(DistanceKind::Cosine));
        assert_eq!("l2".parse::<DistanceKind>().ok(), Some(DistanceKind::Euclid));
        assert!("manhattan".parse::<DistanceKind>().is_err());
    }

    #[test]
    fn defaults_match_reference_collection() {
        let cfg = RagConfig::new_default("http://localhost:6334", "knowledge_base");
        assert!(cfg.validate().is_ok());
        assert_eq!(
            cfg.vector_space(),
            VectorSpace {
                size: 384,
                distance: DistanceKind::Cosine
            }
        );
        assert_eq!(cfg.upsert_batch, 100);
    }

    #[test]
    fn zero_batch_is_rejected() {
        let mut cfg = RagConfig::new_default("http://localhost:6334", "kb");
        cfg.upsert_batch = 0;
        assert!(cfg.validate().is_err());
    }
}
