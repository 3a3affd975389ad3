use std::sync::Arc;

use ai_llm_service::{error_handler::env_opt_string, service_profiles::LlmServiceProfiles};
use contextor::{ContextorConfig, QueryService};
use rag_store::{LlmEmbedder, RagConfig, RagStore};
use tracing::info;

use crate::error_handler::AppError;

/// Service name reported by `GET /` when `SERVICE_NAME` is unset.
pub const DEFAULT_SERVICE_NAME: &str = "RAG API";

/// Shared state for all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Query service holding the vector store and generation engine.
    pub service: QueryService,
    /// Name reported by `GET /`.
    pub service_name: String,
}

impl AppState {
    pub fn new(service: QueryService, service_name: impl Into<String>) -> Self {
        Self {
            service,
            service_name: service_name.into(),
        }
    }

    /// Builds the engine, embedder and vector store client from the environment.
    ///
    /// Everything is constructed once here and shared by every request.
    pub fn from_env() -> Result<Self, AppError> {
        let llm = Arc::new(LlmServiceProfiles::from_env()?);
        let rag_cfg = RagConfig::from_env()?;
        let embedder = Arc::new(LlmEmbedder::new(
            llm.embedding().clone(),
            rag_cfg.embedding_dim,
        ));
        info!(
            qdrant = %rag_cfg.qdrant_url,
            collection = %rag_cfg.collection,
            dim = rag_cfg.embedding_dim,
            "vector store configured"
        );
        let store = RagStore::connect(rag_cfg, embedder)?;

        let service = QueryService::new(store, llm.engine(), ContextorConfig::from_env()?)?
            .with_llm_health(llm);

        Ok(Self::new(
            service,
            env_opt_string("SERVICE_NAME").unwrap_or_else(|| DEFAULT_SERVICE_NAME.into()),
        ))
    }
}
