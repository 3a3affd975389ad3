//! Shared LLM wiring with two profiles: `generation` and `embedding`.
//!
//! - Lives in the same Tokio runtime as the application.
//! - Construct once at startup, wrap in `Arc`, and pass clones to dependents.
//! - The generation profile is exposed as an `Arc<dyn GenerationEngine>` so the
//!   query layer never depends on a concrete provider.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use ai_llm_service::service_profiles::LlmServiceProfiles;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let svc = Arc::new(LlmServiceProfiles::from_env()?);
//!
//!     let emb = svc.embedding().embed_batch(&["Ferris".to_string()]).await?;
//!     println!("vectors = {}, model = {}", emb.len(), svc.engine().model_name());
//!
//!     for status in svc.health_all().await {
//!         println!("{status:?}");
//!     }
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tracing::info;

use crate::{
    config::{
        LlmModelConfig, LlmProvider,
        default_config::{config_embedding_from_env, config_generation_from_env},
    },
    engine::GenerationEngine,
    error_handler::{AiLlmError, ConfigError, Result, env_opt_string},
    health_service::{HealthService, HealthStatus},
    services::{
        DEFAULT_STREAM_BUFFER, ollama_service::OllamaService, open_ai_service::OpenAiService,
    },
};

/// Embedding client for either provider.
#[derive(Debug, Clone)]
pub enum EmbeddingClient {
    Ollama(Arc<OllamaService>),
    OpenAI(Arc<OpenAiService>),
}

impl EmbeddingClient {
    /// Builds the client matching `cfg.provider`.
    ///
    /// # Errors
    /// Propagates provider construction errors.
    pub fn new(cfg: LlmModelConfig) -> Result<Self> {
        Ok(match cfg.provider {
            LlmProvider::Ollama => Self::Ollama(Arc::new(OllamaService::new(cfg)?)),
            LlmProvider::OpenAI => Self::OpenAI(Arc::new(OpenAiService::new(cfg)?)),
        })
    }

    /// Embeds many inputs in one request, preserving order.
    ///
    /// # Errors
    /// Transport, status and decode errors from the provider.
    pub async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        match self {
            Self::Ollama(cli) => cli.embeddings_batch(inputs).await,
            Self::OpenAI(cli) => cli.embeddings_batch(inputs).await,
        }
    }

    pub fn config(&self) -> &LlmModelConfig {
        match self {
            Self::Ollama(cli) => cli.config(),
            Self::OpenAI(cli) => cli.config(),
        }
    }
}

/// Generation engine plus embedding client, built from two configs.
pub struct LlmServiceProfiles {
    generation: LlmModelConfig,
    engine: Arc<dyn GenerationEngine>,
    embedding: EmbeddingClient,
    health: HealthService,
}

impl LlmServiceProfiles {
    /// Creates both profiles.
    ///
    /// - `stream_buffer`: capacity of each generation's output channel
    /// - `health_timeout_secs`: timeout for health probes (default 10s)
    ///
    /// # Errors
    /// Propagates provider construction errors.
    pub fn new(
        generation: LlmModelConfig,
        embedding: LlmModelConfig,
        stream_buffer: usize,
        health_timeout_secs: Option<u64>,
    ) -> Result<Self> {
        let engine: Arc<dyn GenerationEngine> = match generation.provider {
            LlmProvider::Ollama => Arc::new(
                OllamaService::new(generation.clone())?.with_stream_buffer(stream_buffer),
            ),
            LlmProvider::OpenAI => Arc::new(
                OpenAiService::new(generation.clone())?.with_stream_buffer(stream_buffer),
            ),
        };

        info!(
            generation = %generation.provider,
            generation_model = %generation.model,
            embedding = %embedding.provider,
            embedding_model = %embedding.model,
            "LLM profiles ready"
        );

        Ok(Self {
            generation,
            engine,
            embedding: EmbeddingClient::new(embedding)?,
            health: HealthService::new(health_timeout_secs)?,
        })
    }

    /// Builds both profiles from the environment (see [`crate::config::default_config`]).
    ///
    /// `STREAM_BUFFER` overrides the output channel capacity.
    ///
    /// # Errors
    /// Configuration and provider construction errors.
    pub fn from_env() -> Result<Self> {
        let generation = config_generation_from_env()?;
        let embedding = config_embedding_from_env(&generation)?;
        let stream_buffer = match env_opt_string("STREAM_BUFFER") {
            Some(v) => v
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(AiLlmError::Config(ConfigError::InvalidNumber {
                    var: "STREAM_BUFFER",
                    reason: "expected a positive integer",
                }))?,
            None => DEFAULT_STREAM_BUFFER,
        };
        Self::new(generation, embedding, stream_buffer, None)
    }

    /// Shared generation engine.
    pub fn engine(&self) -> Arc<dyn GenerationEngine> {
        self.engine.clone()
    }

    /// Embedding client (cheap to clone).
    pub fn embedding(&self) -> &EmbeddingClient {
        &self.embedding
    }

    /// Probes both profiles. Identical configs are probed once.
    pub async fn health_all(&self) -> Vec<HealthStatus> {
        let mut out = vec![self.health.check("generation", &self.generation).await];
        if self.embedding.config() != &self.generation {
            out.push(self.health.check("embedding", self.embedding.config()).await);
        }
        out
    }
}
