//! Query service core: retrieval, prompts and cancellable generation.
//!
//! Public API: [`QueryService`]. It answers three kinds of requests:
//! - retrieve-only: embed the query and return the top-K documents
//! - generate-only: prompt the engine with the query alone
//! - RAG: retrieve, build a context block, then generate
//!
//! Generations run either buffered (answer cleaned, returned whole) or
//! streamed (suffix fragments over a channel). In both modes a client that
//! goes away makes the engine receive `abort(request_id)`, and the outcome is
//! [`ContextorError::ClientClosed`] rather than an answer.

mod api_types;
mod cfg;
mod error;
mod postprocess;
pub mod prompt;
mod session;

pub use api_types::{
    ComponentHealth, GenerateAnswer, GenerateRequest, HealthReport, RagAnswer, RagRequest,
    RetrieveAnswer,
};
pub use cfg::{ContextorConfig, DEFAULT_SYSTEM_PROMPT};
pub use error::ContextorError;
pub use postprocess::AnswerCleaner;
pub use session::{CLIENT_CLOSED_STATUS, FragmentStream, StreamEvent, next_fragment};

use std::{sync::Arc, time::Instant};

use ai_llm_service::{GenerationEngine, SamplingParams, service_profiles::LlmServiceProfiles};
use rag_store::{RagStore, RetrievalHit};
use services::ids::new_request_id;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, warn};

/// Shared, cheaply clonable query service.
///
/// The vector store and the generation engine are constructed once at
/// startup and injected here.
#[derive(Clone)]
pub struct QueryService {
    store: RagStore,
    engine: Arc<dyn GenerationEngine>,
    cleaner: Arc<AnswerCleaner>,
    cfg: Arc<ContextorConfig>,
    llm: Option<Arc<LlmServiceProfiles>>,
}

impl QueryService {
    /// # Errors
    /// [`ContextorError::Config`] if `cfg` is invalid.
    pub fn new(
        store: RagStore,
        engine: Arc<dyn GenerationEngine>,
        cfg: ContextorConfig,
    ) -> Result<Self, ContextorError> {
        cfg.validate()?;
        let cleaner = AnswerCleaner::new(cfg.hyphen_run_limit)?;
        Ok(Self {
            store,
            engine,
            cleaner: Arc::new(cleaner),
            cfg: Arc::new(cfg),
            llm: None,
        })
    }

    /// Adds LLM endpoint probes to [`QueryService::health`].
    pub fn with_llm_health(mut self, profiles: Arc<LlmServiceProfiles>) -> Self {
        self.llm = Some(profiles);
        self
    }

    pub fn model_name(&self) -> &str {
        self.engine.model_name()
    }

    pub fn config(&self) -> &ContextorConfig {
        &self.cfg
    }

    /// Top-K documents for `query`.
    ///
    /// # Errors
    /// - [`ContextorError::InvalidRequest`] for a blank query or a bad `top_k`;
    ///   nothing is embedded or searched in that case
    /// - [`ContextorError::Rag`] if embedding or search failed
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: Option<u64>,
    ) -> Result<RetrieveAnswer, ContextorError> {
        debug!(stage = "received", kind = "retrieve");
        let trimmed = validate_query(query)?;
        let k = self.resolve_top_k(top_k)?;
        debug!(stage = "validated", top_k = k);

        let results = self.search(trimmed, k).await?;
        Ok(RetrieveAnswer {
            query: query.to_string(),
            results,
        })
    }

    /// Buffered plain generation.
    ///
    /// Dropping the returned future aborts the generation.
    ///
    /// # Errors
    /// See [`QueryService::generate_with_cancel`].
    pub async fn generate(&self, req: GenerateRequest) -> Result<GenerateAnswer, ContextorError> {
        self.generate_with_cancel(req, CancellationToken::new()).await
    }

    /// Buffered plain generation that also stops when `cancel` fires.
    ///
    /// # Errors
    /// - [`ContextorError::InvalidRequest`] on validation failure
    /// - [`ContextorError::ClientClosed`] if cancelled
    /// - [`ContextorError::Generation`] if the engine failed
    pub async fn generate_with_cancel(
        &self,
        req: GenerateRequest,
        cancel: CancellationToken,
    ) -> Result<GenerateAnswer, ContextorError> {
        debug!(stage = "received", kind = "generate");
        let query = validate_generation(&req)?.to_string();
        debug!(stage = "validated");

        let prompt = prompt::build_generate_prompt(self.system_prompt(&req), &query);
        let raw = self.run_buffered(prompt, req.sampling, cancel).await?;
        Ok(GenerateAnswer {
            model: self.model_name().to_string(),
            answer: self.cleaner.clean(&raw),
            query: req.query,
        })
    }

    /// Streamed plain generation.
    ///
    /// # Errors
    /// Validation and engine start-up failures, before any fragment exists.
    pub async fn generate_stream(
        &self,
        req: GenerateRequest,
    ) -> Result<FragmentStream, ContextorError> {
        debug!(stage = "received", kind = "generate", stream = true);
        let query = validate_generation(&req)?;
        debug!(stage = "validated");

        let prompt = prompt::build_generate_prompt(self.system_prompt(&req), query);
        self.start_stream(prompt, req.sampling).await
    }

    /// Buffered RAG generation.
    ///
    /// # Errors
    /// See [`QueryService::rag_with_cancel`].
    pub async fn rag(&self, req: RagRequest) -> Result<RagAnswer, ContextorError> {
        self.rag_with_cancel(req, CancellationToken::new()).await
    }

    /// Buffered RAG generation that also stops when `cancel` fires.
    ///
    /// # Errors
    /// As [`QueryService::generate_with_cancel`], plus [`ContextorError::Rag`]
    /// if retrieval failed.
    pub async fn rag_with_cancel(
        &self,
        req: RagRequest,
        cancel: CancellationToken,
    ) -> Result<RagAnswer, ContextorError> {
        debug!(stage = "received", kind = "rag");
        let query = validate_generation(&req.generation)?.to_string();
        let k = self.resolve_top_k(req.top_k)?;
        debug!(stage = "validated", top_k = k);

        let hits = self.search(&query, k).await?;
        let prompt = self.rag_prompt(&req.generation, &hits, &query);
        let raw = self
            .run_buffered(prompt, req.generation.sampling, cancel)
            .await?;

        Ok(RagAnswer {
            model: self.model_name().to_string(),
            answer: self.cleaner.clean(&raw),
            query: req.generation.query,
            used_context: !hits.is_empty(),
            context_count: hits.len(),
            contexts: req.include_context.then_some(hits),
        })
    }

    /// Streamed RAG generation. Retrieval completes before the stream starts.
    ///
    /// # Errors
    /// Validation, retrieval and engine start-up failures.
    pub async fn rag_stream(&self, req: RagRequest) -> Result<FragmentStream, ContextorError> {
        debug!(stage = "received", kind = "rag", stream = true);
        let query = validate_generation(&req.generation)?.to_string();
        let k = self.resolve_top_k(req.top_k)?;
        debug!(stage = "validated", top_k = k);

        let hits = self.search(&query, k).await?;
        let prompt = self.rag_prompt(&req.generation, &hits, &query);
        self.start_stream(prompt, req.generation.sampling).await
    }

    /// Probes the LLM endpoints (if attached) and the vector store collection.
    pub async fn health(&self) -> HealthReport {
        let mut components: Vec<ComponentHealth> = match &self.llm {
            Some(llm) => llm.health_all().await.into_iter().map(Into::into).collect(),
            None => Vec::new(),
        };

        let rag = self.store.config();
        let started = Instant::now();
        let probe = self.store.points_count().await;
        let latency_ms = started.elapsed().as_millis();
        components.push(match probe {
            Ok(n) => ComponentHealth {
                component: "vector-store".into(),
                endpoint: rag.qdrant_url.clone(),
                ok: true,
                latency_ms,
                message: format!("collection `{}` holds {n} points", rag.collection),
            },
            Err(err) => ComponentHealth {
                component: "vector-store".into(),
                endpoint: rag.qdrant_url.clone(),
                ok: false,
                latency_ms,
                message: err.to_string(),
            },
        });

        let ok = components.iter().all(|c| c.ok);
        if !ok {
            warn!(unhealthy = components.iter().filter(|c| !c.ok).count(), "health probe failed");
        }
        HealthReport { ok, components }
    }

    fn system_prompt<'a>(&'a self, req: &'a GenerateRequest) -> &'a str {
        req.system_prompt
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.cfg.default_system_prompt)
    }

    fn resolve_top_k(&self, top_k: Option<u64>) -> Result<u64, ContextorError> {
        let k = top_k.unwrap_or(self.cfg.default_top_k);
        if k == 0 || k > self.cfg.max_top_k {
            return Err(ContextorError::InvalidRequest(format!(
                "top_k must be within 1..={}",
                self.cfg.max_top_k
            )));
        }
        Ok(k)
    }

    fn rag_prompt(&self, req: &GenerateRequest, hits: &[RetrievalHit], query: &str) -> String {
        let block = prompt::build_context_block(hits);
        prompt::build_rag_prompt(self.system_prompt(req), &block, query)
    }

    async fn search(&self, query: &str, top_k: u64) -> Result<Vec<RetrievalHit>, ContextorError> {
        debug!(stage = "retrieving", top_k);
        let started = Instant::now();
        let hits = self.store.retrieve(query, top_k).await?;
        info!(
            hits = hits.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "context retrieved"
        );
        Ok(hits)
    }

    /// Runs one generation on a separate task.
    ///
    /// The drop guard cancels the task's token when this future is dropped
    /// (client disconnect), which makes the session abort the engine.
    async fn run_buffered(
        &self,
        prompt: String,
        params: SamplingParams,
        cancel: CancellationToken,
    ) -> Result<String, ContextorError> {
        let request_id = new_request_id();
        let guard = cancel.clone().drop_guard();
        let engine = self.engine.clone();

        let task = tokio::spawn(
            async move {
                session::run_to_completion(engine.as_ref(), prompt, params, &request_id, &cancel)
                    .await
            }
            .in_current_span(),
        );
        let res = task
            .await
            .map_err(|e| ContextorError::Internal(format!("generation task: {e}")));
        guard.disarm();
        res?
    }

    async fn start_stream(
        &self,
        prompt: String,
        params: SamplingParams,
    ) -> Result<FragmentStream, ContextorError> {
        session::stream_fragments(
            self.engine.clone(),
            prompt,
            params,
            new_request_id(),
            self.cfg.stream_buffer,
        )
        .await
    }
}

fn validate_query(query: &str) -> Result<&str, ContextorError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(ContextorError::InvalidRequest("query must not be empty".into()));
    }
    Ok(trimmed)
}

fn validate_generation(req: &GenerateRequest) -> Result<&str, ContextorError> {
    let query = validate_query(&req.query)?;
    req.sampling
        .validate()
        .map_err(|e| ContextorError::InvalidRequest(e.to_string()))?;
    Ok(query)
}
