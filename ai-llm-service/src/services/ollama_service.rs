//! Lightweight Ollama service for streamed text generation and embeddings.
//!
//! This module implements a thin client for the Ollama API:
//! - `POST {endpoint}/api/generate`: streamed generation (NDJSON, `stream=true`)
//! - `POST {endpoint}/api/embed`: embeddings for one or many inputs
//!
//! Aborting a request drops the streamed response, which closes the
//! connection; Ollama stops generating for a closed connection.
//!
//! # Examples
//!
//! ```no_run
//! use ai_llm_service::{LlmModelConfig, LlmProvider, SamplingParams};
//! use ai_llm_service::services::ollama_service::OllamaService;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let svc = OllamaService::new(LlmModelConfig {
//!     provider: LlmProvider::Ollama,
//!     model: "llama3.1:8b".into(),
//!     endpoint: "http://localhost:11434".into(),
//!     api_key: None,
//!     timeout_secs: None,
//! })?;
//!
//! let mut rx = svc
//!     .generate_stream("Write a haiku about Rust.", &SamplingParams::default(), "req-1")
//!     .await?;
//! while let Some(out) = rx.recv().await {
//!     println!("{}", out?.text);
//! }
//! # Ok(()) }
//! ```

use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::{
    config::{LlmModelConfig, LlmProvider, SamplingParams},
    engine::{AbortRegistry, GenerationEngine, OutputStream, StartGuard},
    error_handler::{AiLlmError, ConfigError, Result, validate_http_endpoint},
    services::{
        DEFAULT_STREAM_BUFFER, build_client, ensure_success,
        stream_pump::{Delta, spawn_pump},
    },
};

/// Thin client for Ollama.
///
/// Reuses one HTTP client; tracks in-flight generations for abort.
#[derive(Debug)]
pub struct OllamaService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    url_generate: String,
    url_embed: String,
    inflight: Arc<AbortRegistry>,
    stream_buffer: usize,
}

impl OllamaService {
    /// Creates a new [`OllamaService`] from the given config.
    ///
    /// # Errors
    /// - [`ConfigError::UnsupportedProvider`] if `cfg.provider` is not Ollama
    /// - [`ConfigError::InvalidFormat`] if `cfg.endpoint` is not http(s)
    /// - [`AiLlmError::HttpTransport`] if the HTTP client cannot be built
    pub fn new(cfg: LlmModelConfig) -> Result<Self> {
        if cfg.provider != LlmProvider::Ollama {
            return Err(ConfigError::UnsupportedProvider(cfg.provider.to_string()).into());
        }
        validate_http_endpoint("LLM_URL", &cfg.endpoint)?;

        let client = build_client(cfg.timeout_secs)?;
        let base = cfg.base_url().to_string();

        info!(model = %cfg.model, endpoint = %base, "OllamaService initialized");

        Ok(Self {
            client,
            url_generate: format!("{base}/api/generate"),
            url_embed: format!("{base}/api/embed"),
            cfg,
            inflight: Arc::new(AbortRegistry::new()),
            stream_buffer: DEFAULT_STREAM_BUFFER,
        })
    }

    /// Overrides the capacity of output channels.
    pub fn with_stream_buffer(mut self, buffer: usize) -> Self {
        self.stream_buffer = buffer.max(1);
        self
    }

    /// Starts a **streaming** generation via `/api/generate`.
    ///
    /// Mapped options: `num_predict`, `temperature`, `top_p`, `top_k`, `stop`.
    ///
    /// # Errors
    /// - [`AiLlmError::DuplicateRequest`] if `request_id` is in flight
    /// - [`AiLlmError::HttpStatus`] for non-2xx responses
    /// - [`AiLlmError::HttpTransport`] for client errors
    /// - [`AiLlmError::Aborted`] if aborted before the response headers arrived
    #[instrument(skip_all, fields(model = %self.cfg.model, %request_id))]
    pub async fn generate_stream(
        &self,
        prompt: &str,
        params: &SamplingParams,
        request_id: &str,
    ) -> Result<OutputStream> {
        let token = self.inflight.register(request_id)?;
        let started = StartGuard::new(self.inflight.clone(), request_id);
        let body = GenerateRequest::new(&self.cfg.model, prompt, params);

        debug!(prompt_len = prompt.len(), "POST {}", self.url_generate);
        let send = self.client.post(&self.url_generate).json(&body).send();

        let resp = tokio::select! {
            _ = token.cancelled() => Err(AiLlmError::Aborted(request_id.to_string())),
            resp = send => match resp {
                Ok(resp) => ensure_success(resp, &self.url_generate).await,
                Err(err) => Err(err.into()),
            },
        };
        let resp = resp?;
        started.disarm();

        Ok(spawn_pump(
            resp.bytes_stream(),
            decode_ndjson_line,
            token,
            self.inflight.clone(),
            request_id.to_string(),
            self.stream_buffer,
        ))
    }

    /// Retrieves embeddings for a batch of inputs via `/api/embed`.
    ///
    /// # Errors
    /// - [`AiLlmError::HttpStatus`] for non-2xx responses
    /// - [`AiLlmError::HttpTransport`] for client errors
    /// - [`AiLlmError::Decode`] if the response cannot be parsed or the count differs
    #[instrument(skip_all, fields(model = %self.cfg.model, inputs = inputs.len()))]
    pub async fn embeddings_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let body = EmbedRequest {
            model: &self.cfg.model,
            input: inputs,
        };

        debug!("POST {}", self.url_embed);
        let resp = self.client.post(&self.url_embed).json(&body).send().await?;
        let resp = ensure_success(resp, &self.url_embed).await?;

        let out: EmbedResponse = resp.json().await.map_err(|e| {
            AiLlmError::Decode(format!("serde error: {e}; expected `{{ embeddings: number[][] }}`"))
        })?;

        if out.embeddings.len() != inputs.len() {
            return Err(AiLlmError::Decode(format!(
                "expected {} embeddings, got {}",
                inputs.len(),
                out.embeddings.len()
            )));
        }
        Ok(out.embeddings)
    }

    /// Model configuration this client was built with.
    pub fn config(&self) -> &LlmModelConfig {
        &self.cfg
    }
}

impl GenerationEngine for OllamaService {
    fn model_name(&self) -> &str {
        &self.cfg.model
    }

    fn generate<'a>(
        &'a self,
        prompt: String,
        params: SamplingParams,
        request_id: &'a str,
    ) -> BoxFuture<'a, Result<OutputStream>> {
        Box::pin(async move { self.generate_stream(&prompt, &params, request_id).await })
    }

    fn abort<'a>(&'a self, request_id: &'a str) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.inflight.abort(request_id);
        })
    }
}

/// Decodes one NDJSON line of `/api/generate`.
fn decode_ndjson_line(line: &str) -> Result<Option<Delta>> {
    let chunk: GenerateChunk = serde_json::from_str(line)
        .map_err(|e| AiLlmError::Decode(format!("invalid NDJSON line: {e}")))?;
    if let Some(err) = chunk.error {
        return Err(AiLlmError::Engine(err));
    }
    Ok(Some(Delta {
        text: chunk.response,
        done: chunk.done,
    }))
}

/* ==========================
HTTP payloads & options
========================== */

/// Request body for `/api/generate`.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    /// The prompt already carries its own template.
    raw: bool,
    options: GenerateOptions<'a>,
}

impl<'a> GenerateRequest<'a> {
    fn new(model: &'a str, prompt: &'a str, params: &'a SamplingParams) -> Self {
        Self {
            model,
            prompt,
            stream: true,
            raw: true,
            options: GenerateOptions {
                num_predict: params.max_tokens,
                temperature: params.temperature,
                top_p: params.top_p,
                top_k: (params.top_k > 0).then_some(params.top_k),
                stop: Some(params.stop_sequences()).filter(|s| !s.is_empty()),
            },
        }
    }
}

/// Subset of Ollama `options`.
#[derive(Debug, Serialize)]
struct GenerateOptions<'a> {
    num_predict: u32,
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [String]>,
}

/// One streamed line of `/api/generate`.
#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Request body for `/api/embed`.
#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

/// Response body for `/api/embed`.
#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}
