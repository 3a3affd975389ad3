//! OpenAI-compatible service (vLLM, OpenAI, llama.cpp server, ...).
//!
//! Endpoints are derived from `LlmModelConfig::endpoint`:
//! - POST {endpoint}/v1/completions: streamed text completion (SSE)
//! - POST {endpoint}/v1/embeddings: embeddings retrieval
//!
//! Completions are used rather than chat completions because the prompt is
//! already fully templated by the caller. Dropping the SSE stream closes the
//! connection, which vLLM treats as an abort of the request.

use std::{sync::Arc, time::Instant};

use futures::future::BoxFuture;
use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

use crate::{
    config::{LlmModelConfig, LlmProvider, SamplingParams},
    engine::{AbortRegistry, GenerationEngine, OutputStream, StartGuard},
    error_handler::{AiLlmError, ConfigError, Result, validate_http_endpoint},
    services::{
        DEFAULT_STREAM_BUFFER, ensure_success,
        stream_pump::{Delta, spawn_pump},
    },
};

/// Thin client for an OpenAI-compatible server.
#[derive(Debug)]
pub struct OpenAiService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    url_completions: String,
    url_embeddings: String,
    inflight: Arc<AbortRegistry>,
    stream_buffer: usize,
}

impl OpenAiService {
    /// Creates a new [`OpenAiService`] from the given config.
    ///
    /// The API key is optional: self-hosted vLLM usually runs without one.
    ///
    /// # Errors
    /// - [`ConfigError::UnsupportedProvider`] if `cfg.provider` is not OpenAI
    /// - [`ConfigError::InvalidFormat`] for a bad endpoint or API key header
    /// - [`AiLlmError::HttpTransport`] if the HTTP client cannot be built
    pub fn new(cfg: LlmModelConfig) -> Result<Self> {
        if cfg.provider != LlmProvider::OpenAI {
            return Err(ConfigError::UnsupportedProvider(cfg.provider.to_string()).into());
        }
        validate_http_endpoint("LLM_URL", &cfg.endpoint)?;

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        if let Some(key) = &cfg.api_key {
            let value = header::HeaderValue::from_str(&format!("Bearer {key}")).map_err(|_| {
                ConfigError::InvalidFormat {
                    var: "LLM_API_KEY",
                    reason: "not a valid header value",
                }
            })?;
            headers.insert(header::AUTHORIZATION, value);
        }

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(secs) = cfg.timeout_secs {
            builder = builder.timeout(std::time::Duration::from_secs(secs));
        }
        let client = builder.build()?;

        let base = cfg.base_url().to_string();
        info!(
            model = %cfg.model,
            endpoint = %base,
            has_api_key = cfg.api_key.is_some(),
            "OpenAiService initialized"
        );

        Ok(Self {
            client,
            url_completions: format!("{base}/v1/completions"),
            url_embeddings: format!("{base}/v1/embeddings"),
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

    /// Starts a **streaming** completion via `/v1/completions`.
    ///
    /// # Errors
    /// - [`AiLlmError::DuplicateRequest`] if `request_id` is in flight
    /// - [`AiLlmError::HttpStatus`] for non-2xx responses
    /// - [`AiLlmError::HttpTransport`] for client/network failures
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
        let body = CompletionRequest::new(&self.cfg.model, prompt, params, request_id);

        debug!(prompt_len = prompt.len(), "POST {}", self.url_completions);
        let send = self.client.post(&self.url_completions).json(&body).send();

        let resp = tokio::select! {
            _ = token.cancelled() => Err(AiLlmError::Aborted(request_id.to_string())),
            resp = send => match resp {
                Ok(resp) => ensure_success(resp, &self.url_completions).await,
                Err(err) => Err(err.into()),
            },
        };
        let resp = resp.inspect_err(|err| error!(error = %err, "completion request failed"))?;
        started.disarm();

        Ok(spawn_pump(
            resp.bytes_stream(),
            decode_sse_line,
            token,
            self.inflight.clone(),
            request_id.to_string(),
            self.stream_buffer,
        ))
    }

    /// Retrieves embeddings for a batch of inputs via `/v1/embeddings`.
    ///
    /// Results are re-ordered by their `index` field.
    ///
    /// # Errors
    /// - [`AiLlmError::HttpStatus`] for non-2xx responses
    /// - [`AiLlmError::HttpTransport`] for client/network failures
    /// - [`AiLlmError::Decode`] if the JSON cannot be parsed or the count differs
    pub async fn embeddings_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let started = Instant::now();
        let body = EmbeddingsRequest {
            model: &self.cfg.model,
            input: inputs,
        };

        debug!(inputs = inputs.len(), "POST {}", self.url_embeddings);
        let resp = self
            .client
            .post(&self.url_embeddings)
            .json(&body)
            .send()
            .await?;
        let resp = ensure_success(resp, &self.url_embeddings).await?;

        let mut out: EmbeddingsResponse = resp.json().await.map_err(|e| {
            AiLlmError::Decode(format!("serde error: {e}; expected `data[].embedding`"))
        })?;
        if out.data.len() != inputs.len() {
            return Err(AiLlmError::Decode(format!(
                "expected {} embeddings, got {}",
                inputs.len(),
                out.data.len()
            )));
        }
        out.data.sort_by_key(|item| item.index);

        debug!(latency_ms = started.elapsed().as_millis(), "embeddings completed");
        Ok(out.data.into_iter().map(|item| item.embedding).collect())
    }

    /// Model configuration this client was built with.
    pub fn config(&self) -> &LlmModelConfig {
        &self.cfg
    }
}

impl GenerationEngine for OpenAiService {
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

/// Decodes one SSE line of a streamed completion.
///
/// Only `data:` lines carry payload; comments and `event:` lines are ignored.
fn decode_sse_line(line: &str) -> Result<Option<Delta>> {
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(None);
    };
    let data = data.trim();
    if data == "[DONE]" {
        return Ok(Some(Delta {
            text: String::new(),
            done: true,
        }));
    }

    let chunk: CompletionChunk = serde_json::from_str(data)
        .map_err(|e| AiLlmError::Decode(format!("invalid SSE payload: {e}")))?;
    if let Some(err) = chunk.error {
        return Err(AiLlmError::Engine(err.message));
    }
    let Some(choice) = chunk.choices.into_iter().next() else {
        return Ok(None);
    };
    Ok(Some(Delta {
        text: choice.text,
        done: choice.finish_reason.is_some(),
    }))
}

/* ===========================================================================
HTTP payloads & options
======================================================================== */

/// Request body for `/v1/completions`.
///
/// `top_k` is a vLLM extension; OpenAI ignores unknown fields.
#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    top_k: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [String]>,
    stream: bool,
    /// Lets server-side logs correlate with ours.
    user: &'a str,
}

impl<'a> CompletionRequest<'a> {
    fn new(model: &'a str, prompt: &'a str, params: &'a SamplingParams, request_id: &'a str) -> Self {
        Self {
            model,
            prompt,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            top_p: params.top_p,
            top_k: params.top_k,
            stop: Some(params.stop_sequences()).filter(|s| !s.is_empty()),
            stream: true,
            user: request_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
    #[serde(default)]
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    text: String,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Request body for `/v1/embeddings`.
#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

/// Response body for `/v1/embeddings`.
#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}
