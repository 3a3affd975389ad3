//! Provider configs loaded from environment variables.
//!
//! # Environment variables
//!
//! Generation:
//! - `LLM_KIND`          = `ollama` (default) or `openai` / `vllm`
//! - `LLM_URL`           = endpoint; for Ollama falls back to `OLLAMA_URL`, then `OLLAMA_PORT`
//! - `LLM_MODEL`         = model name; for Ollama falls back to `OLLAMA_MODEL`
//! - `LLM_API_KEY`       = optional bearer token
//! - `LLM_TIMEOUT_SECS`  = optional HTTP timeout
//!
//! Embeddings:
//! - `EMBEDDING_KIND`    = provider, defaults to `LLM_KIND`
//! - `EMBEDDING_URL`     = endpoint, defaults to the generation endpoint
//! - `EMBEDDING_MODEL`   = model name (required)

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, ConfigError, env_opt_string, env_opt_u64, must_env, validate_http_endpoint,
    },
};

/// Resolves the Ollama endpoint.
///
/// Precedence: `OLLAMA_URL`, then `OLLAMA_PORT` → `http://localhost:{port}`.
fn ollama_endpoint() -> Result<String, AiLlmError> {
    if let Some(url) = env_opt_string("OLLAMA_URL") {
        return Ok(url);
    }
    if let Some(port) = env_opt_string("OLLAMA_PORT") {
        port.parse::<u16>().map_err(|_| ConfigError::InvalidNumber {
            var: "OLLAMA_PORT",
            reason: "expected u16 (1..=65535)",
        })?;
        return Ok(format!("http://localhost:{port}"));
    }
    Err(ConfigError::MissingVar("LLM_URL, OLLAMA_URL or OLLAMA_PORT").into())
}

fn provider_from(var: &'static str, fallback: LlmProvider) -> Result<LlmProvider, AiLlmError> {
    match env_opt_string(var) {
        Some(kind) => Ok(kind.parse::<LlmProvider>()?),
        None => Ok(fallback),
    }
}

/// Builds the generation engine config.
///
/// # Errors
/// - [`ConfigError::MissingVar`] when endpoint or model is missing
/// - [`ConfigError::UnsupportedProvider`] for an unknown `LLM_KIND`
/// - [`ConfigError::InvalidFormat`] when the endpoint is not http(s)
pub fn config_generation_from_env() -> Result<LlmModelConfig, AiLlmError> {
    let provider = provider_from("LLM_KIND", LlmProvider::Ollama)?;

    let endpoint = match (env_opt_string("LLM_URL"), provider) {
        (Some(url), _) => url,
        (None, LlmProvider::Ollama) => ollama_endpoint()?,
        (None, LlmProvider::OpenAI) => return Err(ConfigError::MissingVar("LLM_URL").into()),
    };
    validate_http_endpoint("LLM_URL", &endpoint)?;

    let model = match (env_opt_string("LLM_MODEL"), provider) {
        (Some(model), _) => model,
        (None, LlmProvider::Ollama) => must_env("OLLAMA_MODEL")?,
        (None, LlmProvider::OpenAI) => return Err(ConfigError::MissingVar("LLM_MODEL").into()),
    };

    Ok(LlmModelConfig {
        provider,
        model,
        endpoint,
        api_key: env_opt_string("LLM_API_KEY"),
        timeout_secs: env_opt_u64("LLM_TIMEOUT_SECS")?,
    })
}

/// Builds the embedding model config, reusing the generation endpoint when
/// `EMBEDDING_URL` is not set.
///
/// # Errors
/// Same as [`config_generation_from_env`], plus a missing `EMBEDDING_MODEL`.
pub fn config_embedding_from_env(
    generation: &LlmModelConfig,
) -> Result<LlmModelConfig, AiLlmError> {
    let provider = provider_from("EMBEDDING_KIND", generation.provider)?;
    let endpoint = env_opt_string("EMBEDDING_URL").unwrap_or_else(|| generation.endpoint.clone());
    validate_http_endpoint("EMBEDDING_URL", &endpoint)?;

    Ok(LlmModelConfig {
        provider,
        model: must_env("EMBEDDING_MODEL")?,
        endpoint,
        api_key: env_opt_string("EMBEDDING_API_KEY").or_else(|| generation.api_key.clone()),
        timeout_secs: Some(env_opt_u64("EMBEDDING_TIMEOUT_SECS")?.unwrap_or(30)),
    })
}

/// Builds only the embedding config for processes that never generate
/// (the batch loader).
///
/// Uses `EMBEDDING_URL` when set, otherwise the Ollama endpoint variables.
pub fn config_embedding_only_from_env() -> Result<LlmModelConfig, AiLlmError> {
    let provider = provider_from("EMBEDDING_KIND", LlmProvider::Ollama)?;
    let endpoint = match (env_opt_string("EMBEDDING_URL"), provider) {
        (Some(url), _) => url,
        (None, LlmProvider::Ollama) => ollama_endpoint()?,
        (None, LlmProvider::OpenAI) => {
            return Err(ConfigError::MissingVar("EMBEDDING_URL").into());
        }
    };
    validate_http_endpoint("EMBEDDING_URL", &endpoint)?;

    Ok(LlmModelConfig {
        provider,
        model: must_env("EMBEDDING_MODEL")?,
        endpoint,
        api_key: env_opt_string("EMBEDDING_API_KEY"),
        timeout_secs: Some(env_opt_u64("EMBEDDING_TIMEOUT_SECS")?.unwrap_or(30)),
    })
}
