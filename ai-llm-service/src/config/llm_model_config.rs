use crate::config::llm_provider::LlmProvider;

/// Connection settings for one model on one provider.
///
/// Sampling knobs are not part of this struct: they arrive with every
/// request as [`crate::SamplingParams`].
///
/// # Examples
///
/// ```
/// use ai_llm_service::{LlmModelConfig, LlmProvider};
///
/// let cfg = LlmModelConfig {
///     provider: LlmProvider::Ollama,
///     model: "llama3.1:8b".to_string(),
///     endpoint: "http://localhost:11434".to_string(),
///     api_key: None,
///     timeout_secs: None,
/// };
/// assert_eq!(cfg.base_url(), "http://localhost:11434");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmModelConfig {
    /// The LLM provider/backend.
    pub provider: LlmProvider,

    /// Model identifier string (e.g. `"llama3.1:8b"`, `"all-minilm"`).
    pub model: String,

    /// Base URL of the provider (without the `/api` or `/v1` suffix).
    pub endpoint: String,

    /// Optional bearer token.
    pub api_key: Option<String>,

    /// Optional HTTP timeout in seconds. `None` means no client-side timeout.
    pub timeout_secs: Option<u64>,
}

impl LlmModelConfig {
    /// Endpoint without trailing slashes.
    pub fn base_url(&self) -> &str {
        self.endpoint.trim().trim_end_matches('/')
    }
}
