//! Public request/answer types shared with the HTTP layer.

use ai_llm_service::SamplingParams;
use rag_store::RetrievalHit;
use serde::Serialize;

/// Input of a plain or RAG generation.
///
/// # Example
/// ```
/// use contextor::GenerateRequest;
/// let req = GenerateRequest::new("What is Rust?");
/// assert!(req.system_prompt.is_none());
/// assert_eq!(req.sampling.max_tokens, 1024);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct GenerateRequest {
    pub query: String,
    /// Falls back to the configured default system prompt.
    pub system_prompt: Option<String>,
    pub sampling: SamplingParams,
}

impl GenerateRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            system_prompt: None,
            sampling: SamplingParams::default(),
        }
    }
}

/// Input of a RAG generation.
#[derive(Clone, Debug, PartialEq)]
pub struct RagRequest {
    pub generation: GenerateRequest,
    /// Number of documents to retrieve; `None` uses the configured default.
    pub top_k: Option<u64>,
    /// Echo the retrieved documents in the answer.
    pub include_context: bool,
}

/// Answer of a retrieve-only request.
#[derive(Clone, Debug, Serialize)]
pub struct RetrieveAnswer {
    pub query: String,
    pub results: Vec<RetrievalHit>,
}

/// Answer of a buffered plain generation.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct GenerateAnswer {
    pub model: String,
    pub answer: String,
    pub query: String,
}

/// Answer of a buffered RAG generation.
///
/// `contexts` is present only when the request asked for it.
#[derive(Clone, Debug, Serialize)]
pub struct RagAnswer {
    pub model: String,
    pub answer: String,
    pub query: String,
    pub used_context: bool,
    pub context_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contexts: Option<Vec<RetrievalHit>>,
}

/// Health of every upstream the query service depends on.
#[derive(Clone, Debug, Serialize)]
pub struct HealthReport {
    pub ok: bool,
    pub components: Vec<ComponentHealth>,
}

/// One probed upstream.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ComponentHealth {
    pub component: String,
    pub endpoint: String,
    pub ok: bool,
    pub latency_ms: u128,
    pub message: String,
}

impl From<ai_llm_service::health_service::HealthStatus> for ComponentHealth {
    fn from(s: ai_llm_service::health_service::HealthStatus) -> Self {
        Self {
            component: format!("{} ({} {})", s.component, s.provider, s.model),
            endpoint: s.endpoint,
            ok: s.ok,
            latency_ms: s.latency_ms,
            message: s.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contexts_are_omitted_when_absent() {
        let answer = RagAnswer {
            model: "m".into(),
            answer: "a".into(),
            query: "q".into(),
            used_context: false,
            context_count: 0,
            contexts: None,
        };
        let v = serde_json::to_value(&answer).expect("json");
        assert!(v.get("contexts").is_none());
        assert_eq!(v["context_count"], 0);
    }
}
