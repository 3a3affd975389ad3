//! HTTP client for the three query endpoints.

use std::time::{Duration, Instant};

use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use thiserror::Error;

/// Documents requested from `/retrieve` and `/rag`.
pub const TOP_K: u64 = 3;
pub const TEMPERATURE: f32 = 0.7;
pub const MAX_TOKENS: u32 = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endpoint {
    Retrieve,
    Generate,
    Rag,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Retrieve => "retrieve",
            Endpoint::Generate => "generate",
            Endpoint::Rag => "rag",
        }
    }

    /// Request body sent for `query`.
    pub fn payload(self, query: &str) -> Value {
        match self {
            Endpoint::Retrieve => json!({ "query": query, "top_k": TOP_K }),
            Endpoint::Generate => json!({
                "query": query,
                "temperature": TEMPERATURE,
                "max_tokens": MAX_TOKENS,
            }),
            Endpoint::Rag => json!({
                "query": query,
                "top_k": TOP_K,
                "temperature": TEMPERATURE,
                "max_tokens": MAX_TOKENS,
                "include_context": true,
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Hit {
    #[serde(default)]
    pub text: String,
    #[serde(default = "unknown")]
    pub source: String,
    #[serde(default)]
    pub score: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrieveResponse {
    #[serde(default)]
    pub results: Vec<Hit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    #[serde(default = "unknown")]
    pub model: String,
    #[serde(default)]
    pub answer: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RagResponse {
    #[serde(default = "unknown")]
    pub model: String,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub context_count: usize,
    #[serde(default)]
    pub contexts: Vec<Hit>,
}

fn unknown() -> String {
    "Unknown".into()
}

/// Why one endpoint call produced no result.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("API Error: {status}")]
    Api { status: u16, body: String },

    #[error("Request Error: {0}")]
    Request(#[from] reqwest::Error),
}

pub type Outcome<T> = Result<T, CallError>;

/// Results of one query against all three endpoints.
#[derive(Debug)]
pub struct Comparison {
    pub query: String,
    pub retrieve: Outcome<RetrieveResponse>,
    pub generate: Outcome<GenerateResponse>,
    pub rag: Outcome<RagResponse>,
    pub elapsed: Duration,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl Comparison {
    /// Number of endpoint calls that produced an error.
    pub fn failed_calls(&self) -> usize {
        [
            self.retrieve.is_err(),
            self.generate.is_err(),
            self.rag.is_err(),
        ]
        .into_iter()
        .filter(|failed| *failed)
        .count()
    }
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn call<T: DeserializeOwned>(&self, endpoint: Endpoint, query: &str) -> Outcome<T> {
        let url = format!("{}/{}", self.base_url, endpoint.path());
        let res = self
            .http
            .post(url)
            .json(&endpoint.payload(query))
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(CallError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(res.json::<T>().await?)
    }

    /// Queries the three endpoints concurrently.
    pub async fn compare(&self, query: &str) -> Comparison {
        let started = Instant::now();
        let (retrieve, generate, rag) = tokio::join!(
            self.call::<RetrieveResponse>(Endpoint::Retrieve, query),
            self.call::<GenerateResponse>(Endpoint::Generate, query),
            self.call::<RagResponse>(Endpoint::Rag, query),
        );
        Comparison {
            query: query.to_string(),
            retrieve,
            generate,
            rag,
            elapsed: started.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, method, path},
    };

    use super::*;

    #[test]
    fn rag_payload_asks_for_contexts() {
        let body = Endpoint::Rag.payload("q");
        assert_eq!(body["include_context"], true);
        assert_eq!(body["top_k"], 3);
        assert_eq!(body["max_tokens"], 256);
    }

    #[tokio::test]
    async fn compare_collects_all_three_answers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/retrieve"))
            .and(body_partial_json(json!({"query": "speakers", "top_k": 3})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "query": "speakers",
                "results": [{"text": "Waterproof speaker", "source": "audio", "score": 0.91}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "m", "answer": "plain", "query": "speakers"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rag"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "error": "Search failed", "code": "RETRIEVAL_FAILED"
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri(), Duration::from_secs(5)).expect("client");
        let cmp = client.compare("speakers").await;

        let retrieve = cmp.retrieve.expect("retrieve");
        assert_eq!(retrieve.results.len(), 1);
        assert_eq!(retrieve.results[0].source, "audio");
        assert_eq!(cmp.generate.expect("generate").answer, "plain");
        match cmp.rag {
            Err(err @ CallError::Api { status: 500, .. }) => {
                assert_eq!(err.to_string(), "API Error: 500");
            }
            other => panic!("unexpected rag outcome: {other:?}"),
        }
    }
}
