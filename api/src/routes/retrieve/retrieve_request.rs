use serde::Deserialize;

/// Request payload for `POST /retrieve`.
#[derive(Debug, Deserialize)]
pub struct RetrieveBody {
    /// Required; a missing field is reported as a bad request.
    pub query: Option<String>,
    /// Number of documents; defaults to `RAG_DEFAULT_TOP_K`.
    pub top_k: Option<u64>,
}
