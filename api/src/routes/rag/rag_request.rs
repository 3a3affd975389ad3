use contextor::RagRequest;
use serde::Deserialize;

use crate::{error_handler::AppResult, routes::generate::generate_request::GenerateBody};

/// Request payload for `POST /rag`.
#[derive(Debug, Deserialize)]
pub struct RagBody {
    #[serde(flatten)]
    pub generation: GenerateBody,
    /// Documents to retrieve; defaults to `RAG_DEFAULT_TOP_K`.
    pub top_k: Option<u64>,
    /// Echo the retrieved documents as `contexts`.
    #[serde(default)]
    pub include_context: bool,
}

impl RagBody {
    pub fn into_request(self) -> AppResult<(RagRequest, bool)> {
        let (generation, stream) = self.generation.into_request()?;
        Ok((
            RagRequest {
                generation,
                top_k: self.top_k,
                include_context: self.include_context,
            },
            stream,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattened_fields_are_split() {
        let body: RagBody = serde_json::from_str(
            r#"{"query":"q","top_k":2,"include_context":true,"max_tokens":256,"temperature":0.2}"#,
        )
        .expect("json");
        let (req, stream) = body.into_request().expect("request");
        assert!(!stream);
        assert_eq!(req.top_k, Some(2));
        assert!(req.include_context);
        assert_eq!(req.generation.sampling.max_tokens, 256);
        assert_eq!(req.generation.sampling.temperature, 0.2);
    }
}
