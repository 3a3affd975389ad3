use ai_llm_service::SamplingParams;
use contextor::GenerateRequest;
use serde::Deserialize;

use crate::error_handler::{AppError, AppResult};

/// Request payload for `POST /generate`; also the generation part of `POST /rag`.
///
/// Omitted sampling fields take the defaults of [`SamplingParams`].
#[derive(Debug, Default, Deserialize)]
pub struct GenerateBody {
    pub query: Option<String>,
    pub system_prompt: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    /// Engine-side top-k sampling; `-1` disables it.
    pub top_k_sampling: Option<i32>,
    pub stop: Option<Vec<String>>,
    #[serde(default)]
    pub stream: bool,
}

impl GenerateBody {
    /// Splits the payload into a generation request and the `stream` flag.
    pub fn into_request(self) -> AppResult<(GenerateRequest, bool)> {
        let query = self
            .query
            .ok_or_else(|| AppError::BadRequest("query is required".into()))?;
        let d = SamplingParams::default();
        let sampling = SamplingParams {
            max_tokens: self.max_tokens.unwrap_or(d.max_tokens),
            temperature: self.temperature.unwrap_or(d.temperature),
            top_p: self.top_p.unwrap_or(d.top_p),
            top_k: self.top_k_sampling.unwrap_or(d.top_k),
            stop: self.stop,
        };
        let req = GenerateRequest {
            query,
            system_prompt: self.system_prompt,
            sampling,
        };
        Ok((req, self.stream))
    }
}
