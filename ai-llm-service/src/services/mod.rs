//! Concrete providers and the shared streaming plumbing.

pub mod line_decoder;
pub mod ollama_service;
pub mod open_ai_service;
pub(crate) mod stream_pump;

use std::time::Duration;

use crate::error_handler::{AiLlmError, HttpError, Result, make_snippet};

/// Default capacity of an [`crate::OutputStream`] channel.
pub const DEFAULT_STREAM_BUFFER: usize = 32;

/// Builds a reusable HTTP client; `timeout_secs = None` means no timeout.
pub(crate) fn build_client(timeout_secs: Option<u64>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    Ok(builder.build()?)
}

/// Turns a non-2xx response into [`AiLlmError::HttpStatus`].
pub(crate) async fn ensure_success(
    resp: reqwest::Response,
    url: &str,
) -> Result<reqwest::Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    Err(AiLlmError::HttpStatus(HttpError {
        status,
        url: url.to_string(),
        snippet: make_snippet(&text),
    }))
}
