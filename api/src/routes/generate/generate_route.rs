//! POST /generate: plain generation, buffered or streamed.

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::{
    core::{app_state::AppState, http::ndjson::ndjson_response},
    error_handler::AppResult,
    routes::generate::generate_request::GenerateBody,
};

/// Handler: POST /generate
///
/// With `"stream": true` the answer is sent as NDJSON lines `{"text": ...}`.
/// If the client disconnects first, the generation is aborted upstream.
///
/// # Example
/// ```bash
/// curl -N -X POST http://127.0.0.1:8000/generate \
///   -H 'content-type: application/json' \
///   -d '{"query":"What is RAG?","max_tokens":256,"stream":true}'
/// ```
pub async fn generate_route(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerateBody>, JsonRejection>,
) -> AppResult<Response> {
    let Json(body) = payload?;
    let (req, stream) = body.into_request()?;
    debug!(stream, max_tokens = req.sampling.max_tokens, "generate_route: start");

    if stream {
        let rx = state.service.generate_stream(req).await?;
        return Ok(ndjson_response(rx));
    }

    let answer = state.service.generate(req).await?;
    debug!(chars = answer.answer.len(), "generate_route: success");
    Ok(Json(answer).into_response())
}
