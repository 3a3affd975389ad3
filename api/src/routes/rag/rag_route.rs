//! POST /rag: retrieval-augmented generation.

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
    routes::rag::rag_request::RagBody,
};

/// Handler: POST /rag
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:8000/rag \
///   -H 'content-type: application/json' \
///   -d '{"query":"best laptop for travel","top_k":3,"include_context":true}'
/// ```
pub async fn rag_route(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RagBody>, JsonRejection>,
) -> AppResult<Response> {
    let Json(body) = payload?;
    let (req, stream) = body.into_request()?;
    debug!(stream, top_k = ?req.top_k, include_context = req.include_context, "rag_route: start");

    if stream {
        let rx = state.service.rag_stream(req).await?;
        return Ok(ndjson_response(rx));
    }

    let answer = state.service.rag(req).await?;
    debug!(context_count = answer.context_count, "rag_route: success");
    Ok(Json(answer).into_response())
}
