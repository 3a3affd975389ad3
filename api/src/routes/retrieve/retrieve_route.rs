//! POST /retrieve: top-K documents for a query, no generation.

use std::sync::Arc;

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use contextor::RetrieveAnswer;
use tracing::debug;

use crate::{
    core::app_state::AppState,
    error_handler::{AppError, AppResult},
    routes::retrieve::retrieve_request::RetrieveBody,
};

/// Handler: POST /retrieve
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:8000/retrieve \
///   -H 'content-type: application/json' \
///   -d '{"query":"quantum computing","top_k":3}'
/// ```
pub async fn retrieve_route(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RetrieveBody>, JsonRejection>,
) -> AppResult<Json<RetrieveAnswer>> {
    let Json(body) = payload?;
    let query = body
        .query
        .ok_or_else(|| AppError::BadRequest("query is required".into()))?;

    debug!(top_k = ?body.top_k, "retrieve_route: start");
    let answer = state.service.retrieve(&query, body.top_k).await?;
    debug!(hits = answer.results.len(), "retrieve_route: success");

    Ok(Json(answer))
}
