//! GET /health: upstream probes.

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::core::app_state::AppState;

/// 200 when every upstream answered, 503 otherwise. The body lists each probe.
pub async fn health_route(State(state): State<Arc<AppState>>) -> Response {
    let report = state.service.health().await;
    let status = if report.ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report)).into_response()
}
