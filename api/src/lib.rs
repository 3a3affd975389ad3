//! HTTP surface of the query service.
//!
//! Routes: `GET /`, `GET /health`, `POST /retrieve`, `POST /generate`, `POST /rag`.

use std::sync::Arc;

pub mod core;
pub mod error_handler;
pub mod middleware_layer;
mod routes;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tokio::signal;
use tracing::{info, warn};

use ai_llm_service::error_handler::env_opt_string;

pub use crate::core::app_state::AppState;
pub use crate::error_handler::{AppError, AppResult};
use crate::{
    middleware_layer::request_id::request_id,
    routes::{
        generate::generate_route::generate_route, health_route::health_route,
        rag::rag_route::rag_route, retrieve::retrieve_route::retrieve_route,
        root_route::root_route,
    },
};

/// Listen address used when `API_ADDRESS` is unset.
pub const DEFAULT_API_ADDRESS: &str = "0.0.0.0:8000";

/// Builds the router with all routes and the request-id layer.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_route))
        .route("/health", get(health_route))
        .route("/retrieve", post(retrieve_route))
        .route("/generate", post(generate_route))
        .route("/rag", post(rag_route))
        .layer(middleware::from_fn(request_id))
        .with_state(Arc::new(state))
}

/// Binds `API_ADDRESS` and serves until Ctrl+C / SIGTERM.
pub async fn start(state: AppState) -> AppResult<()> {
    let addr = env_opt_string("API_ADDRESS").unwrap_or_else(|| DEFAULT_API_ADDRESS.into());
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| AppError::Bind {
            addr: addr.clone(),
            source,
        })?;
    info!(%addr, "query service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)?;

    info!("query service stopped");
    Ok(())
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
