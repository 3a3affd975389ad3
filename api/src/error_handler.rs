use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use contextor::{CLIENT_CLOSED_STATUS, ContextorError};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Public application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Boot / config ---
    #[error("configuration error: {0}")]
    Config(String),

    // --- IO / network / server ---
    #[error("failed to bind listener on {addr}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error")]
    Server(#[source] std::io::Error),

    // --- Request handling ---
    #[error("{0}")]
    BadRequest(String),

    #[error("client closed request")]
    ClientClosed,

    /// A dependency (vector store, embedder, engine) failed.
    #[error("{message}")]
    Upstream { code: &'static str, message: String },

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::ClientClosed => {
                StatusCode::from_u16(CLIENT_CLOSED_STATUS).unwrap_or(StatusCode::BAD_REQUEST)
            }
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Upstream { .. }
            | AppError::Internal(_)
            | AppError::Config(_)
            | AppError::Bind { .. }
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Bind { .. } => "BIND_ERROR",
            AppError::Server(_) => "SERVER_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::ClientClosed => "CLIENT_CLOSED_REQUEST",
            AppError::Upstream { code, .. } => code,
            AppError::Unavailable(_) => "SERVICE_UNAVAILABLE",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(code = self.error_code(), error = %self, "request failed");
        }
        let body = ErrorBody {
            error: self.to_string(),
            code: self.error_code(),
        };
        (status, Json(body)).into_response()
    }
}

/// Handy result alias used across handlers.
pub type AppResult<T> = Result<T, AppError>;

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(err: axum::extract::rejection::JsonRejection) -> Self {
        AppError::BadRequest(err.body_text())
    }
}

impl From<ContextorError> for AppError {
    fn from(err: ContextorError) -> Self {
        match err {
            ContextorError::InvalidRequest(msg) => AppError::BadRequest(msg),
            ContextorError::ClientClosed => AppError::ClientClosed,
            ContextorError::Rag(e) => AppError::Upstream {
                code: "RETRIEVAL_FAILED",
                message: format!("Search failed: {e}"),
            },
            ContextorError::Generation(e) => AppError::Upstream {
                code: "GENERATION_FAILED",
                message: format!("Generation failed: {e}"),
            },
            ContextorError::Config(msg) => AppError::Config(msg),
            ContextorError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<rag_store::RagError> for AppError {
    fn from(err: rag_store::RagError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<ai_llm_service::AiLlmError> for AppError {
    fn from(err: ai_llm_service::AiLlmError) -> Self {
        AppError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_closed_maps_to_499() {
        let err = AppError::from(ContextorError::ClientClosed);
        assert_eq!(err.status_code().as_u16(), 499);
        assert_eq!(err.error_code(), "CLIENT_CLOSED_REQUEST");
    }

    #[test]
    fn validation_and_upstream_statuses() {
        let bad = AppError::from(ContextorError::InvalidRequest("query must not be empty".into()));
        assert_eq!(bad.status_code(), StatusCode::BAD_REQUEST);

        let upstream = AppError::from(ContextorError::Rag(rag_store::RagError::Qdrant(
            "connection refused".into(),
        )));
        assert_eq!(upstream.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(upstream.to_string().starts_with("Search failed"));
    }
}
