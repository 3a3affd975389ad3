//! GET /: service metadata.

use std::sync::Arc;

use axum::{Json, extract::State};
use serde::Serialize;

use crate::core::app_state::AppState;

#[derive(Debug, Serialize)]
pub struct EndpointInfo {
    pub path: &'static str,
    pub method: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub name: String,
    pub description: &'static str,
    pub endpoints: Vec<EndpointInfo>,
    pub version: &'static str,
}

const ENDPOINTS: [(&str, &str, &str); 3] = [
    ("/retrieve", "POST", "Retrieve relevant documents from the knowledge base"),
    ("/generate", "POST", "Generate text with the LLM (no retrieval)"),
    ("/rag", "POST", "Retrieval-augmented generation"),
];

pub async fn root_route(State(state): State<Arc<AppState>>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: state.service_name.clone(),
        description: "Retrieval-augmented generation over a Qdrant knowledge base",
        endpoints: ENDPOINTS
            .iter()
            .map(|&(path, method, description)| EndpointInfo {
                path,
                method,
                description,
            })
            .collect(),
        version: env!("CARGO_PKG_VERSION"),
    })
}
