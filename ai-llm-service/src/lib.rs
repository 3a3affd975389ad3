//! Shared LLM layer for the RAG backend.
//!
//! - [`engine`] defines the [`engine::GenerationEngine`] seam: streamed
//!   generation keyed by a request id, plus `abort(request_id)`.
//! - [`services`] holds the concrete providers (Ollama, OpenAI-compatible such as vLLM).
//! - [`service_profiles`] wires one generation engine and one embedding client,
//!   constructed once at startup and shared through an `Arc`.
//! - [`health_service`] probes provider endpoints for `/health`.
//! - [`telemetry`] installs the shared `tracing` subscriber for binaries.

pub mod config;
pub mod engine;
pub mod error_handler;
pub mod health_service;
pub mod service_profiles;
pub mod services;
pub mod telemetry;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use config::{LlmModelConfig, LlmProvider, SamplingParams};
pub use engine::{GenerationEngine, GenerationOutput, OutputStream};
pub use error_handler::{AiLlmError, ConfigError};
