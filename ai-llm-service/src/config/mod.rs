//! Provider configuration and per-request sampling parameters.

pub mod default_config;
pub mod llm_model_config;
pub mod llm_provider;
pub mod sampling;

pub use llm_model_config::LlmModelConfig;
pub use llm_provider::LlmProvider;
pub use sampling::SamplingParams;
