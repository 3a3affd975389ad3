//! Runtime configuration loaded from environment variables.

use std::str::FromStr;

use ai_llm_service::error_handler::env_opt_string;

use crate::error::ContextorError;

/// System prompt used when a request does not carry one.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

/// Config bag for the query service. All fields have defaults.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContextorConfig {
    pub default_system_prompt: String,
    /// Runs of at least this many hyphens are collapsed to exactly this many.
    pub hyphen_run_limit: usize,
    pub default_top_k: u64,
    pub max_top_k: u64,
    /// Capacity of the fragment channel of a streamed answer.
    pub stream_buffer: usize,
}

impl Default for ContextorConfig {
    fn default() -> Self {
        Self {
            default_system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            hyphen_run_limit: 10,
            default_top_k: 3,
            max_top_k: 50,
            stream_buffer: 32,
        }
    }
}

impl ContextorConfig {
    /// Build from `DEFAULT_SYSTEM_PROMPT`, `HYPHEN_RUN_LIMIT`,
    /// `RAG_DEFAULT_TOP_K`, `RAG_MAX_TOP_K` and `STREAM_BUFFER`.
    ///
    /// # Errors
    /// [`ContextorError::Config`] for unparsable or out-of-range values.
    pub fn from_env() -> Result<Self, ContextorError> {
        let d = Self::default();
        let cfg = Self {
            default_system_prompt: env_opt_string("DEFAULT_SYSTEM_PROMPT")
                .unwrap_or(d.default_system_prompt),
            hyphen_run_limit: parse("HYPHEN_RUN_LIMIT", d.hyphen_run_limit)?,
            default_top_k: parse("RAG_DEFAULT_TOP_K", d.default_top_k)?,
            max_top_k: parse("RAG_MAX_TOP_K", d.max_top_k)?,
            stream_buffer: parse("STREAM_BUFFER", d.stream_buffer)?,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ContextorError> {
        if self.hyphen_run_limit == 0 {
            return Err(ContextorError::Config("HYPHEN_RUN_LIMIT must be > 0".into()));
        }
        if self.default_top_k == 0 || self.default_top_k > self.max_top_k {
            return Err(ContextorError::Config(
                "RAG_DEFAULT_TOP_K must be within 1..=RAG_MAX_TOP_K".into(),
            ));
        }
        if self.stream_buffer == 0 {
            return Err(ContextorError::Config("STREAM_BUFFER must be > 0".into()));
        }
        Ok(())
    }
}

fn parse<T: FromStr>(var: &str, default: T) -> Result<T, ContextorError> {
    match env_opt_string(var) {
        Some(v) => v
            .parse()
            .map_err(|_| ContextorError::Config(format!("{var} has an invalid value `{v}`"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = ContextorConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.hyphen_run_limit, 10);
        assert_eq!(cfg.default_system_prompt, "You are a helpful AI assistant.");
    }

    #[test]
    fn default_top_k_above_max_is_rejected() {
        let cfg = ContextorConfig {
            default_top_k: 60,
            ..ContextorConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
