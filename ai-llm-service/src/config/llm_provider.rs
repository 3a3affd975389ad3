use std::{fmt, str::FromStr};

use crate::error_handler::ConfigError;

/// Backend used for generation or embeddings.
///
/// `OpenAI` covers any server speaking the OpenAI REST dialect, which is how
/// vLLM is usually deployed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlmProvider {
    /// Local or in-cluster Ollama runtime.
    Ollama,
    /// OpenAI-compatible server (`/v1/completions`, `/v1/embeddings`).
    OpenAI,
}

impl FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" | "vllm" => Ok(Self::OpenAI),
            other => Err(ConfigError::UnsupportedProvider(other.to_string())),
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ollama => f.write_str("ollama"),
            Self::OpenAI => f.write_str("openai"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_kinds() {
        assert_eq!("ollama".parse::<LlmProvider>().ok(), Some(LlmProvider::Ollama));
        assert_eq!(" OpenAI ".parse::<LlmProvider>().ok(), Some(LlmProvider::OpenAI));
        assert_eq!("vllm".parse::<LlmProvider>().ok(), Some(LlmProvider::OpenAI));
    }

    #[test]
    fn rejects_unknown_kind() {
        assert!(matches!(
            "bedrock".parse::<LlmProvider>(),
            Err(ConfigError::UnsupportedProvider(k)) if k == "bedrock"
        ));
    }
}
