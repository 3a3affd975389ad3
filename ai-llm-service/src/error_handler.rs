//! Unified error handling for `ai-llm-service`.
//!
//! This module exposes a single top-level error type [`AiLlmError`] for the whole
//! library, with configuration problems grouped in [`ConfigError`]. Small helpers
//! for reading/validating environment variables return the unified [`Result<T>`].
//!
//! All messages include the prefix `[AI LLM Service]` to simplify attribution in logs.

use reqwest::StatusCode;
use thiserror::Error;

/* ------------------------------------------------------------------------- */
/* Public result alias                                                       */
/* ------------------------------------------------------------------------- */

/// Unified result alias for the entire crate.
pub type Result<T> = std::result::Result<T, AiLlmError>;

/* ------------------------------------------------------------------------- */
/* Top-level error                                                           */
/* ------------------------------------------------------------------------- */

/// Top-level error for the `ai-llm-service` crate.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AiLlmError {
    /// Configuration/validation errors (startup or request parameters).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Underlying HTTP transport error.
    #[error("[AI LLM Service] transport error: {0}")]
    HttpTransport(#[from] reqwest::Error),

    /// Upstream answered with a non-2xx status.
    #[error("[AI LLM Service] {0}")]
    HttpStatus(HttpError),

    /// Upstream payload could not be decoded.
    #[error("[AI LLM Service] decode error: {0}")]
    Decode(String),

    /// Upstream reported an error inside an otherwise successful stream.
    #[error("[AI LLM Service] engine error: {0}")]
    Engine(String),

    /// A generation with this request id is already in flight.
    #[error("[AI LLM Service] request id already in flight: {0}")]
    DuplicateRequest(String),

    /// The request was aborted before the upstream answered.
    #[error("[AI LLM Service] request aborted: {0}")]
    Aborted(String),
}

/// Details of a non-successful HTTP response.
#[derive(Debug)]
pub struct HttpError {
    /// Numeric HTTP status code.
    pub status: StatusCode,
    /// Request URL.
    pub url: String,
    /// Short snippet of the response body (trimmed).
    pub snippet: String,
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP {} from {}: {}", self.status, self.url, self.snippet)
    }
}

/* ------------------------------------------------------------------------- */
/* Config errors                                                             */
/* ------------------------------------------------------------------------- */

/// Errors for environment/config-driven setup and parameter validation.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable is missing or empty.
    #[error("[AI LLM Service] missing required environment variable: {0}")]
    MissingVar(&'static str),

    /// A number failed to parse (ports, limits, timeouts).
    #[error("[AI LLM Service] invalid number in {var}: {reason}")]
    InvalidNumber {
        /// Variable name (e.g., `LLM_TIMEOUT_SECS`).
        var: &'static str,
        /// Human-readable reason (e.g., `expected u64`).
        reason: &'static str,
    },

    /// Unsupported provider in `LLM_KIND` / `EMBEDDING_KIND`.
    #[error("[AI LLM Service] unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// Value had the wrong format (e.g., invalid URL).
    #[error("[AI LLM Service] invalid format in {var}: {reason}")]
    InvalidFormat {
        /// Variable name (e.g., `LLM_URL`).
        var: &'static str,
        /// Explanation (e.g., `must start with http:// or https://`).
        reason: &'static str,
    },

    /// A numeric field was outside of the allowed range.
    #[error("[AI LLM Service] {field} is out of range: {detail}")]
    OutOfRange {
        /// Field name (e.g., `temperature`).
        field: &'static str,
        /// Description of the expected range.
        detail: &'static str,
    },

    /// Stop sequences contained one or more empty strings.
    #[error("[AI LLM Service] stop sequences must not contain empty strings")]
    InvalidStopSequence,
}

/* ------------------------------------------------------------------------- */
/* Env helpers                                                               */
/* ------------------------------------------------------------------------- */

/// Fetches a required, non-empty environment variable.
///
/// # Errors
/// Returns [`ConfigError::MissingVar`] if the variable is absent or empty.
pub fn must_env(name: &'static str) -> Result<String> {
    env_opt_string(name).ok_or_else(|| ConfigError::MissingVar(name).into())
}

/// Reads an optional, trimmed, non-empty environment variable.
pub fn env_opt_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parses an optional `u64` from env (`Ok(None)` if unset/empty).
///
/// # Errors
/// Returns [`ConfigError::InvalidNumber`] if set but not a valid `u64`.
pub fn env_opt_u64(name: &'static str) -> Result<Option<u64>> {
    match env_opt_string(name) {
        Some(v) => v.parse::<u64>().map(Some).map_err(|_| {
            AiLlmError::from(ConfigError::InvalidNumber {
                var: name,
                reason: "expected u64",
            })
        }),
        None => Ok(None),
    }
}

/* ------------------------------------------------------------------------- */
/* Validation helpers                                                        */
/* ------------------------------------------------------------------------- */

/// Validates that an HTTP endpoint starts with `http://` or `https://`.
///
/// # Errors
/// Returns [`ConfigError::InvalidFormat`] otherwise.
pub fn validate_http_endpoint(var: &'static str, value: &str) -> Result<()> {
    let value = value.trim();
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidFormat {
            var,
            reason: "must start with http:// or https://",
        }
        .into())
    }
}

/// Validates that a floating-point value lies within an inclusive range.
///
/// # Errors
/// Returns [`ConfigError::OutOfRange`] if `value` is outside `[min, max]` or not finite.
pub fn validate_range_f32(field: &'static str, value: f32, min: f32, max: f32) -> Result<()> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            detail: "expected value in inclusive range",
        }
        .into())
    }
}

/// Ensures that a list of stop sequences contains no empty strings.
///
/// # Errors
/// Returns [`ConfigError::InvalidStopSequence`] if any element is empty.
pub fn validate_stop_sequences<S>(stops: &[S]) -> Result<()>
where
    S: AsRef<str>,
{
    if stops.iter().any(|s| s.as_ref().is_empty()) {
        Err(ConfigError::InvalidStopSequence.into())
    } else {
        Ok(())
    }
}

/// Trims a response body to a short single-line snippet for logs and errors.
pub fn make_snippet(body: &str) -> String {
    body.trim()
        .chars()
        .take(240)
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_scheme_is_checked() {
        assert!(validate_http_endpoint("LLM_URL", "http://vllm:8000").is_ok());
        assert!(validate_http_endpoint("LLM_URL", " https://x ").is_ok());
        assert!(validate_http_endpoint("LLM_URL", "vllm:8000").is_err());
    }

    #[test]
    fn snippet_is_bounded_and_single_line() {
        let body = format!("line one\nline two {}", "x".repeat(500));
        let s = make_snippet(&body);
        assert_eq!(s.chars().count(), 240);
        assert!(!s.contains('\n'));
    }

    #[test]
    fn empty_stop_sequence_is_rejected() {
        assert!(validate_stop_sequences(&["###", ""]).is_err());
        assert!(validate_stop_sequences::<&str>(&[]).is_ok());
    }

    #[test]
    fn messages_start_with_service_tag() {
        let errs = [
            AiLlmError::Engine("oom".into()),
            AiLlmError::Aborted("req-1".into()),
            ConfigError::MissingVar("LLM_MODEL").into(),
        ];
        for err in errs {
            assert!(err.to_string().starts_with("[AI LLM Service] "), "{err}");
        }
    }
}
