//! Per-request sampling parameters.

use serde::{Deserialize, Serialize};

use crate::error_handler::{
    AiLlmError, ConfigError, validate_range_f32, validate_stop_sequences,
};

/// Generation controls sent with every request.
///
/// Field names follow the engine-side vocabulary; the HTTP layer maps its
/// `top_k_sampling` onto [`SamplingParams::top_k`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Sampling temperature, `0.0..=2.0`.
    pub temperature: f32,
    /// Nucleus sampling cutoff, `(0.0, 1.0]`.
    pub top_p: f32,
    /// Top-k sampling; `-1` disables it.
    pub top_k: i32,
    /// Optional stop sequences.
    pub stop: Option<Vec<String>>,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.7,
            top_p: 0.9,
            top_k: 50,
            stop: None,
        }
    }
}

impl SamplingParams {
    /// Checks ranges before anything is sent upstream.
    ///
    /// # Errors
    /// Returns [`ConfigError::OutOfRange`] or [`ConfigError::InvalidStopSequence`].
    pub fn validate(&self) -> Result<(), AiLlmError> {
        if self.max_tokens == 0 {
            return Err(ConfigError::OutOfRange {
                field: "max_tokens",
                detail: "expected at least 1",
            }
            .into());
        }
        validate_range_f32("temperature", self.temperature, 0.0, 2.0)?;
        if !(self.top_p.is_finite() && self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "top_p",
                detail: "expected value in (0.0, 1.0]",
            }
            .into());
        }
        if self.top_k == 0 || self.top_k < -1 {
            return Err(ConfigError::OutOfRange {
                field: "top_k_sampling",
                detail: "expected -1 (disabled) or a positive integer",
            }
            .into());
        }
        if let Some(stop) = &self.stop {
            validate_stop_sequences(stop)?;
        }
        Ok(())
    }

    /// Stop sequences as a slice, empty when unset.
    pub fn stop_sequences(&self) -> &[String] {
        self.stop.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(SamplingParams::default().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_values() {
        let cases = [
            SamplingParams { temperature: 2.5, ..Default::default() },
            SamplingParams { top_p: 0.0, ..Default::default() },
            SamplingParams { max_tokens: 0, ..Default::default() },
            SamplingParams { top_k: 0, ..Default::default() },
            SamplingParams { top_k: -7, ..Default::default() },
            SamplingParams { stop: Some(vec![String::new()]), ..Default::default() },
        ];
        for params in cases {
            assert!(params.validate().is_err(), "{params:?} should be rejected");
        }
    }

    #[test]
    fn disabled_top_k_is_accepted() {
        let params = SamplingParams { top_k: -1, ..Default::default() };
        assert!(params.validate().is_ok());
    }
}
