//! Answer cleanup for buffered (non-streamed) generations.

use regex::Regex;

use crate::error::ContextorError;

/// Collapses long hyphen runs and trims surrounding whitespace.
#[derive(Debug, Clone)]
pub struct AnswerCleaner {
    runs: Regex,
    replacement: String,
}

impl AnswerCleaner {
    /// Runs of `limit` or more hyphens become exactly `limit` hyphens.
    ///
    /// # Errors
    /// [`ContextorError::Config`] if `limit` is zero.
    pub fn new(limit: usize) -> Result<Self, ContextorError> {
        if limit == 0 {
            return Err(ContextorError::Config("hyphen run limit must be > 0".into()));
        }
        let runs = Regex::new(&format!("-{{{limit},}}"))
            .map_err(|e| ContextorError::Config(format!("hyphen pattern: {e}")))?;
        Ok(Self {
            runs,
            replacement: "-".repeat(limit),
        })
    }

    pub fn clean(&self, text: &str) -> String {
        self.runs
            .replace_all(text, regex::NoExpand(&self.replacement))
            .trim()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifteen_hyphens_become_ten() {
        let c = AnswerCleaner::new(10).expect("cleaner");
        let input = format!("Header\n{}\nBody", "-".repeat(15));
        assert_eq!(c.clean(&input), format!("Header\n{}\nBody", "-".repeat(10)));
    }

    #[test]
    fn shorter_runs_are_untouched() {
        let c = AnswerCleaner::new(10).expect("cleaner");
        assert_eq!(c.clean("a --- b ---------"), "a --- b ---------");
    }

    #[test]
    fn every_long_run_is_collapsed_and_text_trimmed() {
        let c = AnswerCleaner::new(3).expect("cleaner");
        assert_eq!(c.clean("  x------y-----z \n"), "x---y---z");
    }

    #[test]
    fn zero_limit_is_rejected() {
        assert!(AnswerCleaner::new(0).is_err());
    }
}
