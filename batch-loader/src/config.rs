//! Dataset location, resolved from the environment.

use std::path::PathBuf;

use ai_llm_service::error_handler::env_opt_string;

use crate::errors::LoaderError;

/// Where the NDJSON dataset lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataSource {
    /// Object `key` in S3 `bucket`. Credentials come from the standard AWS
    /// environment (`AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, ...).
    S3 {
        bucket: String,
        key: String,
        region: Option<String>,
    },
    /// Local NDJSON file.
    Local(PathBuf),
}

impl DataSource {
    /// Reads `DATA_BUCKET`, `DATA_KEY`, `AWS_REGION`/`AWS_DEFAULT_REGION` and `DATA_PATH`.
    ///
    /// # Errors
    /// [`LoaderError::MissingSource`] when neither location is configured.
    pub fn from_env() -> Result<Self, LoaderError> {
        Self::resolve(env_opt_string)
    }

    /// Resolves the source from `lookup`. S3 wins when both are set.
    pub fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, LoaderError> {
        let bucket = lookup("DATA_BUCKET");
        let key = lookup("DATA_KEY");
        match (bucket, key) {
            (Some(bucket), Some(key)) => {
                let region = lookup("AWS_REGION").or_else(|| lookup("AWS_DEFAULT_REGION"));
                return Ok(Self::S3 {
                    bucket,
                    key,
                    region,
                });
            }
            (Some(_), None) => {
                return Err(LoaderError::IncompleteS3 {
                    set: "DATA_BUCKET",
                    missing: "DATA_KEY",
                });
            }
            (None, Some(_)) => {
                return Err(LoaderError::IncompleteS3 {
                    set: "DATA_KEY",
                    missing: "DATA_BUCKET",
                });
            }
            (None, None) => {}
        }
        lookup("DATA_PATH")
            .map(|p| Self::Local(PathBuf::from(p)))
            .ok_or(LoaderError::MissingSource)
    }

    /// Short human-readable location, e.g. `s3://bucket/key`.
    pub fn describe(&self) -> String {
        match self {
            Self::S3 { bucket, key, .. } => format!("s3://{bucket}/{key}"),
            Self::Local(path) => path.display().to_string(),
        }
    }
}
