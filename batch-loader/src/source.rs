//! Dataset fetch from S3 or the local filesystem.

use std::time::Instant;

use object_store::{ObjectStore, aws::AmazonS3Builder, path::Path as ObjectPath};
use tracing::info;

use crate::{config::DataSource, errors::LoaderError};

/// Downloads the whole dataset into memory.
///
/// # Errors
/// Object store and filesystem errors.
pub async fn fetch_dataset(source: &DataSource) -> Result<Vec<u8>, LoaderError> {
    match source {
        DataSource::S3 {
            bucket,
            key,
            region,
        } => {
            let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
            if let Some(region) = region {
                builder = builder.with_region(region);
            }
            let store = builder.build()?;
            fetch_object(&store, key).await
        }
        DataSource::Local(path) => {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|source| LoaderError::Io {
                    path: path.clone(),
                    source,
                })?;
            info!(path = %path.display(), bytes = bytes.len(), "dataset read");
            Ok(bytes)
        }
    }
}

/// Reads `key` from any object store.
pub async fn fetch_object(store: &dyn ObjectStore, key: &str) -> Result<Vec<u8>, LoaderError> {
    let started = Instant::now();
    let location = ObjectPath::from(key);
    let bytes = store.get(&location).await?.bytes().await?;
    info!(
        %key,
        bytes = bytes.len(),
        latency_ms = started.elapsed().as_millis() as u64,
        "dataset downloaded"
    );
    Ok(bytes.to_vec())
}
