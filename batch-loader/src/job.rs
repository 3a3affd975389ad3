//! The load job: fetch → parse → rebuild collection → verify.

use std::sync::Arc;

use ai_llm_service::{
    config::default_config::config_embedding_only_from_env, service_profiles::EmbeddingClient,
};
use rag_store::{
    LlmEmbedder, ParsedDataset, RagConfig, RagStore, batch_progress_bar, parse_ndjson,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::{config::DataSource, errors::LoaderError, source::fetch_dataset};

/// Outcome of one load.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    /// Points written by successful batches.
    pub ingested: u64,
    /// Non-blank lines that were not valid records.
    pub skipped_lines: usize,
    pub batches: usize,
    pub failed_batches: usize,
    /// Point count read back from the collection after the load.
    pub points_in_collection: u64,
}

/// Builds everything from the environment and runs one load.
///
/// The data source is resolved first, so a missing source aborts before
/// any connection is made or any record is processed.
///
/// # Errors
/// Configuration, fetch and collection recreation failures.
pub async fn load_from_env(show_progress: bool) -> Result<LoadSummary, LoaderError> {
    let source = DataSource::from_env()?;
    let rag_cfg = RagConfig::from_env()?;
    let embedding = EmbeddingClient::new(config_embedding_only_from_env()?)?;
    let embedder = Arc::new(LlmEmbedder::new(embedding, rag_cfg.embedding_dim));
    let store = RagStore::connect(rag_cfg, embedder)?;
    run(&store, &source, show_progress).await
}

/// Fetches the dataset and loads it into `store`.
///
/// # Errors
/// Fetch and collection recreation failures.
pub async fn run(
    store: &RagStore,
    source: &DataSource,
    show_progress: bool,
) -> Result<LoadSummary, LoaderError> {
    info!(source = %source.describe(), collection = %store.config().collection, "load started");
    let raw = fetch_dataset(source).await?;
    load_bytes(store, &raw, show_progress).await
}

/// Loads an in-memory NDJSON dataset into `store`.
///
/// # Errors
/// Collection recreation and the final count query.
pub async fn load_bytes(
    store: &RagStore,
    raw: &[u8],
    show_progress: bool,
) -> Result<LoadSummary, LoaderError> {
    let ParsedDataset { documents, skipped } = parse_ndjson(raw);
    info!(records = documents.len(), skipped, "dataset parsed");
    if documents.is_empty() {
        warn!("dataset has no valid records; the collection will be empty");
    }

    let progress = batch_progress_bar(0, show_progress);
    let report = store.rebuild(&documents, &progress).await?;
    let points_in_collection = store.points_count().await?;

    let summary = LoadSummary {
        ingested: report.ingested,
        skipped_lines: skipped,
        batches: report.batches,
        failed_batches: report.failed_batches,
        points_in_collection,
    };
    info!(
        ingested = summary.ingested,
        failed_batches = summary.failed_batches,
        points = summary.points_in_collection,
        "load finished"
    );
    Ok(summary)
}
