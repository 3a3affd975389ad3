//! Batch loader: reads NDJSON records from S3 (or a local file), embeds them
//! and rebuilds the vector collection.
//!
//! The collection is dropped and recreated on every run, so running the job
//! twice leaves exactly one copy of each record.

mod config;
mod errors;
mod job;
mod source;

pub use config::DataSource;
pub use errors::LoaderError;
pub use job::{LoadSummary, load_bytes, load_from_env, run};
pub use source::{fetch_dataset, fetch_object};
