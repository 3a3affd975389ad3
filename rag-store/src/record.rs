//! Core data models used by the library.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Label used when a record has no `category` or `source`.
pub const UNKNOWN: &str = "unknown";

/// One dataset record. Immutable once read.
///
/// Unknown fields are kept in `extra` and stored alongside the payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    #[serde(default = "unknown")]
    pub category: String,
    #[serde(default = "unknown")]
    pub source: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn unknown() -> String {
    UNKNOWN.to_string()
}

impl Document {
    pub fn new(text: impl Into<String>, category: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            category: category.into(),
            source: source.into(),
            extra: Map::new(),
        }
    }
}

/// A document with its vector and deterministic id, ready for upsert.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexedPoint {
    pub id: u64,
    pub vector: Vec<f32>,
    pub document: Document,
}

/// A single retrieval hit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetrievalHit {
    pub text: String,
    pub source: String,
    pub score: f32,
}
