//! Tolerant NDJSON reader for dataset files.
//!
//! Every non-blank line must be a JSON object with a non-blank string `text`.
//! Anything else is skipped with a `warn!` and counted; it never fails the read.

use std::path::Path;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::errors::RagError;
use crate::record::{Document, UNKNOWN};

/// Result of parsing one dataset.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ParsedDataset {
    pub documents: Vec<Document>,
    /// Non-blank lines that did not yield a document.
    pub skipped: usize,
}

/// Parses NDJSON bytes into documents.
///
/// Invalid UTF-8 is replaced rather than rejected, so one bad byte only
/// costs the line it sits on.
pub fn parse_ndjson(bytes: &[u8]) -> ParsedDataset {
    let text = String::from_utf8_lossy(bytes);
    let mut out = ParsedDataset::default();

    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(obj)) => match document_from(obj) {
                Some(doc) => out.documents.push(doc),
                None => {
                    warn!(line = i + 1, "skipping record without a string `text`");
                    out.skipped += 1;
                }
            },
            Ok(_) => {
                warn!(line = i + 1, "skipping non-object JSON line");
                out.skipped += 1;
            }
            Err(e) => {
                warn!(line = i + 1, error = %e, "skipping malformed JSON line");
                out.skipped += 1;
            }
        }
    }

    debug!(
        documents = out.documents.len(),
        skipped = out.skipped,
        "parsed NDJSON dataset"
    );
    out
}

/// Reads and parses a local NDJSON file.
///
/// # Errors
/// [`RagError::Io`] if the file cannot be read.
pub async fn read_ndjson_file(path: impl AsRef<Path>) -> Result<ParsedDataset, RagError> {
    info!("Reading NDJSON dataset: {:?}", path.as_ref());
    let bytes = tokio::fs::read(path.as_ref()).await?;
    Ok(parse_ndjson(&bytes))
}

fn document_from(mut obj: Map<String, Value>) -> Option<Document> {
    let text = match obj.remove("text") {
        Some(Value::String(s)) if !s.trim().is_empty() => s,
        _ => return None,
    };
    let category = take_label(&mut obj, "category");
    let source = take_label(&mut obj, "source");
    Some(Document {
        text,
        category,
        source,
        extra: obj,
    })
}

/// String label or `"unknown"`; non-string values are dropped.
fn take_label(obj: &mut Map<String, Value>, key: &str) -> String {
    match obj.remove(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => s,
        _ => UNKNOWN.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_lines_are_skipped_and_counted() {
        let data = br#"{"text":"Quantum computing uses qubits","category":"science","source":"wiki"}
not json at all
{"category":"no text here"}

{"text":"Rust is a systems language"}
[1,2,3]
{"text":42}
"#;
        let parsed = parse_ndjson(data);
        assert_eq!(parsed.documents.len(), 2);
        assert_eq!(parsed.skipped, 4);
    }

    #[test]
    fn missing_labels_default_to_unknown() {
        let parsed = parse_ndjson(br#"{"text":"hello","lang":"en"}"#);
        let doc = &parsed.documents[0];
        assert_eq!(doc.category, "unknown");
        assert_eq!(doc.source, "unknown");
        assert_eq!(doc.extra.get("lang"), Some(&Value::String("en".into())));
    }

    #[test]
    fn crlf_and_trailing_line_without_newline() {
        let parsed = parse_ndjson(b"{\"text\":\"a\"}\r\n{\"text\":\"b\"}");
        let texts: Vec<_> = parsed.documents.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b"]);
        assert_eq!(parsed.skipped, 0);
    }

    #[tokio::test]
    async fn reads_local_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data.jsonl");
        tokio::fs::write(&path, "{\"text\":\"x\",\"category\":\"c\"}\nbroken\n")
            .await
            .expect("write");

        let parsed = read_ndjson_file(&path).await.expect("read");
        assert_eq!(parsed.documents.len(), 1);
        assert_eq!(parsed.documents[0].category, "c");
        assert_eq!(parsed.skipped, 1);
    }
}
