//! Identifier helpers.
//!
//! - [`stable_point_id`] derives a vector point id from document text, so the
//!   same text always lands on the same point.
//! - [`new_request_id`] mints a fresh identifier for one generation request.

use uuid::Uuid;

/// Mask that keeps ids inside the non-negative `i64` range.
const NON_NEGATIVE_MASK: u64 = i64::MAX as u64;

/// Deterministic, non-negative point id derived from `text`.
///
/// Hashes the raw UTF-8 bytes with BLAKE3 and keeps the first 8 bytes
/// (little-endian), clearing the sign bit.
pub fn stable_point_id(text: &str) -> u64 {
    let hash = blake3::hash(text.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(head) & NON_NEGATIVE_MASK
}

/// Fresh request identifier, e.g. `req-3f1c9a0e...`.
pub fn new_request_id() -> String {
    format!("req-{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn same_text_same_id() {
        let a = stable_point_id("Quantum computing uses quantum phenomena");
        let b = stable_point_id("Quantum computing uses quantum phenomena");
        assert_eq!(a, b);
    }

    #[test]
    fn ids_are_non_negative_as_i64() {
        for text in ["", "a", "hello world", "ünïcödé", "\n\n"] {
            let id = stable_point_id(text);
            assert!(i64::try_from(id).is_ok(), "id {id} overflows i64");
        }
    }

    #[test]
    fn distinct_texts_get_distinct_ids() {
        let ids: HashSet<u64> = (0..10_000)
            .map(|i| stable_point_id(&format!("record number {i}")))
            .collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn request_ids_are_unique() {
        let a = new_request_id();
        let b = new_request_id();
        assert!(a.starts_with("req-"));
        assert_ne!(a, b);
    }
}
