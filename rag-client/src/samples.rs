/// Built-in queries that exercise the demo knowledge base.
pub const SAMPLE_QUERIES: [&str; 8] = [
    "smartwatch battery life",
    "noise cancellation headphones",
    "cameras for low light photography",
    "smartphones with best cameras",
    "gaming consoles with best graphics",
    "smart home security cameras",
    "lightweight laptops with long battery life",
    "waterproof portable speakers",
];

/// 1-based lookup, as shown by `rag-client samples`.
pub fn sample(n: usize) -> Option<&'static str> {
    n.checked_sub(1).and_then(|i| SAMPLE_QUERIES.get(i)).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_one_based() {
        assert_eq!(sample(1), Some("smartwatch battery life"));
        assert_eq!(sample(8), Some("waterproof portable speakers"));
        assert_eq!(sample(0), None);
        assert_eq!(sample(9), None);
    }
}
