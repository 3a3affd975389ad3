//! Prompt builders for plain and context-augmented generation.

use rag_store::RetrievalHit;

/// Plain prompt: system prompt, the user turn, and an open assistant turn.
///
/// # Example
/// ```
/// use contextor::prompt::build_generate_prompt;
/// let p = build_generate_prompt("Be brief.", "What is Rust?");
/// assert_eq!(p, "Be brief.\n\nUser: What is Rust?\n\nAssistant:");
/// ```
pub fn build_generate_prompt(system_prompt: &str, query: &str) -> String {
    format!("{system_prompt}\n\nUser: {query}\n\nAssistant:")
}

/// Each hit as `Source: <source>\n<text>`, hits separated by a blank line.
///
/// Returns an empty string when there are no hits.
pub fn build_context_block(hits: &[RetrievalHit]) -> String {
    hits.iter()
        .map(|h| format!("Source: {}\n{}", h.source, h.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Context-augmented prompt.
///
/// The model is told to answer from the context and to say plainly when the
/// context is not enough.
pub fn build_rag_prompt(system_prompt: &str, context_block: &str, query: &str) -> String {
    format!(
        "{system_prompt}\n\n\
         Answer the user's question using the context below. \
         If the context does not contain enough information to answer, say so plainly.\n\n\
         Context:\n{context_block}\n\n\
         User: {query}\n\n\
         Assistant:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(text: &str, source: &str) -> RetrievalHit {
        RetrievalHit {
            text: text.into(),
            source: source.into(),
            score: 0.5,
        }
    }

    #[test]
    fn context_block_layout() {
        let block = build_context_block(&[hit("alpha", "a.txt"), hit("beta", "b.txt")]);
        assert_eq!(block, "Source: a.txt\nalpha\n\nSource: b.txt\nbeta");
        assert_eq!(build_context_block(&[]), "");
    }

    #[test]
    fn rag_prompt_orders_sections() {
        let p = build_rag_prompt("SYS", "Source: s\nctx", "why?");
        let sys = p.find("SYS").expect("system");
        let ctx = p.find("Context:\nSource: s\nctx").expect("context");
        let user = p.find("User: why?").expect("user");
        assert!(sys < ctx && ctx < user);
        assert!(p.contains("say so plainly"));
        assert!(p.ends_with("Assistant:"));
    }
}
