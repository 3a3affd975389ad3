//! Terminal rendering of a [`Comparison`].

use colored::Colorize;

use crate::client::{CallError, Comparison, Hit};

const PREVIEW_CHARS: usize = 100;

/// First `max` characters of `text`, with `...` when cut.
pub fn preview(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

pub fn print_comparison(cmp: &Comparison) {
    println!("{} {}", "Query:".bold(), cmp.query);

    section("Vector DB Results");
    match &cmp.retrieve {
        Ok(r) if r.results.is_empty() => println!("  no documents found"),
        Ok(r) => print_hits(&r.results, Some(PREVIEW_CHARS)),
        Err(err) => print_error(err),
    }

    section("LLM Response (No Context)");
    match &cmp.generate {
        Ok(g) => {
            println!("  {} {}", "Model:".bold(), g.model);
            println!("{}", indent(&g.answer));
        }
        Err(err) => print_error(err),
    }

    section("RAG-Enhanced Response");
    match &cmp.rag {
        Ok(r) => {
            println!("  {} {}", "Model:".bold(), r.model);
            println!("  {}", format!("Used {} context documents", r.context_count).italic());
            println!("{}", indent(&r.answer));
            if !r.contexts.is_empty() {
                println!("\n  {}", "Context documents:".bold());
                print_hits(&r.contexts, None);
            }
        }
        Err(err) => print_error(err),
    }

    print_status(cmp.failed_calls(), cmp.elapsed.as_secs_f64());
}

fn section(title: &str) {
    println!("\n{}", title.cyan().bold());
}

fn print_hits(hits: &[Hit], limit: Option<usize>) {
    for (i, hit) in hits.iter().enumerate() {
        println!(
            "  {}. {} (score {})",
            i + 1,
            hit.source.green(),
            format!("{:.4}", hit.score).yellow()
        );
        let text = match limit {
            Some(n) => preview(&hit.text, n),
            None => hit.text.clone(),
        };
        println!("     {text}");
    }
}

fn print_error(err: &CallError) {
    println!("  {} {}", "Error:".red().bold(), err);
    if let CallError::Api { body, .. } = err {
        if !body.is_empty() {
            println!("  {}", body.dimmed());
        }
    }
}

fn print_status(failed: usize, secs: f64) {
    let line = format!("Query completed in {secs:.2} seconds");
    if failed > 0 {
        println!("\n{} ({failed} endpoint(s) failed)", line.yellow());
    } else {
        println!("\n{}", line.green());
    }
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|l| format!("  {l}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_cuts_on_char_boundaries() {
        assert_eq!(preview("short", 100), "short");
        assert_eq!(preview("héllo wörld", 5), "héllo...");
        let long = "x".repeat(150);
        assert_eq!(preview(&long, 100).len(), 103);
    }
}
