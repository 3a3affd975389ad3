use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;

mod client;
mod render;
mod samples;

use client::ApiClient;
use samples::{SAMPLE_QUERIES, sample};

#[derive(Parser, Debug)]
#[command(
    name = "rag-client",
    about = "Compare vector search, plain LLM and RAG answers for the same query"
)]
struct Cli {
    /// Query service base URL
    #[arg(long, env = "RAG_API_URL", default_value = "http://localhost:8000", global = true)]
    base_url: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30, global = true)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send one query to /retrieve, /generate and /rag and print the answers side by side
    Compare {
        /// Free-form query; omit when using --sample
        query: Option<String>,

        /// Use built-in sample query N (see `samples`)
        #[arg(long, conflicts_with = "query")]
        sample: Option<usize>,
    },
    /// List the built-in sample queries
    Samples,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Samples => {
            for (i, q) in SAMPLE_QUERIES.iter().enumerate() {
                println!("{:>2}. {q}", i + 1);
            }
        }
        Command::Compare { query, sample: n } => {
            let query = match (query, n) {
                (Some(q), _) if !q.trim().is_empty() => q,
                (_, Some(n)) => match sample(n) {
                    Some(q) => q.to_string(),
                    None => bail!("no sample query #{n}; run `rag-client samples`"),
                },
                _ => bail!("please enter a query (or pass --sample N)"),
            };

            let client = ApiClient::new(&cli.base_url, Duration::from_secs(cli.timeout_secs))
                .context("failed to build HTTP client")?;
            println!("{}", format!("Querying {} ...", cli.base_url).dimmed());
            let cmp = client.compare(&query).await;
            render::print_comparison(&cmp);
        }
    }
    Ok(())
}
