use std::io::IsTerminal;

use ai_llm_service::telemetry;
use anyhow::Context;
use tracing::error;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // `.env` is optional; the job normally runs with a prepared environment.
    dotenvy::dotenv().ok();
    telemetry::init("info");

    let summary = match batch_loader::load_from_env(std::io::stderr().is_terminal()).await {
        Ok(summary) => summary,
        Err(err) => {
            error!(error = %err, "load aborted");
            return Err(err).context("batch load failed");
        }
    };

    println!(
        "Loaded {} documents ({} malformed lines skipped, {}/{} batches failed). Collection now holds {} points.",
        summary.ingested,
        summary.skipped_lines,
        summary.failed_batches,
        summary.batches,
        summary.points_in_collection
    );
    Ok(())
}
