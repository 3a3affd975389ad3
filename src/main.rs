use ai_llm_service::telemetry;
use anyhow::Context;
use api::AppState;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file when present.
    dotenvy::dotenv().ok();
    telemetry::init("info");

    let state = AppState::from_env().context("failed to build query service")?;
    info!(
        service = %state.service_name,
        model = %state.service.model_name(),
        "query service ready"
    );

    api::start(state).await.context("query service failed")?;
    Ok(())
}
