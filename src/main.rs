use anyhow::Context;
use tracing::{Level, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional; real environment variables take precedence.
    let dotenv = dotenvy::dotenv();

    ai_llm_service::telemetry::init("info", Level::INFO)
        .context("failed to install the tracing subscriber")?;

    match dotenv {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => warn!("no .env file found; using the process environment"),
        Err(e) => return Err(e).context("failed to read .env"),
    }

    api::start().await.context("server failed")?;

    Ok(())
}
