use anyhow::Context;
use relay_server::{app, LlmService, RelayConfig};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    dotenv::dotenv().ok();

    let config = RelayConfig::from_env()?;
    if config.has_api_key() {
        info!("API key loaded successfully");
    } else {
        // Not fatal: the upstream will reject the empty bearer token.
        warn!("API_KEY not found. Requests will fail upstream authentication");
    }
    info!("Using model: {}", config.params.model);

    let llm_service = Arc::new(
        LlmService::new(&config).context("failed to build upstream HTTP client")?,
    );
    let app = app(llm_service);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("Relay server listening on {}", addr);
    info!("API endpoints:");
    info!("   - POST /api/chat - Chat with the bot");
    info!("   - GET /api/health - Health check");
    info!("Frontend should connect to: http://localhost:{}", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
