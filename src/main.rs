use std::{net::SocketAddr, sync::Arc};
use tracing_subscriber::{fmt, EnvFilter};

use prompt_builder::{
    app,
    completion::GrokClient,
    config::Config,
    routes::{AppState, ensure_default_admin},
    store::MemoryStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = Config::from_env();
    let completion = Arc::new(GrokClient::new(config.completion.clone(), config.generation_timeout));
    let state = AppState::new(config, Arc::new(MemoryStore::new()), completion);
    tracing::info!("ℹ️ Using in-memory storage (data will be lost on restart)");

    ensure_default_admin(&state).await.map_err(|e| anyhow::anyhow!("creating default admin: {e}"))?;

    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "🚀 Starting One-Prompt Builder API server");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
    }
}
