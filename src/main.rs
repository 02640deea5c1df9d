use axum::routing::{get, post};
use axum::Router;
use tracing_subscriber::EnvFilter;

use verse_search::api;
use verse_search::config::Config;
use verse_search::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!("Data directory: {}", config.data_dir.display());
    tracing::info!("LLM endpoint: {}", config.llm.base_url);

    let state = AppState::new(config.clone())?;
    let registry = state.registry.clone();

    let app = Router::new()
        .route("/", get(api::health))
        .route("/api/search", post(api::search::search))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    registry.clear();
    tracing::info!("Encoder cache cleared, shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install shutdown handler: {e}");
    }
}
