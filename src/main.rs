use tracing_subscriber::EnvFilter;

use listing_assistant::api;
use listing_assistant::config::Config;
use listing_assistant::search::vector::VectorIndex;
use listing_assistant::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!("Data directory: {}", config.data_dir.display());
    tracing::info!(
        "LLM provider: {} ({}, model {})",
        config.llm.provider,
        config.llm.base_url,
        config.llm.chat_model
    );
    tracing::info!(
        "Embedding provider: {} ({}, model {})",
        config.embedding.provider,
        config.embedding.base_url,
        config.embedding.model
    );

    let state = AppState::new(config.clone())?;
    if state.store.is_empty() {
        tracing::warn!("Vector store is empty; POST listings to /api/documents before chatting");
    }

    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
