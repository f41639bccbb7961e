//! Question-answering server binary
//!
//! Run with: cargo run -p converzy-rag --bin converzy-server [config.toml]

use converzy_rag::{config::RagConfig, server::RagServer};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "converzy_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration (file argument, then CONVERZY_CONFIG, then defaults)
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = RagConfig::load(config_path.as_deref())?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Chat model: {} (alternate: {})", config.openai.chat_model, config.gemini.chat_model);
    tracing::info!(
        "  - Embedding model: {} ({} dims)",
        config.openai.embedding_model,
        config.openai.embedding_dimensions
    );
    tracing::info!("  - Quota: free {} / pro {}", config.quota.free_limit, config.quota.pro_limit);
    tracing::info!("  - Retrieval: top {} passages, {} history turns", config.retrieval.top_k, config.retrieval.history_turns);

    // Create and start server
    let server = RagServer::new(config)?;

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nEndpoints:");
    println!("  POST /api/documents/:id/questions  - Ask a question");
    println!("  POST /api/documents/:id/embeddings - Embed document passages");
    println!("  GET  /api/documents/:id/turns      - Conversation history");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
