use std::sync::Arc;

use sibyl_core::LoggingSettings;
use sibyl_index::{DocumentStore, HttpEmbeddingClient, SearchParams, paths::resolve_db_path};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sibyl_gateway::pipeline::RagPipeline;
use sibyl_gateway::providers::OpenAiCompatibleClient;
use sibyl_gateway::server;
use sibyl_gateway::session::SessionStore;
use sibyl_gateway::state::AppState;

fn init_tracing(logging: &LoggingSettings) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer());

    if logging.file_enabled
        && let Some(path) = &logging.file_path
    {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Arc::new(file)),
            )
            .init();
    } else {
        registry.init();
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration; a broken config is fatal.
    let config = sibyl_core::Config::load()?;

    init_tracing(&config.settings.logging)?;
    info!(
        "Configuration loaded (model: {}, embedding: {})",
        config.model_id(),
        config.settings.index.embedding_model
    );

    // Open the document index
    let db_path = resolve_db_path(config.settings.index.db_path.as_deref())?;
    let embedder = Arc::new(HttpEmbeddingClient::new(
        &config.settings.index.embedding_url,
        &config.settings.index.embedding_model,
    ));
    let store = DocumentStore::open(&db_path, embedder, config.settings.index.embedding_dim).await?;
    info!(
        "Document index opened at {:?} ({} chunks)",
        db_path,
        store.count().await
    );

    // Create the completion provider
    let provider = Arc::new(
        OpenAiCompatibleClient::new(
            &config.settings.model.base_url,
            config.api_key().map(str::to_string),
            config.model_id(),
            "openai_compatible",
        )
        .with_max_tokens(config.settings.model.max_completion_tokens),
    );

    let sessions = Arc::new(SessionStore::new());
    let pipeline = RagPipeline::new(
        provider,
        store,
        sessions,
        config.settings.history.trim_max_tokens,
        SearchParams {
            k: config.settings.retrieval.k,
            fetch_k: config.settings.retrieval.fetch_k,
            lambda: config.settings.retrieval.mmr_lambda,
        },
    );
    let state = Arc::new(AppState::new(pipeline, config.settings.clone()));

    // Security: Verify localhost-only binding
    if config.settings.gateway.host != "127.0.0.1" && config.settings.gateway.host != "localhost" {
        tracing::warn!(
            "Gateway binding to non-localhost address: {}. This may expose the API to remote access.",
            config.settings.gateway.host
        );
    }

    let bind_addr = config.bind_addr();
    info!("Starting sibyl gateway on {}", bind_addr);

    server::run(state, &bind_addr).await
}
