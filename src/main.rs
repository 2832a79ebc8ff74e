//! Repository knowledge service - main entry point.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use repo_knowledge::api::{self, AppState};
use repo_knowledge::output::{EmbeddingProvider, HttpEmbeddingClient, TrigramEmbedder};
use repo_knowledge::sources::watch_directory;
use repo_knowledge::storage::InMemoryVectorStore;
use repo_knowledge::types::{ExtractionConfig, ServiceConfig};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "repo_knowledge=info,tower_http=debug".into()),
    );
    if std::env::var("LOG_FORMAT").map_or(false, |f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // Load configuration
    let config = ServiceConfig::from_env();
    let extraction = ExtractionConfig::load(config.extraction_config_path.as_deref().map(Path::new))
        .context("failed to load extraction config")?;

    info!("Starting repo-knowledge v{}", env!("CARGO_PKG_VERSION"));
    for warning in config.startup_warnings() {
        warn!("{}", warning);
    }

    // Initialize components
    let embedder: Arc<dyn EmbeddingProvider> = match &config.embedding_service_url {
        Some(url) => {
            let client = HttpEmbeddingClient::new(url)?;
            if !client.health_check().await {
                warn!(url = %url, "Embedding service is not reachable yet");
            }
            info!(url = %url, "Using HTTP embedding service");
            Arc::new(client)
        }
        None => {
            warn!("EMBEDDING_SERVICE_URL not set, using offline trigram embeddings");
            Arc::new(TrigramEmbedder::default())
        }
    };

    let port = config.port;
    let state = Arc::new(AppState::new(
        config,
        extraction,
        embedder,
        Arc::new(InMemoryVectorStore::new()),
    )?);

    let (include, exclude) = state.extractor.matcher().pattern_counts();
    info!(
        include,
        exclude,
        max_chunk_size = state.config.max_chunk_size,
        llm = state.answerer.is_some(),
        "Extraction configured"
    );

    // Watch configured directories
    let debounce = Duration::from_millis(state.config.watch_debounce_ms);
    for path in &state.config.watch_paths {
        let mut watcher = watch_directory(
            path,
            &state.config.default_repository,
            state.extractor.matcher().clone(),
            debounce,
        )
        .with_context(|| format!("failed to watch {}", path.display()))?;

        let state = state.clone();
        tokio::spawn(async move {
            while let Some(batch) = watcher.batches.recv().await {
                if let Err(e) = state.apply_watch_batch(batch).await {
                    error!(root = %watcher.root().display(), error = %e, "Failed to apply watched changes");
                }
            }
        });
    }

    // Build HTTP routes
    let app = api::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
