//! groundwork-api - HTTP API server for project Q&A.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use groundwork_api::{cors_layer, parse_allowed_origins, router, AppState};
use groundwork_core::{
    defaults, EmbeddingBackend, EmbeddingConfig, EmbeddingProviderKind, GenerationConfig,
    RetrievalConfig,
};
use groundwork_db::{Database, PoolConfig};
use groundwork_inference::{LocalEmbedder, OllamaBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "groundwork_api=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "groundwork_api=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    // Optionally create a file appender with daily rotation
    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("groundwork-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    // Get configuration from environment
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/groundwork".to_string());
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults::SERVER_PORT);

    let retrieval_config = RetrievalConfig::from_env();
    let embedding_config = EmbeddingConfig::from_env()?;
    let generation_config = GenerationConfig::from_env();

    // Connect to database
    info!("Connecting to database...");
    let db = Database::connect_with_config(&database_url, PoolConfig::from_env()).await?;
    info!("Database connected");

    info!("Running database migrations...");
    db.migrate().await?;
    info!("Database migrations complete");

    // Inference backends
    let ollama = Arc::new(OllamaBackend::new(&generation_config, &embedding_config)?);
    info!(
        base_url = ollama.base_url(),
        model = %generation_config.model,
        "Generation backend configured"
    );

    let mut local_embedder: Option<Arc<LocalEmbedder>> = None;
    let embedder: Arc<dyn EmbeddingBackend> = match embedding_config.provider {
        EmbeddingProviderKind::Local => {
            let local = Arc::new(LocalEmbedder::new(embedding_config.clone())?);
            // Warm the model up in the background; the first request loads
            // it on demand if this has not finished.
            let warm = local.clone();
            tokio::spawn(async move {
                if let Err(e) = warm.init().await {
                    warn!(error = %e, "Embedding model warm-up failed");
                }
            });
            local_embedder = Some(local.clone());
            local
        }
        EmbeddingProviderKind::Ollama => ollama.clone(),
    };
    info!(
        provider = ?embedding_config.provider,
        model = embedder.model_name(),
        dimension = embedder.dimension(),
        "Embedding backend configured"
    );

    let state = AppState::new(
        Arc::new(db.chunks.clone()),
        Arc::new(db.projects.clone()),
        embedder,
        ollama,
        &retrieval_config,
    )?;

    let allowed_origins = parse_allowed_origins(
        &std::env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| "http://localhost:3000".to_string()),
    );
    let app = router(state).layer(cors_layer(allowed_origins));

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(local) = local_embedder {
        local.shutdown();
    }
    db.pool().close().await;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
