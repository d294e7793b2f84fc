use skillswap_search::{
    api::{build_router, AppState},
    config::Config,
    search::{Reconciler, SearchService},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        Config::default()
    });

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "skillswap_search={},tower_http=info",
            config.observability.log_level
        )
        .into()
    });
    let registry = tracing_subscriber::registry().with(filter);
    if config.observability.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!(
        "Starting {} v{}",
        config.observability.service_name,
        env!("CARGO_PKG_VERSION")
    );

    // Initialize Prometheus metrics
    if config.observability.prometheus_enabled {
        if let Err(e) = skillswap_search::metrics::init_metrics() {
            tracing::warn!("Failed to initialize metrics: {}", e);
            tracing::warn!("Continuing without metrics");
        }
    } else {
        tracing::info!("Prometheus metrics disabled in configuration");
    }

    // Connect the search service; an unreachable store or index root is fatal
    tracing::info!("Storage backend: {:?}", config.state.backend);
    let search = Arc::new(SearchService::new(
        config.search.clone(),
        config.state.clone(),
    ));
    search.initialize().await?;

    if let Err(e) = search.setup_index(false).await {
        tracing::warn!("Search index not ready: {}", e);
        tracing::warn!("Searches will fail until POST /api/search/setup succeeds");
    }

    // Schedule drift repair
    let reconciler = match config.search.reconcile_schedule.as_deref() {
        Some(schedule) => Some(Reconciler::start(search.clone(), schedule).await?),
        None => {
            tracing::info!("Scheduled reconciliation disabled");
            None
        }
    };

    let app = build_router(AppState::new(search.clone()));

    // Start HTTP server
    let http_addr = format!("{}:{}", config.server.host, config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_addr).await?;

    tracing::info!("HTTP API server listening on http://{}", http_addr);
    tracing::info!("   Health check: http://{}/health", http_addr);
    tracing::info!("   Search API: http://{}/api/search?q=", http_addr);

    axum::serve(http_listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutdown signal received");
        })
        .await?;

    if let Some(reconciler) = reconciler {
        reconciler.shutdown().await?;
    }

    tracing::info!("Shutting down gracefully...");
    Ok(())
}
