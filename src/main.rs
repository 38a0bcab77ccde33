use callrelay::config::Config;
use callrelay::interface::api::{build_router, init_metrics, AppState};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting CallRelay");
    info!("Configuration loaded: {:?}", config);

    let prometheus_handle = if config.metrics.enabled {
        info!("Initializing Prometheus metrics exporter");
        match init_metrics() {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(error = %e, "Metrics exporter unavailable, continuing without /metrics");
                None
            }
        }
    } else {
        None
    };

    let state = AppState::from_config(&config);
    let app = build_router(state, prometheus_handle);

    let listener = tokio::net::TcpListener::bind(config.listen_addr()).await?;
    info!("Relay listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down...");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
