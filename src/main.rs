use std::net::SocketAddr;
use std::process::ExitCode;

use tokio::net::TcpListener;
use tracing::{error, info};

use product_catalog::config::LogFormat;
use product_catalog::{AppState, Config, build_router, metrics, utils};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::from_env();

    // Logging comes up first so configuration errors are reported through it
    match &config {
        Ok(config) => utils::init_tracing(config.log_format, &config.log_level),
        Err(_) => utils::init_tracing(LogFormat::default(), "info"),
    }

    info!(
        "Starting Product Catalog v{}",
        env!("CARGO_PKG_VERSION")
    );

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {e}");
            return ExitCode::from(exitcode::CONFIG as u8);
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::from(exitcode::OK as u8),
        Err(exit_code) => ExitCode::from(exit_code as u8),
    }
}

/// Run the application, returning an exit code on error.
async fn run(config: Config) -> Result<(), exitcode::ExitCode> {
    info!(
        host = %config.host,
        port = %config.port,
        default_page_limit = config.default_page_limit,
        seed_sample_data = config.seed_sample_data,
        "Configuration loaded"
    );

    if let Some(metrics_addr) = config.metrics_addr() {
        metrics::try_init_metrics(metrics_addr);
    }

    let state = AppState::new(config.clone());
    metrics::set_product_count(state.store.len().await);
    let app = build_router(state);

    let addr: SocketAddr = config.server_addr().parse().map_err(|e| {
        error!("Invalid server address: {e}");
        exitcode::CONFIG
    })?;
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind to {addr}: {e}");
        exitcode::UNAVAILABLE
    })?;

    info!("Server listening on http://{addr}");
    info!("API endpoints:");
    info!("  GET    /health                         - Health check");
    info!("  GET    /products                       - List products (category, page, limit)");
    info!("  GET    /products/{{id}}                  - Get product");
    info!("  POST   /products                       - Create product (X-API-Key)");
    info!("  PUT    /products/{{id}}                  - Update product (X-API-Key)");
    info!("  DELETE /products/{{id}}                  - Delete product (X-API-Key)");
    info!("  GET    /products/search/name?name=     - Search by name");
    info!("  GET    /products/stats/category-count  - Products per category");

    // Connect info feeds the per-client auth failure lockout
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(utils::shutdown_signal())
    .await
    .map_err(|e| {
        error!("Server error: {e}");
        exitcode::SOFTWARE
    })?;

    info!("Server shutdown complete");
    Ok(())
}
