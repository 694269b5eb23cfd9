use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use uptime_core::{Config, Result, logging, services::Services};

mod server;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging();

    let config = Config::from_env()?;
    info!("Starting Uptime API server with config: {:?}", config);

    let services = Services::init(config).await?;
    if services.config.cron.secret.is_none() {
        warn!("CRON_SECRET not set, the cron endpoint accepts unauthenticated triggers");
    }

    let state = Arc::new(server::AppState::from_services(&services));
    let app = server::create_app(state);

    let addr = format!("{}:{}", services.config.server.host, services.config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    services.shutdown().await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
