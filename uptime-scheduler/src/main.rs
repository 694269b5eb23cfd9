use tracing::info;
use uptime_core::{Config, Result, logging, services::Services};

mod scheduler;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging();

    let config = Config::from_env()?;
    info!("Starting Uptime Scheduler with config: {:?}", config);

    let services = Services::init(config).await?;
    let mut scheduler = scheduler::CycleScheduler::new(services.runner.clone()).await?;

    scheduler.run_now().await;
    scheduler.start(&services.config.cron.schedule).await?;

    info!("Uptime scheduler is running. Press Ctrl+C to stop.");

    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received");
    scheduler.stop().await?;
    services.shutdown().await;

    Ok(())
}
