//! Runs a single check cycle and exits, for hosts that bring their own
//! scheduler (cron, serverless timers).

use uptime_core::{
    logging,
    services::Services,
    trigger::TriggerOutcome,
    Config, Result,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging();

    let config = Config::from_env()?;
    info!("Starting one-shot check cycle with config: {:?}", config);

    let services = Services::init(config).await?;
    let outcome = services.runner.trigger().await;
    services.shutdown().await;

    match outcome? {
        TriggerOutcome::Ran(report) => {
            println!("{}", serde_json::to_string(&report)?);
        }
        TriggerOutcome::Skipped => info!("Another check cycle is in progress, nothing to do"),
    }

    Ok(())
}
