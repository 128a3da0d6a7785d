use anyhow::Result;
use std::sync::Arc;
use tachograph::config::RunMode;
use tachograph::logging::{get_logger, init_logging};
use tachograph::sync::next_poll_interval;
use tachograph::tracking::SpritMonitorClient;
use tachograph::vehicle::KiaConnectClient;
use tachograph::{Config, Synchronizer};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let mut config = Config::load().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    config.apply_env_overrides()?;
    config.validate()?;

    init_logging(&config.logging)?;
    let logger = get_logger("main");
    logger.info(&format!(
        "Tachograph {} starting up",
        env!("APP_VERSION")
    ));

    let telematics = Arc::new(KiaConnectClient::new(config.telematics.clone())?);

    let mut tracking = SpritMonitorClient::new(config.tracking.clone())?;
    if !config.tracking.vehicle_id.trim().is_empty() {
        if let Err(e) = tracking.verify_vehicle().await {
            logger.error(&format!("Spritmonitor vehicle check failed: {}", e));
            return Err(anyhow::anyhow!("Vehicle check failed: {}", e));
        }
        if let Err(e) = tracking.discover_electric_tank().await {
            logger.error(&format!("Spritmonitor tank discovery failed: {}", e));
            return Err(anyhow::anyhow!("Tank discovery failed: {}", e));
        }
    }

    let mut sync = Synchronizer::new(&config, telematics, Arc::new(tracking))?;

    if let Err(e) = sync.initialize().await {
        return Err(anyhow::anyhow!("Failed to initialize vehicle connection: {}", e));
    }

    loop {
        match sync.refresh().await {
            Ok(report) if report.interrupted => {
                logger.warn("Refresh cycle interrupted, retrying on the next cycle")
            }
            Ok(_) => logger.info("Refresh cycle completed"),
            Err(e) if e.is_fatal() => {
                logger.error(&format!("Aborting: {}", e));
                return Err(e.into());
            }
            Err(e) => logger.error(&format!("Refresh cycle failed: {}", e)),
        }

        if config.sync.run_mode == RunMode::Once {
            break;
        }

        let delay = next_poll_interval(sync.snapshot(), sync.charge_session(), &config.sync);
        logger.info(&format!("Next refresh in {} s", delay.as_secs()));
        tokio::time::sleep(delay).await;
    }

    logger.info("Tachograph shutdown complete");
    Ok(())
}
