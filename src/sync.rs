//! Refresh cycle orchestration
//!
//! A [`Synchronizer`] owns the estimator and the record builder, talks to the
//! telematics and tracking collaborators, and runs reconciliation passes. All
//! calls are awaited one after another; nothing runs concurrently because both
//! backends enforce small daily quotas.

use crate::config::{Config, SyncConfig};
use crate::error::{Result, TachographError, report_failure};
use crate::estimator::ChargeEstimator;
use crate::logging::{LogContext, StructuredLogger, get_logger, get_logger_with_context};
use crate::reconcile::{Checkpoint, plan_backfill};
use crate::record::RecordBuilder;
use crate::sequencer::{LiveCharge, PassOutcome, UploadSequencer};
use crate::tracking::TrackingService;
use crate::vehicle::{ChargeSession, ChargeType, DailyStat, TelematicsClient, VehicleSnapshot};
use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;

/// Source of the current instant
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// How a refresh cycle ended
#[derive(Debug)]
pub struct RefreshReport {
    /// Passes that ran, in order
    pub passes: Vec<PassOutcome>,
    /// A collaborator call failed and the cycle stopped early
    pub interrupted: bool,
}

pub struct Synchronizer {
    telematics: Arc<dyn TelematicsClient>,
    tracking: Arc<dyn TrackingService>,
    estimator: ChargeEstimator,
    builder: RecordBuilder,
    timezone: Tz,
    tracking_vehicle_id: String,
    entries_limit: u32,
    snapshot: Option<VehicleSnapshot>,
    clock: Clock,
    logger: StructuredLogger,
}

impl Synchronizer {
    pub fn new(
        config: &Config,
        telematics: Arc<dyn TelematicsClient>,
        tracking: Arc<dyn TrackingService>,
    ) -> Result<Self> {
        Ok(Self {
            telematics,
            tracking,
            estimator: ChargeEstimator::from_config(&config.estimator),
            builder: RecordBuilder::new(config.pricing.clone()),
            timezone: config.timezone()?,
            tracking_vehicle_id: config.tracking.vehicle_id.clone(),
            entries_limit: config.tracking.latest_entries_limit,
            snapshot: None,
            clock: Arc::new(Utc::now),
            logger: get_logger("sync"),
        })
    }

    /// Replace the charging-power estimator
    pub fn with_estimator(mut self, estimator: ChargeEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    /// Replace the wall clock
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Last snapshot retrieved from the telematics backend
    pub fn snapshot(&self) -> Option<&VehicleSnapshot> {
        self.snapshot.as_ref()
    }

    /// Last charging estimate
    pub fn charge_session(&self) -> ChargeSession {
        self.estimator.last()
    }

    fn now_local(&self) -> NaiveDateTime {
        (self.clock)().with_timezone(&self.timezone).naive_local()
    }

    /// Establish the session and bring the vehicle state up to date.
    ///
    /// Failures are reported and returned.
    pub async fn initialize(&mut self) -> Result<()> {
        self.logger.info("Initializing vehicle connection");
        let logger = self.logger.clone();

        if let Err(e) = self.telematics.ensure_session().await {
            report_failure(&logger, "Establishing the telematics session", &e);
            return Err(e);
        }
        if let Err(e) = self.load_snapshot().await {
            report_failure(&logger, "Fetching cached vehicle state", &e);
            return Err(e);
        }
        if let Err(e) = self.telematics.force_refresh().await {
            report_failure(&logger, "Forcing a vehicle refresh", &e);
            return Err(e);
        }
        if let Err(e) = self.load_snapshot().await {
            report_failure(&logger, "Fetching refreshed vehicle state", &e);
            return Err(e);
        }

        self.logger.info("Vehicle initialization completed");
        Ok(())
    }

    /// One refresh cycle: a pass on cached data, then a pass after a forced
    /// refresh.
    ///
    /// Collaborator failures are reported and end the cycle; only a clock
    /// skew is returned as an error.
    pub async fn refresh(&mut self) -> Result<RefreshReport> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let logger = get_logger_with_context(LogContext::new("sync").with_run_id(run_id));
        let mut passes = Vec::new();

        if let Err(e) = self.telematics.ensure_session().await {
            report_failure(&logger, "Establishing the telematics session", &e);
            return Ok(RefreshReport {
                passes,
                interrupted: true,
            });
        }

        match self.cycle_step(&logger, "cached").await {
            Some(outcome) => passes.push(outcome),
            None => {
                return Ok(RefreshReport {
                    passes,
                    interrupted: true,
                });
            }
        }

        self.check_clock_skew(&logger)?;

        logger.info("Performing force refresh");
        if let Err(e) = self.telematics.force_refresh().await {
            report_failure(&logger, "Forcing a vehicle refresh", &e);
            return Ok(RefreshReport {
                passes,
                interrupted: true,
            });
        }

        match self.cycle_step(&logger, "refreshed").await {
            Some(outcome) => passes.push(outcome),
            None => {
                return Ok(RefreshReport {
                    passes,
                    interrupted: true,
                });
            }
        }

        Ok(RefreshReport {
            passes,
            interrupted: false,
        })
    }

    /// Snapshot, estimate, daily stats and a pass. `None` when a
    /// collaborator call failed.
    async fn cycle_step(&mut self, logger: &StructuredLogger, label: &str) -> Option<PassOutcome> {
        if let Err(e) = self.load_snapshot().await {
            report_failure(logger, &format!("Fetching {} vehicle state", label), &e);
            return None;
        }
        let stats = match self.telematics.daily_stats().await {
            Ok(stats) => stats,
            Err(e) => {
                report_failure(logger, "Fetching driving history", &e);
                return None;
            }
        };
        let outcome = self.reconcile_and_upload(logger, stats).await;
        log_outcome(logger, &outcome);
        Some(outcome)
    }

    async fn load_snapshot(&mut self) -> Result<()> {
        let snapshot = self.telematics.cached_snapshot().await?;
        let session = self.estimator.update(&snapshot);
        if session.charge_type != ChargeType::Unknown {
            self.logger.info(&format!(
                "Estimated charging power: {} kW ({})",
                session.power_kw,
                session.charge_type.as_str()
            ));
        }
        self.snapshot = Some(snapshot);
        Ok(())
    }

    fn check_clock_skew(&self, logger: &StructuredLogger) -> Result<()> {
        let Some(snapshot) = &self.snapshot else {
            return Ok(());
        };
        let delta = self.now_local() - snapshot.last_updated;
        logger.info(&format!(
            "Delta between last saved update and current time: {} seconds",
            delta.num_seconds()
        ));
        if delta.num_seconds() < 0 {
            let message = format!(
                "Negative delta ({}s) between now and the vehicle's last update; check the configured timezone",
                delta.num_seconds()
            );
            logger.error(&message);
            return Err(TachographError::clock_skew(message));
        }
        Ok(())
    }

    /// Fetch the checkpoint, plan the backfill and upload it
    async fn reconcile_and_upload(
        &self,
        logger: &StructuredLogger,
        stats: Vec<DailyStat>,
    ) -> PassOutcome {
        let Some(snapshot) = &self.snapshot else {
            return PassOutcome::UpToDate;
        };
        if self.tracking_vehicle_id.trim().is_empty() {
            logger.warn("Spritmonitor vehicle ID not set, skipping consumption data upload");
            return PassOutcome::UpToDate;
        }
        if stats.is_empty() {
            logger.info("No daily stats to process");
            return PassOutcome::UpToDate;
        }

        let checkpoint = match self.tracking.latest_entries(self.entries_limit).await {
            Ok(entries) => Checkpoint::from_entries(&entries),
            Err(e) => Err(e),
        };
        let checkpoint = match checkpoint {
            Ok(Some(cp)) => {
                logger.info(&format!(
                    "Latest Spritmonitor entry: date={}, odometer={}",
                    cp.date, cp.odometer_km
                ));
                Some(cp)
            }
            Ok(None) => {
                logger.info("No existing entries in Spritmonitor");
                None
            }
            Err(e) => {
                logger.error(&format!(
                    "Failed to get latest entry from Spritmonitor, backfilling the whole window: {}",
                    e
                ));
                None
            }
        };

        let today = self.now_local().date();
        let days = plan_backfill(stats, snapshot.odometer_km, checkpoint.as_ref(), today);
        if days.is_empty() {
            logger.info("No historical entries to upload");
            return PassOutcome::UpToDate;
        }
        logger.info(&format!("Found {} historical entries to upload", days.len()));

        let live = LiveCharge {
            session: self.estimator.last(),
            battery_pct: snapshot.battery_pct,
        };
        UploadSequencer::new(
            self.telematics.as_ref(),
            self.tracking.as_ref(),
            &self.builder,
            logger,
        )
        .run(&days, &live)
        .await
    }
}

fn log_outcome(logger: &StructuredLogger, outcome: &PassOutcome) {
    match outcome {
        PassOutcome::UpToDate => logger.debug("Pass finished, nothing to upload"),
        PassOutcome::Completed { uploaded } => {
            logger.info(&format!("Pass finished, uploaded {} day(s)", uploaded))
        }
        PassOutcome::Aborted {
            stage, day, uploaded, ..
        } => logger.warn(&format!(
            "Pass aborted at {} of {} after {} upload(s)",
            stage, day, uploaded
        )),
    }
}

/// Delay before the next refresh in loop mode, chosen from the quota
/// intervals by what the vehicle is doing.
pub fn next_poll_interval(
    snapshot: Option<&VehicleSnapshot>,
    session: ChargeSession,
    sync: &SyncConfig,
) -> Duration {
    let secs = match snapshot {
        None => sync.cached_refresh_interval_secs,
        Some(s) if s.is_charging => match session.charge_type {
            ChargeType::Dc => sync.dc_charge_force_refresh_interval_secs,
            _ => sync.ac_charge_force_refresh_interval_secs,
        },
        Some(s) if s.engine_running => sync.engine_running_force_refresh_interval_secs,
        Some(_) => sync.car_off_force_refresh_interval_secs,
    };
    Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn snapshot(charging: bool, engine: bool) -> VehicleSnapshot {
        VehicleSnapshot {
            odometer_km: 1000.0,
            battery_pct: 50.0,
            charge_limit_ac_pct: 80.0,
            charge_limit_dc_pct: 100.0,
            minutes_to_full: 60.0,
            is_charging: charging,
            engine_running: engine,
            last_updated: NaiveDate::from_ymd_opt(2024, 3, 7)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn poll_interval_follows_vehicle_activity() {
        let cfg = SyncConfig::default();
        let dc = ChargeSession {
            charge_type: ChargeType::Dc,
            power_kw: 50.0,
        };
        let ac = ChargeSession {
            charge_type: ChargeType::Ac,
            power_kw: 7.0,
        };
        assert_eq!(
            next_poll_interval(Some(&snapshot(true, false)), dc, &cfg),
            Duration::from_secs(cfg.dc_charge_force_refresh_interval_secs)
        );
        assert_eq!(
            next_poll_interval(Some(&snapshot(true, false)), ac, &cfg),
            Duration::from_secs(cfg.ac_charge_force_refresh_interval_secs)
        );
        assert_eq!(
            next_poll_interval(Some(&snapshot(false, true)), ChargeSession::idle(), &cfg),
            Duration::from_secs(600)
        );
        assert_eq!(
            next_poll_interval(Some(&snapshot(false, false)), ChargeSession::idle(), &cfg),
            Duration::from_secs(6 * 3600)
        );
        assert_eq!(
            next_poll_interval(None, ChargeSession::idle(), &cfg),
            Duration::from_secs(4 * 3600)
        );
    }
}
