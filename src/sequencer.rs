//! Upload sequencer
//!
//! Walks the planned days oldest first. Trip detail is hydrated once per
//! month crossed and once per day before the day's record is built. The first
//! day-level failure ends the pass; the next pass picks up from the remote
//! checkpoint again.

use crate::error::{TachographError, report_failure};
use crate::logging::StructuredLogger;
use crate::record::RecordBuilder;
use crate::tracking::TrackingService;
use crate::units::month_token;
use crate::vehicle::{ChargeSession, DailyStat, TelematicsClient};
use chrono::NaiveDate;
use std::fmt;

/// Step of the per-day loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    DayHydration,
    Upload,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::DayHydration => write!(f, "day hydration"),
            Stage::Upload => write!(f, "upload"),
        }
    }
}

/// Result of one reconciliation pass
#[derive(Debug)]
pub enum PassOutcome {
    /// Nothing to upload
    UpToDate,
    /// Every planned day was uploaded
    Completed { uploaded: usize },
    /// A day failed; the days before it were uploaded
    Aborted {
        stage: Stage,
        day: NaiveDate,
        uploaded: usize,
        error: TachographError,
    },
}

/// Live charging estimate from the latest snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveCharge {
    pub session: ChargeSession,
    pub battery_pct: f64,
}

impl LiveCharge {
    /// Charge figures for one day: power only on the live day, the last
    /// classification everywhere.
    pub fn for_day(&self, is_live_day: bool) -> ChargeSession {
        if is_live_day {
            self.session
        } else {
            ChargeSession {
                charge_type: self.session.charge_type,
                power_kw: 0.0,
            }
        }
    }
}

pub struct UploadSequencer<'a> {
    telematics: &'a dyn TelematicsClient,
    tracking: &'a dyn TrackingService,
    builder: &'a RecordBuilder,
    logger: &'a StructuredLogger,
}

impl<'a> UploadSequencer<'a> {
    pub fn new(
        telematics: &'a dyn TelematicsClient,
        tracking: &'a dyn TrackingService,
        builder: &'a RecordBuilder,
        logger: &'a StructuredLogger,
    ) -> Self {
        Self {
            telematics,
            tracking,
            builder,
            logger,
        }
    }

    /// Upload `days` in the given (chronological) order.
    ///
    /// The newest day of the pass is the live day and carries the estimated
    /// charging power.
    pub async fn run(&self, days: &[DailyStat], live: &LiveCharge) -> PassOutcome {
        let Some(live_day) = days.iter().map(|d| d.date).max() else {
            return PassOutcome::UpToDate;
        };

        let mut current_month: Option<String> = None;
        let mut uploaded = 0;

        for day in days {
            let month = month_token(day.date);
            if current_month.as_deref() != Some(month.as_str()) {
                // Missing month detail only degrades the trip figures
                if let Err(e) = self.telematics.hydrate_month(&month).await {
                    self.logger
                        .error(&format!("Failed to get trip info for {}: {}", month, e));
                }
                current_month = Some(month);
            }

            if let Err(error) = self.telematics.hydrate_day(day.date).await {
                report_failure(
                    self.logger,
                    &format!("Hydrating trips of {}", day.date),
                    &error,
                );
                return PassOutcome::Aborted {
                    stage: Stage::DayHydration,
                    day: day.date,
                    uploaded,
                    error,
                };
            }

            let trips = self.telematics.day_trips(day.date);
            let charge = live.for_day(day.date == live_day);
            let record = self.builder.build(day, &trips, charge, live.battery_pct);

            if let Err(error) = self.tracking.submit(&record).await {
                report_failure(
                    self.logger,
                    &format!("Uploading consumption data for {}", day.date),
                    &error,
                );
                return PassOutcome::Aborted {
                    stage: Stage::Upload,
                    day: day.date,
                    uploaded,
                    error,
                };
            }
            uploaded += 1;
        }

        PassOutcome::Completed { uploaded }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::ChargeType;

    #[test]
    fn live_power_only_on_live_day() {
        let live = LiveCharge {
            session: ChargeSession {
                charge_type: ChargeType::Ac,
                power_kw: 7.4,
            },
            battery_pct: 60.0,
        };
        assert_eq!(live.for_day(true).power_kw, 7.4);
        let other = live.for_day(false);
        assert_eq!(other.power_kw, 0.0);
        assert_eq!(other.charge_type, ChargeType::Ac);
    }

    #[test]
    fn stage_display() {
        assert_eq!(Stage::DayHydration.to_string(), "day hydration");
        assert_eq!(Stage::Upload.to_string(), "upload");
    }
}
