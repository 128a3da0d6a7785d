//! Daily-stats reconciliation
//!
//! Decides which historical days are missing from the tracking service and
//! attributes an odometer reading to each of them. The tracking service is the
//! only record of what was uploaded; nothing is persisted locally.

use crate::error::Result;
use crate::tracking::TrackingEntry;
use crate::units::parse_tracking_date;
use crate::vehicle::DailyStat;
use chrono::{Days, NaiveDate};

/// Latest day (and odometer) already stored remotely
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Checkpoint {
    pub date: NaiveDate,
    pub odometer_km: f64,
}

impl Checkpoint {
    /// Checkpoint from the newest-first entries of the tracking service;
    /// `None` when no entries are stored.
    pub fn from_entries(entries: &[TrackingEntry]) -> Result<Option<Self>> {
        let Some(latest) = entries.first() else {
            return Ok(None);
        };
        Ok(Some(Self {
            date: parse_tracking_date(&latest.date)?,
            odometer_km: latest.odometer,
        }))
    }

    /// Nothing to backfill once the checkpoint has reached yesterday
    pub fn is_current(&self, today: NaiveDate) -> bool {
        match today.checked_sub_days(Days::new(1)) {
            Some(yesterday) => self.date >= yesterday,
            None => true,
        }
    }
}

/// Sort newest first and walk the odometer backwards from its current value.
///
/// Each day gets the reading at its end; the next older day gets that minus
/// the day's distance. Gaps in the window are not detected.
pub fn assign_odometers(stats: &mut [DailyStat], current_odometer_km: f64) {
    stats.sort_by(|a, b| b.date.cmp(&a.date));
    let mut odometer = current_odometer_km;
    for day in stats.iter_mut() {
        day.odometer_km = Some(odometer);
        odometer -= day.distance_km;
    }
}

/// Days to upload, oldest first, each carrying its odometer.
///
/// Excludes today (incomplete) and everything up to the checkpoint.
pub fn plan_backfill(
    mut stats: Vec<DailyStat>,
    current_odometer_km: f64,
    checkpoint: Option<&Checkpoint>,
    today: NaiveDate,
) -> Vec<DailyStat> {
    assign_odometers(&mut stats, current_odometer_km);

    if checkpoint.is_some_and(|c| c.is_current(today)) {
        return Vec::new();
    }

    let mut pending: Vec<DailyStat> = stats
        .into_iter()
        .filter(|d| checkpoint.is_none_or(|c| d.date > c.date) && d.date < today)
        .collect();
    pending.sort_by_key(|d| d.date);
    pending
}
