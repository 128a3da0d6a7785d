//! Vehicle telematics integration for Tachograph
//!
//! This module defines the vehicle-side domain types and the
//! [`TelematicsClient`] seam through which the sync pipeline talks to the
//! telematics backend. [`KiaConnectClient`] is the production implementation.

use crate::error::Result;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub mod kia;

pub use kia::KiaConnectClient;

/// Charging session classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChargeType {
    Ac,
    Dc,
    #[default]
    Unknown,
}

impl ChargeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ac => "AC",
            Self::Dc => "DC",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Lowercase label used in Spritmonitor's `charge_info`
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ac => "ac",
            Self::Dc => "dc",
            Self::Unknown => "unknown",
        }
    }
}

/// Estimated charging state of the vehicle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ChargeSession {
    pub charge_type: ChargeType,
    pub power_kw: f64,
}

impl ChargeSession {
    /// Not charging: zero power, unknown type
    pub fn idle() -> Self {
        Self::default()
    }
}

/// Latest known state of the vehicle
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleSnapshot {
    /// Odometer in km
    pub odometer_km: f64,
    /// State of charge in percent
    pub battery_pct: f64,
    /// Charge limit used for AC charging
    pub charge_limit_ac_pct: f64,
    /// Charge limit used for DC charging
    pub charge_limit_dc_pct: f64,
    /// Vehicle-estimated minutes until the charge limit is reached
    pub minutes_to_full: f64,
    pub is_charging: bool,
    pub engine_running: bool,
    /// When the vehicle last reported, in vehicle-local time
    pub last_updated: NaiveDateTime,
}

/// One calendar day of driving statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStat {
    pub date: NaiveDate,
    pub distance_km: f64,
    pub total_consumed_wh: f64,
    pub engine_consumption_wh: f64,
    pub climate_consumption_wh: f64,
    pub onboard_electronics_consumption_wh: f64,
    pub battery_care_consumption_wh: f64,
    pub regenerated_energy_wh: f64,
    /// Assigned during reconciliation, never reported by the backend
    #[serde(default)]
    pub odometer_km: Option<f64>,
}

impl DailyStat {
    /// A day with only distance and total consumption filled in
    pub fn new(date: NaiveDate, distance_km: f64, total_consumed_wh: f64) -> Self {
        Self {
            date,
            distance_km,
            total_consumed_wh,
            engine_consumption_wh: 0.0,
            climate_consumption_wh: 0.0,
            onboard_electronics_consumption_wh: 0.0,
            battery_care_consumption_wh: 0.0,
            regenerated_energy_wh: 0.0,
            odometer_km: None,
        }
    }

    /// Consumed minus regenerated energy; may be negative on inconsistent data
    pub fn net_consumed_wh(&self) -> f64 {
        self.total_consumed_wh - self.regenerated_energy_wh
    }
}

/// A single trip of a day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub distance_km: f64,
    pub avg_speed_kmh: f64,
    pub max_speed_kmh: f64,
    /// Minutes driven
    pub drive_time_min: u32,
    /// Minutes idling
    pub idle_time_min: u32,
}

/// Telematics backend as seen by the sync pipeline.
///
/// Trip detail must be hydrated (month, then day) before
/// [`TelematicsClient::day_trips`] can return anything for that day.
#[async_trait::async_trait]
pub trait TelematicsClient: Send + Sync {
    /// Make sure a usable session with a populated vehicle list exists.
    /// When no vehicles are known while a token is held, a fresh session is required.
    async fn ensure_session(&self) -> Result<()>;

    /// Last state the backend has cached for the vehicle
    async fn cached_snapshot(&self) -> Result<VehicleSnapshot>;

    /// Ask the backend to wake the vehicle and pull fresh state
    async fn force_refresh(&self) -> Result<()>;

    /// Daily statistics for the trailing window the backend keeps
    async fn daily_stats(&self) -> Result<Vec<DailyStat>>;

    /// Load trip-level detail for a month (`YYYYMM`)
    async fn hydrate_month(&self, month: &str) -> Result<()>;

    /// Load the trip list of one day
    async fn hydrate_day(&self, day: NaiveDate) -> Result<()>;

    /// Trips of a hydrated day; empty when unknown
    fn day_trips(&self, day: NaiveDate) -> Vec<Trip>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charge_type_labels() {
        assert_eq!(ChargeType::Ac.as_str(), "AC");
        assert_eq!(ChargeType::Dc.label(), "dc");
        assert_eq!(ChargeType::default(), ChargeType::Unknown);
        assert_eq!(ChargeType::Unknown.label(), "unknown");
    }

    #[test]
    fn idle_session_is_zero_unknown() {
        let s = ChargeSession::idle();
        assert_eq!(s.charge_type, ChargeType::Unknown);
        assert_eq!(s.power_kw, 0.0);
    }

    #[test]
    fn net_consumption_may_go_negative() {
        let mut day = DailyStat::new(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(), 10.0, 1000.0);
        day.regenerated_energy_wh = 1500.0;
        assert_eq!(day.net_consumed_wh(), -500.0);
    }
}
