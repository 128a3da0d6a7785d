//! Record builder: turns a reconciled day into a Spritmonitor fueling entry

use crate::config::PricingConfig;
use crate::units::{format_minutes, format_tracking_date, km_per_kwh, round1, wh_to_kwh};
use crate::vehicle::{ChargeSession, DailyStat, Trip};
use std::fmt::Write as _;

/// Spritmonitor fuel sort for electricity
pub const FUEL_SORT_ELECTRICITY: u32 = 19;
/// Spritmonitor quantity unit for kWh
pub const QUANTITY_UNIT_KWH: u32 = 5;
/// Every day is reported as a full charge so consumption is computed per entry
pub const FILL_TYPE_FULL: &str = "full";
const CHARGE_SOURCE: &str = "source_vehicle";

/// Aggregated trip metrics of one day
#[derive(Debug, Clone, PartialEq)]
pub struct TripSummary {
    /// All trips, including ones excluded from the speed figures
    pub trip_count: usize,
    pub drive_time_min: u32,
    pub idle_time_min: u32,
    /// Distance-weighted average speed of the valid trips
    pub avg_speed_kmh: f64,
    pub max_speed_kmh: f64,
}

impl TripSummary {
    /// Summarize a day's trips.
    ///
    /// Trips with zero distance or zero max speed are sensor artifacts and do
    /// not count towards the speeds. Returns `None` when no valid trip remains.
    pub fn from_trips(trips: &[Trip]) -> Option<Self> {
        let valid: Vec<&Trip> = trips
            .iter()
            .filter(|t| t.distance_km > 0.0 && t.max_speed_kmh > 0.0)
            .collect();
        if valid.is_empty() {
            return None;
        }

        let distance: f64 = valid.iter().map(|t| t.distance_km).sum();
        let weighted: f64 = valid.iter().map(|t| t.avg_speed_kmh * t.distance_km).sum();
        let max_speed_kmh = valid
            .iter()
            .map(|t| t.max_speed_kmh)
            .fold(f64::MIN, f64::max);

        Some(Self {
            trip_count: trips.len(),
            drive_time_min: trips.iter().map(|t| t.drive_time_min).sum(),
            idle_time_min: trips.iter().map(|t| t.idle_time_min).sum(),
            avg_speed_kmh: weighted / distance,
            max_speed_kmh,
        })
    }

    fn append_to(&self, note: &mut String) {
        let _ = write!(
            note,
            "\nTrip details:\n- Drive time: {}\n- Idle time: {}\n- Avg speed: {:.1} km/h\n- Max speed: {} km/h\n- Number of trips: {}",
            format_minutes(self.drive_time_min),
            format_minutes(self.idle_time_min),
            self.avg_speed_kmh,
            self.max_speed_kmh,
            self.trip_count
        );
    }
}

/// One fueling entry as submitted to Spritmonitor
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRecord {
    /// `dd.mm.yyyy`
    pub date: String,
    pub odometer: i64,
    /// Distance in km, one decimal
    pub trip: f64,
    /// Energy in kWh, one decimal
    pub quantity: f64,
    pub price: f64,
    pub currency_id: u32,
    pub price_type: u32,
    /// `<ac|dc|unknown>,source_vehicle`
    pub charge_info: String,
    pub percent: f64,
    /// km/kWh, zero when no energy was consumed
    pub bc_consumption: f64,
    pub bc_quantity: f64,
    pub bc_speed: f64,
    pub note: String,
    pub location: Option<String>,
    pub position: Option<String>,
    pub charging_power: f64,
    pub charging_duration: u32,
}

impl UploadRecord {
    /// Flatten into ordered query parameters.
    ///
    /// Empty optional fields and non-positive charging figures are left out,
    /// since their absence means something different from zero.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("date", self.date.clone()),
            ("odometer", self.odometer.to_string()),
            ("trip", self.trip.to_string()),
            ("quantity", self.quantity.to_string()),
            ("type", FILL_TYPE_FULL.to_string()),
            ("price", self.price.to_string()),
            ("currencyid", self.currency_id.to_string()),
            ("pricetype", self.price_type.to_string()),
            ("fuelsortid", FUEL_SORT_ELECTRICITY.to_string()),
            ("quantityunitid", QUANTITY_UNIT_KWH.to_string()),
            ("charge_info", self.charge_info.clone()),
            ("percent", self.percent.to_string()),
            ("bc_consumption", self.bc_consumption.to_string()),
            ("bc_quantity", self.bc_quantity.to_string()),
            ("bc_speed", self.bc_speed.to_string()),
        ];
        if !self.note.is_empty() {
            pairs.push(("note", self.note.clone()));
        }
        if let Some(location) = self.location.as_ref().filter(|s| !s.is_empty()) {
            pairs.push(("location", location.clone()));
        }
        if let Some(position) = self.position.as_ref().filter(|s| !s.is_empty()) {
            pairs.push(("position", position.clone()));
        }
        if self.charging_power > 0.0 {
            pairs.push(("charging_power", self.charging_power.to_string()));
        }
        if self.charging_duration > 0 {
            pairs.push(("charging_duration", self.charging_duration.to_string()));
        }
        pairs
    }
}

/// Builds [`UploadRecord`]s with the configured price
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    pricing: PricingConfig,
}

impl RecordBuilder {
    pub fn new(pricing: PricingConfig) -> Self {
        Self { pricing }
    }

    /// Build the record of one day.
    ///
    /// `charge` carries the power only for the day of the live estimate; pass
    /// a zero-power session for historical days. Its classification is used
    /// as-is.
    pub fn build(
        &self,
        day: &DailyStat,
        trips: &[Trip],
        charge: ChargeSession,
        battery_pct: f64,
    ) -> UploadRecord {
        let consumed_kwh = round1(wh_to_kwh(day.total_consumed_wh));
        let summary = TripSummary::from_trips(trips);

        let mut note = energy_note(day);
        if let Some(s) = &summary {
            s.append_to(&mut note);
        }

        UploadRecord {
            date: format_tracking_date(day.date),
            // whole kilometres, truncated
            odometer: day.odometer_km.unwrap_or(0.0).trunc() as i64,
            trip: round1(day.distance_km),
            quantity: consumed_kwh,
            price: self.pricing.electricity_price,
            currency_id: self.pricing.currency_id,
            price_type: self.pricing.price_type,
            charge_info: format!("{},{}", charge.charge_type.label(), CHARGE_SOURCE),
            percent: battery_pct,
            bc_consumption: round1(km_per_kwh(day.distance_km, day.total_consumed_wh)),
            bc_quantity: consumed_kwh,
            bc_speed: summary.as_ref().map_or(0.0, |s| round1(s.avg_speed_kmh)),
            note,
            location: None,
            position: None,
            charging_power: charge.power_kw,
            charging_duration: 0,
        }
    }
}

fn energy_note(day: &DailyStat) -> String {
    let kwh = |wh: f64| round1(wh_to_kwh(wh));
    format!(
        "Engine: {} kWh\nClimate: {} kWh\nElectronics: {} kWh\nBattery Care: {} kWh\nRegenerated: {} kWh\nNet Consumption: {} kWh\n",
        kwh(day.engine_consumption_wh),
        kwh(day.climate_consumption_wh),
        kwh(day.onboard_electronics_consumption_wh),
        kwh(day.battery_care_consumption_wh),
        kwh(day.regenerated_energy_wh),
        kwh(day.net_consumed_wh()),
    )
}
