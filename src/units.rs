//! Unit and format conversions between the Kia Connect and Spritmonitor domains
//!
//! Energy arrives in watt-hours and leaves in kilowatt-hours; dates arrive as
//! `YYYYMMDD` tokens and leave as `dd.mm.yyyy`.

use crate::error::Result;
use chrono::{NaiveDate, NaiveDateTime};

const TRACKING_DATE_FORMAT: &str = "%d.%m.%Y";
const DAY_TOKEN_FORMAT: &str = "%Y%m%d";
const MONTH_TOKEN_FORMAT: &str = "%Y%m";
const VEHICLE_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Round to one decimal place (half away from zero)
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Watt-hours to kilowatt-hours, unrounded
pub fn wh_to_kwh(wh: f64) -> f64 {
    wh / 1000.0
}

/// Kilowatt-hours back to watt-hours
pub fn kwh_to_wh(kwh: f64) -> f64 {
    kwh * 1000.0
}

/// Distance per energy unit (km/kWh), zero when no energy was consumed
pub fn km_per_kwh(distance_km: f64, consumed_wh: f64) -> f64 {
    let kwh = wh_to_kwh(consumed_wh);
    if kwh > 0.0 { distance_km / kwh } else { 0.0 }
}

/// Date as Spritmonitor expects it: `dd.mm.yyyy`
pub fn format_tracking_date(date: NaiveDate) -> String {
    date.format(TRACKING_DATE_FORMAT).to_string()
}

/// Parse a Spritmonitor `dd.mm.yyyy` date
pub fn parse_tracking_date(s: &str) -> Result<NaiveDate> {
    Ok(NaiveDate::parse_from_str(s.trim(), TRACKING_DATE_FORMAT)?)
}

/// Month token used by the trip info endpoint: `YYYYMM`
pub fn month_token(date: NaiveDate) -> String {
    date.format(MONTH_TOKEN_FORMAT).to_string()
}

/// Day token used by the trip info endpoint: `YYYYMMDD`
pub fn day_token(date: NaiveDate) -> String {
    date.format(DAY_TOKEN_FORMAT).to_string()
}

/// Parse a `YYYYMMDD` day token
pub fn parse_day_token(s: &str) -> Result<NaiveDate> {
    Ok(NaiveDate::parse_from_str(s.trim(), DAY_TOKEN_FORMAT)?)
}

/// Parse a vehicle status timestamp (`YYYYMMDDHHMMSS`, vehicle-local time)
pub fn parse_vehicle_timestamp(s: &str) -> Result<NaiveDateTime> {
    Ok(NaiveDateTime::parse_from_str(
        s.trim(),
        VEHICLE_TIMESTAMP_FORMAT,
    )?)
}

/// Minutes rendered as `Hh Mm`
pub fn format_minutes(total_minutes: u32) -> String {
    format!("{}h {}m", total_minutes / 60, total_minutes % 60)
}
