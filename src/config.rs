//! Configuration management for Tachograph
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files with support for environment variable overrides.
//! The loaded [`Config`] is immutable for the duration of a run and is handed
//! to each component at construction.

use crate::error::{Result, TachographError};
use serde::{Deserialize, Serialize};
use std::path::Path;

mod defaults;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Kia Connect (telematics backend) configuration
    pub telematics: TelematicsConfig,

    /// Spritmonitor (tracking service) configuration
    pub tracking: TrackingConfig,

    /// Price and currency reported with every uploaded record
    pub pricing: PricingConfig,

    /// Charging-power estimation parameters
    pub estimator: EstimatorConfig,

    /// Refresh cycle and request quota configuration
    pub sync: SyncConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Kia Connect connection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelematicsConfig {
    /// Base URL of the regional API gateway
    pub base_url: String,

    /// Bearer access token of an established session
    pub access_token: String,

    /// Vehicle identifier (UUID) as known to the backend
    pub vehicle_id: String,

    /// Registered device id sent with every request
    pub device_id: String,

    /// Service id header value
    pub service_id: String,

    /// Application id header value
    pub application_id: String,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

/// Spritmonitor connection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Base URL of the REST API
    pub base_url: String,

    /// Personal bearer token
    pub bearer_token: String,

    /// Application token (Application-ID header)
    pub app_token: String,

    /// Vehicle id on Spritmonitor; uploads are skipped when empty
    pub vehicle_id: String,

    /// Tank id; discovered from the vehicle's tanks when absent
    pub tank_id: Option<String>,

    /// Number of latest entries fetched to find the checkpoint
    pub latest_entries_limit: u32,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

/// Pricing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Electricity price per kWh in the configured currency
    pub electricity_price: f64,

    /// Spritmonitor currency id (11 = HUF)
    pub currency_id: u32,

    /// Spritmonitor price type (1 = unit price)
    pub price_type: u32,
}

/// Charging-power estimation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Energy needed for 0-100 %, including unusable reserve and charger losses
    pub capacity_kwh: f64,

    /// Estimated power above which a session may be DC
    pub dc_power_threshold_kw: f64,

    /// Minimum distance (percentage points) to the AC limit for DC reclassification
    pub ac_limit_margin_pct: f64,
}

/// How the binary runs the refresh cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Initialize, refresh once and exit
    Once,
    /// Keep refreshing, pacing calls by the quota intervals
    Loop,
}

/// Refresh cycle and quota configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Timezone used for "today" and for vehicle timestamps
    pub timezone: String,

    /// Run mode of the binary
    pub run_mode: RunMode,

    /// Interval between cached refreshes (the backend counts cached calls too)
    pub cached_refresh_interval_secs: u64,

    /// Forced refresh interval while the car is off
    pub car_off_force_refresh_interval_secs: u64,

    /// Forced refresh interval while the engine is running
    pub engine_running_force_refresh_interval_secs: u64,

    /// Forced refresh interval while DC charging
    pub dc_charge_force_refresh_interval_secs: u64,

    /// Forced refresh interval while AC charging
    pub ac_charge_force_refresh_interval_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Path to log file
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

/// Environment variables that override configuration values
const ENV_OVERRIDES: &[&str] = &[
    "UVO_ACCESS_TOKEN",
    "UVO_VEHICLE_UUID",
    "UVO_DEVICE_ID",
    "SPRITMONITOR_BEARER_TOKEN",
    "SPRITMONITOR_APP_TOKEN",
    "SPRITMONITOR_VEHICLE_ID",
    "SPRITMONITOR_TANK_ID",
    "ELECTRICITY_PRICE",
    "CURRENCY_ID",
];

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from `TACHOGRAPH_CONFIG` or the default locations
    pub fn load() -> Result<Self> {
        if let Ok(explicit) = std::env::var("TACHOGRAPH_CONFIG") {
            return Self::from_file(explicit);
        }

        let default_paths = [
            "tachograph.yaml",
            "/data/tachograph.yaml",
            "/etc/tachograph/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        Ok(Config::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        for key in ENV_OVERRIDES {
            let Some(value) = lookup(key) else {
                continue;
            };
            let value = value.trim().to_string();
            match *key {
                "UVO_ACCESS_TOKEN" => self.telematics.access_token = value,
                "UVO_VEHICLE_UUID" => self.telematics.vehicle_id = value,
                "UVO_DEVICE_ID" => self.telematics.device_id = value,
                "SPRITMONITOR_BEARER_TOKEN" => self.tracking.bearer_token = value,
                "SPRITMONITOR_APP_TOKEN" => self.tracking.app_token = value,
                "SPRITMONITOR_VEHICLE_ID" => self.tracking.vehicle_id = value,
                "SPRITMONITOR_TANK_ID" => {
                    self.tracking.tank_id = (!value.is_empty()).then_some(value)
                }
                "ELECTRICITY_PRICE" => {
                    self.pricing.electricity_price = value.parse().map_err(|_| {
                        TachographError::validation("ELECTRICITY_PRICE", "Must be a number")
                    })?
                }
                "CURRENCY_ID" => {
                    self.pricing.currency_id = value.parse().map_err(|_| {
                        TachographError::validation("CURRENCY_ID", "Must be an integer")
                    })?
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Parsed timezone of the sync section
    pub fn timezone(&self) -> Result<chrono_tz::Tz> {
        Ok(self.sync.timezone.parse::<chrono_tz::Tz>()?)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.telematics.base_url.trim().is_empty() {
            return Err(TachographError::validation(
                "telematics.base_url",
                "Base URL cannot be empty",
            ));
        }

        if self.tracking.base_url.trim().is_empty() {
            return Err(TachographError::validation(
                "tracking.base_url",
                "Base URL cannot be empty",
            ));
        }

        if self.tracking.latest_entries_limit == 0 {
            return Err(TachographError::validation(
                "tracking.latest_entries_limit",
                "Must be greater than 0",
            ));
        }

        if !(self.estimator.capacity_kwh.is_finite() && self.estimator.capacity_kwh > 0.0) {
            return Err(TachographError::validation(
                "estimator.capacity_kwh",
                "Must be positive",
            ));
        }

        let intervals = [
            (
                "sync.cached_refresh_interval_secs",
                self.sync.cached_refresh_interval_secs,
            ),
            (
                "sync.car_off_force_refresh_interval_secs",
                self.sync.car_off_force_refresh_interval_secs,
            ),
            (
                "sync.engine_running_force_refresh_interval_secs",
                self.sync.engine_running_force_refresh_interval_secs,
            ),
            (
                "sync.dc_charge_force_refresh_interval_secs",
                self.sync.dc_charge_force_refresh_interval_secs,
            ),
            (
                "sync.ac_charge_force_refresh_interval_secs",
                self.sync.ac_charge_force_refresh_interval_secs,
            ),
        ];
        for (field, secs) in intervals {
            if secs == 0 {
                return Err(TachographError::validation(field, "Must be greater than 0"));
            }
        }

        self.timezone()?;

        Ok(())
    }
}
