#![cfg(test)]

use super::config::*;
use std::collections::HashMap;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.tracking.latest_entries_limit, 2);
    assert_eq!(config.pricing.currency_id, 11);
    assert!((config.estimator.capacity_kwh - 70.0).abs() < f64::EPSILON);
    assert_eq!(config.sync.run_mode, RunMode::Once);
}

#[test]
fn test_config_validation() {
    let mut config = Config::default();
    assert!(config.validate().is_ok());

    config.tracking.base_url = String::new();
    assert!(config.validate().is_err());

    config = Config::default();
    config.sync.timezone = "Mars/Olympus".to_string();
    assert!(config.validate().is_err());

    config = Config::default();
    config.estimator.capacity_kwh = 0.0;
    assert!(config.validate().is_err());

    config = Config::default();
    config.sync.dc_charge_force_refresh_interval_secs = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_config_serialization() {
    let config = Config::default();
    let yaml = serde_yaml::to_string(&config).unwrap();
    let deserialized: Config = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(config.tracking.base_url, deserialized.tracking.base_url);
    assert_eq!(config.sync.run_mode, deserialized.sync.run_mode);
}

#[test]
fn partial_yaml_falls_back_to_defaults() {
    let yaml = "tracking:\n  vehicle_id: \"42\"\nsync:\n  run_mode: loop\n";
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.tracking.vehicle_id, "42");
    assert_eq!(config.tracking.latest_entries_limit, 2);
    assert_eq!(config.sync.run_mode, RunMode::Loop);
    assert_eq!(config.sync.timezone, "Europe/Budapest");
}

#[test]
fn overrides_replace_secrets_and_prices() {
    let vars: HashMap<&str, &str> = [
        ("UVO_VEHICLE_UUID", "veh-1"),
        ("SPRITMONITOR_VEHICLE_ID", "123"),
        ("SPRITMONITOR_TANK_ID", "2"),
        ("ELECTRICITY_PRICE", "55.5"),
        ("CURRENCY_ID", "3"),
    ]
    .into_iter()
    .collect();

    let mut config = Config::default();
    config
        .apply_overrides_from(|k| vars.get(k).map(|v| v.to_string()))
        .unwrap();

    assert_eq!(config.telematics.vehicle_id, "veh-1");
    assert_eq!(config.tracking.vehicle_id, "123");
    assert_eq!(config.tracking.tank_id.as_deref(), Some("2"));
    assert!((config.pricing.electricity_price - 55.5).abs() < 1e-9);
    assert_eq!(config.pricing.currency_id, 3);
}

#[test]
fn empty_tank_override_clears_tank() {
    let mut config = Config::default();
    config.tracking.tank_id = Some("7".to_string());
    config
        .apply_overrides_from(|k| (k == "SPRITMONITOR_TANK_ID").then(String::new))
        .unwrap();
    assert!(config.tracking.tank_id.is_none());
}

#[test]
fn invalid_price_override_is_rejected() {
    let mut config = Config::default();
    let err = config
        .apply_overrides_from(|k| (k == "ELECTRICITY_PRICE").then(|| "cheap".to_string()))
        .unwrap_err();
    assert!(err.to_string().contains("ELECTRICITY_PRICE"));
}
