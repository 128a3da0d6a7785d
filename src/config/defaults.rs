use super::*;

impl Default for TelematicsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://prd.eu-ccapi.kia.com:8080".to_string(),
            access_token: String::new(),
            vehicle_id: String::new(),
            device_id: String::new(),
            service_id: "fdc85c00-0a2f-4c64-bcb4-2cfb1500730a".to_string(),
            application_id: "a2b8469b-30a3-4361-8e13-6fceea8fbe74".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.spritmonitor.de/v1".to_string(),
            bearer_token: String::new(),
            app_token: String::new(),
            vehicle_id: String::new(),
            tank_id: None,
            latest_entries_limit: 2,
            request_timeout_secs: 30,
        }
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            electricity_price: 41.0,
            currency_id: 11,
            price_type: 1,
        }
    }
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            // 64 kWh usable plus reserve and charger losses
            capacity_kwh: 70.0,
            dc_power_threshold_kw: 8.0,
            ac_limit_margin_pct: 15.0,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            timezone: "Europe/Budapest".to_string(),
            run_mode: RunMode::Once,
            // ~200 requests a day including cached ones
            cached_refresh_interval_secs: 3600 * 4,
            car_off_force_refresh_interval_secs: 3600 * 6,
            engine_running_force_refresh_interval_secs: 600,
            dc_charge_force_refresh_interval_secs: 1800,
            ac_charge_force_refresh_interval_secs: 1800,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            file: "/tmp/tachograph.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}
