//! Kia Connect (EU) telematics client
//!
//! Thin JSON wrapper over the vehicle status, driving history and trip info
//! endpoints. Login and token renewal are not handled here: the client works
//! with an access token obtained elsewhere.

use super::{DailyStat, TelematicsClient, Trip, VehicleSnapshot};
use crate::config::TelematicsConfig;
use crate::error::{Result, TachographError};
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::units::{day_token, parse_day_token, parse_vehicle_timestamp};
use chrono::NaiveDate;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde_json::{Value, json};
use std::sync::Mutex;
use std::time::Duration;

const RESULT_OK: &str = "0000";
const RESULT_RATE_LIMITED: &str = "5091";
const RESULT_TIMEOUTS: [&str; 2] = ["4081", "9999"];

/// Kia Connect client bound to one vehicle
pub struct KiaConnectClient {
    http: reqwest::Client,
    config: TelematicsConfig,
    known_vehicles: Mutex<Vec<String>>,
    /// Trips of the most recently hydrated day
    trips: Mutex<Option<(NaiveDate, Vec<Trip>)>>,
    logger: StructuredLogger,
}

impl KiaConnectClient {
    /// Create a client from the telematics configuration
    pub fn new(config: TelematicsConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        let logger = get_logger_with_context(
            LogContext::new("kia").with_vehicle_id(config.vehicle_id.clone()),
        );
        Ok(Self {
            http,
            config,
            known_vehicles: Mutex::new(Vec::new()),
            trips: Mutex::new(None),
            logger,
        })
    }

    fn vehicle_url(&self, suffix: &str) -> String {
        format!(
            "{}/api/v1/spa/vehicles/{}{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.vehicle_id,
            suffix
        )
    }

    fn authorization(&self) -> String {
        let token = self.config.access_token.trim();
        if token.starts_with("Bearer ") {
            token.to_string()
        } else {
            format!("Bearer {}", token)
        }
    }

    fn store_day_trips(&self, day: NaiveDate, trips: Vec<Trip>) {
        if let Ok(mut cache) = self.trips.lock() {
            *cache = Some((day, trips));
        }
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header(AUTHORIZATION, self.authorization())
            .header(CONTENT_TYPE, "application/json;charset=UTF-8")
            .header(ACCEPT, "application/json")
            .header(
                USER_AGENT,
                concat!("tachograph/", env!("APP_VERSION")),
            )
            .header("ccsp-service-id", &self.config.service_id)
            .header("ccsp-application-id", &self.config.application_id)
            .header("ccsp-device-id", &self.config.device_id)
    }

    async fn send(&self, req: reqwest::RequestBuilder, what: &str) -> Result<Value> {
        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let text = resp.text().await?;
        let body: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
        self.logger
            .debug(&format!("{} -> HTTP {} ({} bytes)", what, status, text.len()));
        check_response(status, &body, &text)?;
        Ok(body)
    }

    async fn trip_info(&self, payload: Value, what: &str) -> Result<Value> {
        let url = self.vehicle_url("/tripinfo");
        let req = self.request(reqwest::Method::POST, &url).json(&payload);
        self.send(req, what).await
    }
}

#[async_trait::async_trait]
impl TelematicsClient for KiaConnectClient {
    async fn ensure_session(&self) -> Result<()> {
        if self.config.access_token.trim().is_empty() {
            return Err(TachographError::auth("No Kia Connect access token configured"));
        }
        if self.config.vehicle_id.trim().is_empty() {
            return Err(TachographError::config("No Kia Connect vehicle id configured"));
        }

        let already_known = self
            .known_vehicles
            .lock()
            .map(|v| !v.is_empty())
            .unwrap_or(false);
        if already_known {
            return Ok(());
        }

        let url = format!(
            "{}/api/v1/spa/vehicles",
            self.config.base_url.trim_end_matches('/')
        );
        let body = self
            .send(self.request(reqwest::Method::GET, &url), "vehicle list")
            .await?;
        let ids = parse_vehicle_ids(&body);
        if ids.is_empty() {
            // A token without vehicles is a half-initialized session
            return Err(TachographError::auth(
                "Session holds a token but no vehicles; a fresh login is required",
            ));
        }
        if !ids.iter().any(|id| id == &self.config.vehicle_id) {
            return Err(TachographError::config(format!(
                "Vehicle {} is not part of this account (found: {})",
                self.config.vehicle_id,
                ids.join(", ")
            )));
        }
        self.logger
            .info(&format!("Session ready, {} vehicle(s) visible", ids.len()));
        if let Ok(mut known) = self.known_vehicles.lock() {
            *known = ids;
        }
        Ok(())
    }

    async fn cached_snapshot(&self) -> Result<VehicleSnapshot> {
        let url = self.vehicle_url("/status/latest");
        let body = self
            .send(self.request(reqwest::Method::GET, &url), "cached vehicle state")
            .await?;
        parse_snapshot(&body)
    }

    async fn force_refresh(&self) -> Result<()> {
        let url = self.vehicle_url("/status");
        self.send(self.request(reqwest::Method::GET, &url), "forced vehicle refresh")
            .await?;
        Ok(())
    }

    async fn daily_stats(&self) -> Result<Vec<DailyStat>> {
        let url = self.vehicle_url("/drvhistory");
        let req = self
            .request(reqwest::Method::POST, &url)
            .json(&json!({ "periodTarget": 0 }));
        let body = self.send(req, "driving history").await?;
        let stats = parse_daily_stats(&body);
        self.logger
            .debug(&format!("Driving history holds {} day(s)", stats.len()));
        Ok(stats)
    }

    async fn hydrate_month(&self, month: &str) -> Result<()> {
        let body = self
            .trip_info(
                json!({ "tripPeriodType": 0, "setTripMonth": month }),
                "month trip info",
            )
            .await?;
        let days = body
            .pointer("/resMsg/tripDayList")
            .and_then(|v| v.as_array())
            .map(|a| a.len())
            .unwrap_or(0);
        self.logger
            .debug(&format!("Month {} has trips on {} day(s)", month, days));
        Ok(())
    }

    async fn hydrate_day(&self, day: NaiveDate) -> Result<()> {
        let body = self
            .trip_info(
                json!({ "tripPeriodType": 1, "setTripDay": day_token(day) }),
                "day trip info",
            )
            .await?;
        self.store_day_trips(day, parse_day_trips(&body));
        Ok(())
    }

    fn day_trips(&self, day: NaiveDate) -> Vec<Trip> {
        self.trips
            .lock()
            .ok()
            .and_then(|cache| match cache.as_ref() {
                Some((cached, trips)) if *cached == day => Some(trips.clone()),
                _ => None,
            })
            .unwrap_or_default()
    }
}

/// Map HTTP status and backend result code onto the error taxonomy
pub fn check_response(status: u16, body: &Value, raw: &str) -> Result<()> {
    let code = body.get("resCode").and_then(|v| v.as_str()).unwrap_or("");
    let message = body
        .get("resMsg")
        .and_then(|v| v.as_str())
        .or_else(|| body.get("message").and_then(|v| v.as_str()))
        .unwrap_or(raw);

    if status == 429 || code == RESULT_RATE_LIMITED {
        return Err(TachographError::rate_limit(format!(
            "Kia Connect rate limit reached (HTTP {}, code {}): {}",
            status, code, message
        )));
    }
    if RESULT_TIMEOUTS.contains(&code) {
        return Err(TachographError::timeout(format!(
            "Vehicle unreachable (code {}): {}",
            code, message
        )));
    }
    if status == 401 {
        return Err(TachographError::auth(format!(
            "Kia Connect rejected the access token: {}",
            message
        )));
    }
    if !(200..300).contains(&status) || (!code.is_empty() && code != RESULT_OK) {
        return Err(TachographError::api(format!(
            "Kia Connect error (HTTP {}, code {}): {}",
            status, code, message
        )));
    }
    Ok(())
}

fn num(v: Option<&Value>) -> Option<f64> {
    let v = v?;
    v.as_f64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
}

fn num_or_zero(v: &Value, key: &str) -> f64 {
    num(v.get(key)).unwrap_or(0.0)
}

/// Vehicle ids visible to the session
pub fn parse_vehicle_ids(body: &Value) -> Vec<String> {
    body.pointer("/resMsg/vehicles")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.get("vehicleId").and_then(|id| id.as_str()))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Vehicle snapshot from a cached status response
pub fn parse_snapshot(body: &Value) -> Result<VehicleSnapshot> {
    let info = body
        .pointer("/resMsg/vehicleStatusInfo")
        .ok_or_else(|| TachographError::serialization("Status response lacks vehicleStatusInfo"))?;
    let status = info
        .get("vehicleStatus")
        .ok_or_else(|| TachographError::serialization("Status response lacks vehicleStatus"))?;

    let odometer_km = num(info.pointer("/odometer/value"))
        .ok_or_else(|| TachographError::serialization("Status response lacks odometer"))?;
    let last_updated = status
        .get("time")
        .and_then(|v| v.as_str())
        .ok_or_else(|| TachographError::serialization("Status response lacks time"))
        .and_then(parse_vehicle_timestamp)?;

    let ev = status.get("evStatus").cloned().unwrap_or_default();

    let mut charge_limit_ac_pct = 100.0;
    let mut charge_limit_dc_pct = 100.0;
    if let Some(targets) = ev
        .pointer("/reservChargeInfos/targetSOClist")
        .and_then(|v| v.as_array())
    {
        for t in targets {
            let Some(level) = num(t.get("targetSOClevel")) else {
                continue;
            };
            match t.get("plugType").and_then(|v| v.as_i64()) {
                Some(0) => charge_limit_dc_pct = level,
                Some(1) => charge_limit_ac_pct = level,
                _ => {}
            }
        }
    }

    Ok(VehicleSnapshot {
        odometer_km,
        battery_pct: num(ev.get("batteryStatus")).unwrap_or(0.0),
        charge_limit_ac_pct,
        charge_limit_dc_pct,
        minutes_to_full: num(ev.pointer("/remainTime2/atc/value")).unwrap_or(0.0),
        is_charging: ev
            .get("batteryCharge")
            .and_then(|v| v.as_bool())
            .unwrap_or(false),
        engine_running: status
            .get("engine")
            .and_then(|v| v.as_bool())
            .unwrap_or(false),
        last_updated,
    })
}

/// Daily statistics from a driving history response; undated rows are skipped
pub fn parse_daily_stats(body: &Value) -> Vec<DailyStat> {
    let Some(rows) = body
        .pointer("/resMsg/drivingInfoDetail")
        .and_then(|v| v.as_array())
    else {
        return Vec::new();
    };

    rows.iter()
        .filter(|row| {
            row.get("drivingPeriod")
                .and_then(|v| v.as_i64())
                .is_none_or(|p| p == 0)
        })
        .filter_map(|row| {
            let date = row
                .get("drivingDate")
                .and_then(|v| v.as_str())
                .and_then(|s| parse_day_token(s).ok())?;
            Some(DailyStat {
                date,
                distance_km: num_or_zero(row, "calculativeOdo"),
                total_consumed_wh: num_or_zero(row, "totalPwrCsp"),
                engine_consumption_wh: num_or_zero(row, "motorPwrCsp"),
                climate_consumption_wh: num_or_zero(row, "climatePwrCsp"),
                onboard_electronics_consumption_wh: num_or_zero(row, "eDPwrCsp"),
                battery_care_consumption_wh: num_or_zero(row, "batteryMgPwrCsp"),
                regenerated_energy_wh: num_or_zero(row, "regenPwr"),
                odometer_km: None,
            })
        })
        .collect()
}

/// Trips from a day trip info response
pub fn parse_day_trips(body: &Value) -> Vec<Trip> {
    let Some(days) = body
        .pointer("/resMsg/dayTripList")
        .and_then(|v| v.as_array())
    else {
        return Vec::new();
    };

    days.iter()
        .filter_map(|d| d.get("tripList").and_then(|v| v.as_array()))
        .flatten()
        .map(|t| Trip {
            distance_km: num_or_zero(t, "tripDist"),
            avg_speed_kmh: num_or_zero(t, "tripAvgSpeed"),
            max_speed_kmh: num_or_zero(t, "tripMaxSpeed"),
            drive_time_min: num_or_zero(t, "tripDrvTime").max(0.0) as u32,
            idle_time_min: num_or_zero(t, "tripIdleTime").max(0.0) as u32,
        })
        .collect()
}
