use super::{TankInfo, TrackingEntry, TrackingService, find_electric_tank};
use crate::config::TrackingConfig;
use crate::error::{Result, TachographError};
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::record::UploadRecord;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use serde_json::Value;
use std::time::Duration;

/// A vehicle registered on Spritmonitor
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedVehicle {
    pub id: String,
    pub make: String,
    pub model: String,
}

/// Spritmonitor REST client
pub struct SpritMonitorClient {
    http: reqwest::Client,
    config: TrackingConfig,
    tank_id: Option<String>,
    logger: StructuredLogger,
}

impl SpritMonitorClient {
    pub fn new(config: TrackingConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        let logger = get_logger_with_context(
            LogContext::new("spritmonitor").with_vehicle_id(config.vehicle_id.clone()),
        );
        let tank_id = config.tank_id.clone().filter(|t| !t.trim().is_empty());
        Ok(Self {
            http,
            config,
            tank_id,
            logger,
        })
    }

    /// Tank the client reads and writes, once known
    pub fn tank_id(&self) -> Option<&str> {
        self.tank_id.as_deref()
    }

    /// Use the configured tank, or look up the vehicle's electric tank
    pub async fn discover_electric_tank(&mut self) -> Result<String> {
        if let Some(id) = &self.tank_id {
            return Ok(id.clone());
        }
        let tanks = self.tanks().await?;
        let tank = find_electric_tank(&tanks).ok_or_else(|| {
            TachographError::config(format!(
                "No electric tank found on Spritmonitor vehicle {}",
                self.config.vehicle_id
            ))
        })?;
        self.logger.info(&format!(
            "Using electric tank {} ({})",
            tank.id, tank.name
        ));
        self.tank_id = Some(tank.id.clone());
        Ok(tank.id.clone())
    }

    /// Vehicles of the account
    pub async fn vehicles(&self) -> Result<Vec<TrackedVehicle>> {
        let body = self.get_json(&self.url("vehicles.json"), &[]).await?;
        Ok(parse_vehicles(&body))
    }

    /// Check that the configured vehicle belongs to the account
    pub async fn verify_vehicle(&self) -> Result<TrackedVehicle> {
        let vehicles = self.vehicles().await?;
        let vehicle = find_vehicle(&vehicles, &self.config.vehicle_id).ok_or_else(|| {
            TachographError::config(format!(
                "Spritmonitor vehicle {} not found among {} account vehicle(s)",
                self.config.vehicle_id,
                vehicles.len()
            ))
        })?;
        self.logger.info(&format!(
            "Uploading to Spritmonitor vehicle {} ({} {})",
            vehicle.id, vehicle.make, vehicle.model
        ));
        Ok(vehicle.clone())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn require_tank(&self) -> Result<&str> {
        self.tank_id.as_deref().ok_or_else(|| {
            TachographError::config("Spritmonitor tank id is neither configured nor discovered")
        })
    }

    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value> {
        let resp = self
            .http
            .get(url)
            .query(query)
            .header(AUTHORIZATION, format!("Bearer {}", self.config.bearer_token))
            .header("Application-ID", &self.config.app_token)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, concat!("tachograph/", env!("APP_VERSION")))
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(TachographError::api(format!(
                "Spritmonitor request failed: {} {}",
                status.as_u16(),
                text
            )));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait::async_trait]
impl TrackingService for SpritMonitorClient {
    async fn latest_entries(&self, limit: u32) -> Result<Vec<TrackingEntry>> {
        let tank = self.require_tank()?;
        let url = self.url(&format!(
            "vehicle/{}/tank/{}/fuelings.json",
            self.config.vehicle_id, tank
        ));
        let body = self
            .get_json(
                &url,
                &[("offset", "0".to_string()), ("limit", limit.to_string())],
            )
            .await?;
        parse_entries(&body)
    }

    async fn submit(&self, record: &UploadRecord) -> Result<()> {
        let tank = self.require_tank()?;
        let url = self.url(&format!(
            "vehicle/{}/tank/{}/fueling.json",
            self.config.vehicle_id, tank
        ));
        // The service takes new fuelings as query parameters on a GET
        self.get_json(&url, &record.to_query_pairs()).await?;
        self.logger
            .info(&format!("Uploaded consumption record for {}", record.date));
        Ok(())
    }

    async fn tanks(&self) -> Result<Vec<TankInfo>> {
        let url = self.url(&format!("vehicle/{}/tanks.json", self.config.vehicle_id));
        let body = self.get_json(&url, &[]).await?;
        Ok(parse_tanks(&body))
    }
}

fn id_string(v: Option<&Value>) -> Option<String> {
    match v? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Stored entries, skipping rows without a usable date or odometer
pub fn parse_entries(body: &Value) -> Result<Vec<TrackingEntry>> {
    let Some(rows) = body.as_array() else {
        if body.is_null() {
            return Ok(Vec::new());
        }
        return Err(TachographError::serialization(
            "Spritmonitor fuelings response is not a list",
        ));
    };
    Ok(rows
        .iter()
        .filter_map(|row| {
            let date = row.get("date")?.as_str()?.to_string();
            let odometer = row.get("odometer").and_then(|v| {
                v.as_f64()
                    .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
            })?;
            Some(TrackingEntry { date, odometer })
        })
        .collect())
}

pub fn parse_tanks(body: &Value) -> Vec<TankInfo> {
    body.as_array()
        .map(|rows| {
            rows.iter()
                .filter_map(|row| {
                    Some(TankInfo {
                        id: id_string(row.get("id"))?,
                        name: row
                            .get("name")
                            .and_then(|v| v.as_str())
                            .unwrap_or_default()
                            .to_string(),
                        fuel_sort_type: row.get("fuelsorttype").and_then(|v| {
                            v.as_i64()
                                .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
                        }),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

pub fn find_vehicle<'a>(vehicles: &'a [TrackedVehicle], id: &str) -> Option<&'a TrackedVehicle> {
    let id = id.trim();
    vehicles.iter().find(|v| v.id == id)
}

pub fn parse_vehicles(body: &Value) -> Vec<TrackedVehicle> {
    let text = |row: &Value, key: &str| {
        row.get(key)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };
    body.as_array()
        .map(|rows| {
            rows.iter()
                .filter_map(|row| {
                    Some(TrackedVehicle {
                        id: id_string(row.get("id"))?,
                        make: text(row, "make"),
                        model: text(row, "model"),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_entries_with_numeric_or_string_odometer() {
        let body = json!([
            { "id": 9, "date": "04.03.2024", "odometer": 12300 },
            { "id": 8, "date": "03.03.2024", "odometer": "12250.5" },
            { "id": 7, "odometer": 12000 }
        ]);
        let entries = parse_entries(&body).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].date, "04.03.2024");
        assert_eq!(entries[1].odometer, 12250.5);
        assert!(parse_entries(&Value::Null).unwrap().is_empty());
        assert!(parse_entries(&json!({"error": "x"})).is_err());
    }

    #[test]
    fn parses_tanks_and_vehicles() {
        let tanks = parse_tanks(&json!([
            { "id": 1, "name": "Electricity", "fuelsorttype": 5 },
            { "name": "nameless" }
        ]));
        assert_eq!(tanks.len(), 1);
        assert!(tanks[0].is_electric());
        assert_eq!(tanks[0].id, "1");

        let vehicles = parse_vehicles(&json!([{ "id": 123, "make": "Kia", "model": "EV6" }]));
        assert_eq!(vehicles[0].id, "123");
        assert_eq!(vehicles[0].model, "EV6");
    }

    #[tokio::test]
    async fn configured_tank_skips_discovery() {
        let cfg = TrackingConfig {
            tank_id: Some("7".into()),
            ..TrackingConfig::default()
        };
        let mut client = SpritMonitorClient::new(cfg).unwrap();
        assert_eq!(client.discover_electric_tank().await.unwrap(), "7");
        assert_eq!(client.tank_id(), Some("7"));
    }

    #[tokio::test]
    async fn missing_tank_is_a_config_error() {
        let client = SpritMonitorClient::new(TrackingConfig::default()).unwrap();
        let err = client.latest_entries(2).await.unwrap_err();
        assert!(matches!(err, TachographError::Config { .. }));
    }

    #[test]
    fn configured_vehicle_is_looked_up_by_id() {
        let vehicles = parse_vehicles(&json!([
            { "id": 7, "make": "Kia", "model": "Niro" },
            { "id": "123", "make": "Kia", "model": "EV6" }
        ]));
        assert_eq!(find_vehicle(&vehicles, " 123 ").map(|v| v.model.as_str()), Some("EV6"));
        assert!(find_vehicle(&vehicles, "999").is_none());
        assert!(find_vehicle(&[], "7").is_none());
    }
}
