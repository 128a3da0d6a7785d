//! Tracking-service integration
//!
//! The remote tracking service is the durable record of what has already been
//! uploaded. [`TrackingService`] is what the pipeline needs from it;
//! [`SpritMonitorClient`] talks to Spritmonitor.

use crate::error::Result;
use crate::record::UploadRecord;
use serde::{Deserialize, Serialize};

pub mod spritmonitor;

pub use spritmonitor::SpritMonitorClient;

/// Spritmonitor fuel sort type of electric tanks
pub const ELECTRIC_FUEL_SORT_TYPE: i64 = 5;

/// A stored fueling entry, reduced to the fields the pipeline reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingEntry {
    /// `dd.mm.yyyy`
    pub date: String,
    pub odometer: f64,
}

/// A tank (or charging type) of a tracked vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TankInfo {
    pub id: String,
    pub name: String,
    pub fuel_sort_type: Option<i64>,
}

impl TankInfo {
    pub fn is_electric(&self) -> bool {
        self.fuel_sort_type == Some(ELECTRIC_FUEL_SORT_TYPE)
    }
}

/// Pick the electric tank out of a vehicle's tanks
pub fn find_electric_tank(tanks: &[TankInfo]) -> Option<&TankInfo> {
    tanks.iter().find(|t| t.is_electric())
}

#[async_trait::async_trait]
pub trait TrackingService: Send + Sync {
    /// Latest stored entries, newest first
    async fn latest_entries(&self, limit: u32) -> Result<Vec<TrackingEntry>>;

    /// Store one consumption record
    async fn submit(&self, record: &UploadRecord) -> Result<()>;

    /// Tanks of the configured vehicle
    async fn tanks(&self) -> Result<Vec<TankInfo>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_electric_tank() {
        let tanks = vec![
            TankInfo {
                id: "1".into(),
                name: "Petrol".into(),
                fuel_sort_type: Some(1),
            },
            TankInfo {
                id: "2".into(),
                name: "Battery".into(),
                fuel_sort_type: Some(5),
            },
        ];
        assert_eq!(find_electric_tank(&tanks).map(|t| t.id.as_str()), Some("2"));
        assert!(find_electric_tank(&tanks[..1]).is_none());
    }
}
