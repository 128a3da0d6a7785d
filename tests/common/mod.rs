#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tachograph::error::{Result, TachographError};
use tachograph::record::UploadRecord;
use tachograph::sync::Clock;
use tachograph::tracking::{TankInfo, TrackingEntry, TrackingService};
use tachograph::vehicle::{DailyStat, TelematicsClient, Trip, VehicleSnapshot};

/// Ordered log of collaborator calls shared by both fakes
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(h, min, 0).unwrap()
}

pub fn fixed_clock(instant: DateTime<Utc>) -> Clock {
    Arc::new(move || instant)
}

pub fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

pub fn snapshot(odometer_km: f64, last_updated: NaiveDateTime) -> VehicleSnapshot {
    VehicleSnapshot {
        odometer_km,
        battery_pct: 64.0,
        charge_limit_ac_pct: 80.0,
        charge_limit_dc_pct: 100.0,
        minutes_to_full: 0.0,
        is_charging: false,
        engine_running: false,
        last_updated,
    }
}

pub struct FakeTelematics {
    pub log: CallLog,
    pub snapshot: Mutex<VehicleSnapshot>,
    pub stats: Vec<DailyStat>,
    pub trips: HashMap<NaiveDate, Vec<Trip>>,
    pub fail_month: Option<String>,
    pub fail_day: Option<NaiveDate>,
    pub fail_daily_stats: bool,
    hydrated: Mutex<Vec<NaiveDate>>,
}

impl FakeTelematics {
    pub fn new(log: CallLog, snapshot: VehicleSnapshot, stats: Vec<DailyStat>) -> Self {
        Self {
            log,
            snapshot: Mutex::new(snapshot),
            stats,
            trips: HashMap::new(),
            fail_month: None,
            fail_day: None,
            fail_daily_stats: false,
            hydrated: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, call: String) {
        self.log.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl TelematicsClient for FakeTelematics {
    async fn ensure_session(&self) -> Result<()> {
        self.record("session".into());
        Ok(())
    }

    async fn cached_snapshot(&self) -> Result<VehicleSnapshot> {
        self.record("snapshot".into());
        Ok(self.snapshot.lock().unwrap().clone())
    }

    async fn force_refresh(&self) -> Result<()> {
        self.record("force".into());
        Ok(())
    }

    async fn daily_stats(&self) -> Result<Vec<DailyStat>> {
        self.record("stats".into());
        if self.fail_daily_stats {
            return Err(TachographError::rate_limit("quota exhausted"));
        }
        Ok(self.stats.clone())
    }

    async fn hydrate_month(&self, month: &str) -> Result<()> {
        self.record(format!("month:{}", month));
        if self.fail_month.as_deref() == Some(month) {
            return Err(TachographError::timeout("month trip info"));
        }
        Ok(())
    }

    async fn hydrate_day(&self, day: NaiveDate) -> Result<()> {
        self.record(format!("day:{}", day));
        if self.fail_day == Some(day) {
            return Err(TachographError::api("day trip info"));
        }
        self.hydrated.lock().unwrap().push(day);
        Ok(())
    }

    fn day_trips(&self, day: NaiveDate) -> Vec<Trip> {
        if !self.hydrated.lock().unwrap().contains(&day) {
            return Vec::new();
        }
        self.trips.get(&day).cloned().unwrap_or_default()
    }
}

/// Tracking service whose stored entries grow with every accepted submit
pub struct FakeTracking {
    pub log: CallLog,
    pub entries: Mutex<Vec<TrackingEntry>>,
    pub submitted: Mutex<Vec<UploadRecord>>,
    pub fail_latest: bool,
    pub fail_submit_date: Option<String>,
}

impl FakeTracking {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            entries: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
            fail_latest: false,
            fail_submit_date: None,
        }
    }

    pub fn with_entry(self, date: &str, odometer: f64) -> Self {
        self.entries.lock().unwrap().insert(
            0,
            TrackingEntry {
                date: date.to_string(),
                odometer,
            },
        );
        self
    }

    pub fn submitted_dates(&self) -> Vec<String> {
        self.submitted
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.date.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl TrackingService for FakeTracking {
    async fn latest_entries(&self, limit: u32) -> Result<Vec<TrackingEntry>> {
        self.log.lock().unwrap().push("latest".into());
        if self.fail_latest {
            return Err(TachographError::network("connection reset"));
        }
        let entries = self.entries.lock().unwrap();
        Ok(entries.iter().take(limit as usize).cloned().collect())
    }

    async fn submit(&self, record: &UploadRecord) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .push(format!("submit:{}", record.date));
        if self.fail_submit_date.as_deref() == Some(record.date.as_str()) {
            return Err(TachographError::api("500 Internal Server Error"));
        }
        self.entries.lock().unwrap().insert(
            0,
            TrackingEntry {
                date: record.date.clone(),
                odometer: record.odometer as f64,
            },
        );
        self.submitted.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn tanks(&self) -> Result<Vec<TankInfo>> {
        Ok(vec![TankInfo {
            id: "1".into(),
            name: "Electricity".into(),
            fuel_sort_type: Some(5),
        }])
    }
}
