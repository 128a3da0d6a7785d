//! Charging-power estimation
//!
//! No sensor reports the charging wattage, so it is derived from the state of
//! charge and the vehicle's own minutes-to-full estimate. The derivation is a
//! [`ChargePowerModel`] so it can be replaced without touching the pipeline.

use crate::config::EstimatorConfig;
use crate::units::round1;
use crate::vehicle::{ChargeSession, ChargeType, VehicleSnapshot};

/// DC fast-charge taper: (battery percentage threshold, power cap in kW).
/// The first threshold the battery percentage exceeds wins.
const DC_TAPER: [(f64, f64); 7] = [
    (95.0, 5.0),
    (90.0, 10.0),
    (80.0, 20.0),
    (75.0, 35.0),
    (55.0, 55.0),
    (40.0, 70.0),
    (27.0, 77.0),
];

/// Battery inputs of a single estimate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChargeInputs {
    pub battery_pct: f64,
    pub ac_limit_pct: f64,
    pub dc_limit_pct: f64,
    pub minutes_to_full: f64,
    pub is_charging: bool,
}

impl From<&VehicleSnapshot> for ChargeInputs {
    fn from(s: &VehicleSnapshot) -> Self {
        Self {
            battery_pct: s.battery_pct,
            ac_limit_pct: s.charge_limit_ac_pct,
            dc_limit_pct: s.charge_limit_dc_pct,
            minutes_to_full: s.minutes_to_full,
            is_charging: s.is_charging,
        }
    }
}

/// Strategy turning battery inputs into a charge session
pub trait ChargePowerModel: Send + Sync {
    fn estimate(&self, inputs: &ChargeInputs) -> ChargeSession;
}

/// Linear estimate against a full battery, reclassified as DC and capped by
/// the taper curve when the draw is too high for AC.
///
/// The first pass deliberately ignores the AC charge limit; results are kept
/// comparable with what has already been uploaded.
#[derive(Debug, Clone)]
pub struct LinearTaperModel {
    capacity_kwh: f64,
    dc_power_threshold_kw: f64,
    ac_limit_margin_pct: f64,
}

impl LinearTaperModel {
    pub fn new(config: &EstimatorConfig) -> Self {
        Self {
            capacity_kwh: config.capacity_kwh,
            dc_power_threshold_kw: config.dc_power_threshold_kw,
            ac_limit_margin_pct: config.ac_limit_margin_pct,
        }
    }

    fn power_to(&self, target_pct: f64, inputs: &ChargeInputs) -> f64 {
        let remaining_pct = target_pct - inputs.battery_pct;
        let energy_needed_kwh = self.capacity_kwh * remaining_pct / 100.0;
        energy_needed_kwh / (inputs.minutes_to_full / 60.0)
    }
}

/// Cap imposed by the DC taper curve at the given state of charge, if any
pub fn dc_taper_cap(battery_pct: f64) -> Option<f64> {
    DC_TAPER
        .iter()
        .find(|(threshold, _)| battery_pct > *threshold)
        .map(|(_, cap)| *cap)
}

impl ChargePowerModel for LinearTaperModel {
    fn estimate(&self, inputs: &ChargeInputs) -> ChargeSession {
        if !inputs.is_charging || inputs.minutes_to_full <= 0.0 {
            return ChargeSession::idle();
        }

        let mut power_kw = self.power_to(100.0, inputs);
        let mut charge_type = ChargeType::Ac;

        if power_kw > self.dc_power_threshold_kw
            && (inputs.ac_limit_pct - inputs.battery_pct) > self.ac_limit_margin_pct
        {
            charge_type = ChargeType::Dc;
            power_kw = self.power_to(inputs.dc_limit_pct, inputs);
            if let Some(cap) = dc_taper_cap(inputs.battery_pct) {
                power_kw = power_kw.min(cap);
            }
        }

        ChargeSession {
            charge_type,
            power_kw: round1(power_kw),
        }
    }
}

/// Runs the configured model and remembers the latest classification
pub struct ChargeEstimator {
    model: Box<dyn ChargePowerModel>,
    last: ChargeSession,
}

impl ChargeEstimator {
    pub fn new(model: Box<dyn ChargePowerModel>) -> Self {
        Self {
            model,
            last: ChargeSession::idle(),
        }
    }

    /// Estimator using [`LinearTaperModel`]
    pub fn from_config(config: &EstimatorConfig) -> Self {
        Self::new(Box::new(LinearTaperModel::new(config)))
    }

    /// Estimate from a fresh snapshot and store the result
    pub fn update(&mut self, snapshot: &VehicleSnapshot) -> ChargeSession {
        self.last = self.model.estimate(&ChargeInputs::from(snapshot));
        self.last
    }

    /// Most recent estimate; idle until the first update
    pub fn last(&self) -> ChargeSession {
        self.last
    }
}
