//! # Tachograph - Kia Connect to Spritmonitor consumption sync
//!
//! Pulls per-day driving statistics from the Kia Connect (EU) telematics
//! backend and uploads them to Spritmonitor as electricity "fuelings", one
//! record per completed day.
//!
//! ## Architecture
//!
//! - `config`: YAML configuration with environment overrides
//! - `logging`: Structured logging and tracing
//! - `units`: Unit and date format conversions
//! - `estimator`: Charging-power estimation from battery telemetry
//! - `reconcile`: Backfill window and odometer attribution
//! - `record`: Spritmonitor record construction
//! - `sequencer`: Per-day hydration and upload loop
//! - `vehicle`: Telematics types and the Kia Connect client
//! - `tracking`: Tracking-service types and the Spritmonitor client
//! - `sync`: Refresh cycle orchestration

pub mod config;
pub mod error;
pub mod estimator;
pub mod logging;
pub mod reconcile;
pub mod record;
pub mod sequencer;
pub mod sync;
pub mod tracking;
pub mod units;
pub mod vehicle;

#[cfg(test)]
mod config_tests;

// Re-export commonly used types
pub use config::Config;
pub use error::{Result, TachographError};
pub use sync::Synchronizer;
