//! # cidstat Core
//!
//! Core types and traits for cidstat, the circular CID statistics calculator.
//!
//! This crate provides the fundamental building blocks:
//! - **Codec**: Mapping between 64-bit CIDs and points on the unit circle
//! - **Observation**: A beacon received by a simulated device
//! - **Device**: The local → group → world hierarchy
//! - **Statistic**: One result row per device per timestep
//! - **Run**: The resumable calculation record
//!
//! ## The Circle
//!
//! A CID covers one full rotation: `0` is angle zero and `u64::MAX` sits just
//! below 360°. All arithmetic on CIDs wraps, it is a ring and not a line.
//!
//! Persistence lives behind the traits in [`traits`], so the engine never
//! knows whether it talks to memory, a file or a database.

pub mod codec;
pub mod config;
pub mod device;
pub mod error;
pub mod observation;
pub mod run;
pub mod statistic;
pub mod traits;

// Re-export main types at crate root
pub use codec::{CircularValue, UnitVector2};
pub use config::CalcConfig;
pub use device::{Device, DeviceId, DeviceKind, DeviceListing, SimulationId, PERSON_GROUP};
pub use error::{CalcError, CalcResult};
pub use observation::{DeviceObservation, Observation, TimeWindow};
pub use run::{CalculationId, CalculationRun, RunStatus, Simulation, SimulationStatus};
pub use statistic::{DeviceSummary, StatisticResult};
pub use traits::*;

/// Default simulated seconds covered by one timestep
pub const DEFAULT_TIMESTEP_SECONDS: f64 = 20.0;
