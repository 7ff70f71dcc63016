//! Result rows produced by the calculator

use serde::{Deserialize, Serialize};

use crate::codec::{CircularValue, UnitVector2};
use crate::device::DeviceId;

/// Circular statistics of one device for one timestep
///
/// Keyed by `(calculation_id, device_id, iteration)`; writing the same key
/// again replaces the row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatisticResult {
    pub device_id: DeviceId,
    pub iteration: u64,
    /// Start of the timestep window in simulated seconds
    pub timestamp: f64,

    /// Normalized vector sum, zero when the sum is degenerate
    pub mean_vector: UnitVector2,
    pub mean_value: CircularValue,
    /// Mean direction in degrees, `[0, 360)`
    pub direction: f64,
    /// Mean resultant length, `[0, 1]`
    pub length: f64,
    pub variance: f64,
    /// Angular spread in degrees, `None` when the resultant length is ~0
    pub std_deviation: Option<f64>,

    /// Observations before deduplication
    pub package_count: u32,
    /// Observations after deduplication
    pub unique_package_count: u32,

    pub min: CircularValue,
    pub max: CircularValue,
}

/// Per-device roll-up of `length` over a whole calculation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub device_id: DeviceId,
    pub statistic_count: u64,
    pub avg_length: f64,
    pub sum_length: f64,
    pub median_length: f64,
}
