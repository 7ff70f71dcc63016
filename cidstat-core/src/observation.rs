//! # Observations
//!
//! A beacon received by a local device. Emitters re-broadcast through
//! relays, so the same `(emitter_id, value)` pair can arrive many times
//! within one timestep.

use serde::{Deserialize, Serialize};

use crate::codec::CircularValue;
use crate::device::DeviceId;

/// One received beacon
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Physical emitter (uuid of the sender)
    pub emitter_id: u16,

    /// Package sequence number from the emitter
    pub package_id: u32,

    /// The CID carried by the beacon
    pub value: CircularValue,

    /// Simulated reception time in seconds
    pub timestamp: f64,

    /// Distance between emitter and receiver
    pub distance: f64,
}

impl Observation {
    pub fn new(emitter_id: u16, package_id: u32, value: CircularValue, timestamp: f64) -> Self {
        Self {
            emitter_id,
            package_id,
            value,
            timestamp,
            distance: 0.0,
        }
    }

    pub fn with_distance(mut self, distance: f64) -> Self {
        self.distance = distance;
        self
    }
}

/// An observation tagged with the local device that received it
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeviceObservation {
    pub device_id: DeviceId,
    pub observation: Observation,
}

/// Half-open time window `[start, end)` in simulated seconds
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: f64,
    pub end: f64,
}

impl TimeWindow {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// The window a timestep starting at `time` covers
    pub fn starting_at(time: f64, step: f64) -> Self {
        Self::new(time, time + step)
    }

    #[inline]
    pub fn contains(&self, timestamp: f64) -> bool {
        timestamp >= self.start && timestamp < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_is_half_open() {
        let window = TimeWindow::starting_at(20.0, 20.0);
        assert!(window.contains(20.0));
        assert!(window.contains(39.999));
        assert!(!window.contains(40.0));
        assert!(!window.contains(19.999));
    }
}
