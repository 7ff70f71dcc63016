//! # Timestep Aggregation
//!
//! One window, three levels:
//!
//! - **Local**: each device's own observations, deduplicated and reduced
//! - **Group**: the union of its locals' *raw* observations, deduplicated
//!   and reduced as one set
//! - **World**: the union of every group's raw observations
//!
//! Groups and the world never average their children's results. Vector
//! sums compose, averaged directions do not.

use std::collections::BTreeMap;

use cidstat_compute::{deduplicate, reduce_observations};
use cidstat_core::{CalcResult, DeviceId, Observation, ObservationSource, StatisticResult, TimeWindow};
use tracing::debug;

use crate::topology::DeviceTopology;

/// Deduplicate, reduce and label one device's observations
///
/// `observations` must not be empty.
pub fn summarize_device(device_id: DeviceId, observations: &[Observation], iteration: u64, timestamp: f64) -> CalcResult<StatisticResult> {
    let unique = deduplicate(observations);
    let summary = reduce_observations(&unique)?;
    Ok(summary.into_result(device_id, iteration, timestamp, observations.len() as u32, unique.len() as u32))
}

/// Produces every result of one timestep
pub struct TimestepAggregator<'t> {
    topology: &'t DeviceTopology,
}

impl<'t> TimestepAggregator<'t> {
    pub fn new(topology: &'t DeviceTopology) -> Self {
        Self { topology }
    }

    /// Fetch the window's observations and reduce them at every level
    pub fn aggregate<S: ObservationSource + ?Sized>(&self, source: &mut S, window: TimeWindow, iteration: u64) -> CalcResult<Vec<StatisticResult>> {
        let participants = self.topology.participants();
        if participants.is_empty() {
            return Ok(Vec::new());
        }

        let fetched = source.fetch_observations(participants, window)?;
        self.reduce_window(fetched.into_iter().map(|o| (o.device_id, o.observation)), window, iteration)
    }

    /// Reduce already-fetched `(local device, observation)` pairs
    pub fn reduce_window(
        &self,
        observations: impl IntoIterator<Item = (DeviceId, Observation)>,
        window: TimeWindow,
        iteration: u64,
    ) -> CalcResult<Vec<StatisticResult>> {
        let timestamp = window.start;

        let mut by_local: BTreeMap<DeviceId, Vec<Observation>> = BTreeMap::new();
        for (device_id, observation) in observations {
            if self.topology.group_of(device_id).is_none() {
                debug!("Ignoring observation for non-aggregated device {}", device_id);
                continue;
            }
            by_local.entry(device_id).or_default().push(observation);
        }

        let mut results = Vec::new();
        let mut by_group: BTreeMap<DeviceId, Vec<Observation>> = BTreeMap::new();

        // Local
        for (&device_id, raw) in &by_local {
            results.push(summarize_device(device_id, raw, iteration, timestamp)?);

            if let Some(group) = self.topology.group_of(device_id) {
                by_group.entry(group).or_default().extend_from_slice(raw);
            }
        }

        // Group
        let mut world: Vec<Observation> = Vec::new();
        for (&group, raw) in &by_group {
            results.push(summarize_device(group, raw, iteration, timestamp)?);
            world.extend_from_slice(raw);
        }

        // World
        if !world.is_empty() {
            results.push(summarize_device(self.topology.world(), &world, iteration, timestamp)?);
        }

        Ok(results)
    }
}
