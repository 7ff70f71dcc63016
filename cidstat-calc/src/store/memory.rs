//! In-memory store
//!
//! Holds simulations, devices, received messages, calculations and results
//! in ordered maps. It is the reference implementation of the persistence
//! traits and the snapshot format of [`FileStore`](super::FileStore).

use std::collections::{BTreeMap, BTreeSet};

use cidstat_core::{
    CalcError, CalcResult, CalculationId, CalculationRun, CalculationStore, Device, DeviceId,
    DeviceListing, DeviceObservation, DeviceStore, DeviceSummary, Observation, ObservationSource,
    RunStatus, Simulation, SimulationCatalog, SimulationId, SimulationStatus, StatisticResult,
    TimeWindow,
};
use serde::{Deserialize, Serialize};

use crate::summary;

/// Snapshot format version (for future migrations)
pub const STORE_VERSION: u32 = 1;

/// Everything the calculator persists
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MemoryStore {
    pub version: u32,

    simulations: BTreeMap<SimulationId, Simulation>,
    devices: BTreeMap<DeviceId, Device>,

    /// Received messages per local device, in reception order
    messages: BTreeMap<DeviceId, Vec<Observation>>,

    calculations: BTreeMap<CalculationId, CalculationRun>,
    statistics: BTreeMap<(CalculationId, DeviceId, u64), StatisticResult>,
    summaries: BTreeMap<(CalculationId, DeviceId), DeviceSummary>,

    next_device_id: DeviceId,
    next_calculation_id: CalculationId,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            version: STORE_VERSION,
            simulations: BTreeMap::new(),
            devices: BTreeMap::new(),
            messages: BTreeMap::new(),
            calculations: BTreeMap::new(),
            statistics: BTreeMap::new(),
            summaries: BTreeMap::new(),
            next_device_id: 1,
            next_calculation_id: 1,
        }
    }

    /// Insert or replace a simulation
    pub fn insert_simulation(&mut self, simulation: Simulation) {
        self.simulations.insert(simulation.id, simulation);
    }

    /// Insert or replace a device, keeping the id counter ahead of it
    pub fn insert_device(&mut self, device: Device) {
        self.next_device_id = self.next_device_id.max(device.id + 1);
        self.devices.insert(device.id, device);
    }

    /// Record a message received by `device_id`
    pub fn push_message(&mut self, device_id: DeviceId, observation: Observation) {
        self.messages.entry(device_id).or_default().push(observation);
    }

    pub fn simulation(&self, id: SimulationId) -> Option<&Simulation> {
        self.simulations.get(&id)
    }

    pub fn devices(&self, simulation_id: SimulationId) -> impl Iterator<Item = &Device> {
        self.devices.values().filter(move |d| d.simulation_id == simulation_id)
    }

    pub fn calculation(&self, id: CalculationId) -> Option<&CalculationRun> {
        self.calculations.get(&id)
    }

    pub fn calculations_for(&self, simulation_id: SimulationId) -> impl Iterator<Item = &CalculationRun> {
        self.calculations.values().filter(move |c| c.simulation_id == simulation_id)
    }

    /// Result rows of a calculation, ordered by `(device, iteration)`
    pub fn statistics(&self, calculation_id: CalculationId) -> impl Iterator<Item = &StatisticResult> {
        self.statistics
            .range((calculation_id, DeviceId::MIN, u64::MIN)..=(calculation_id, DeviceId::MAX, u64::MAX))
            .map(|(_, row)| row)
    }

    pub fn summaries(&self, calculation_id: CalculationId) -> impl Iterator<Item = &DeviceSummary> {
        self.summaries
            .range((calculation_id, DeviceId::MIN)..=(calculation_id, DeviceId::MAX))
            .map(|(_, row)| row)
    }

    pub fn message_count(&self) -> usize {
        self.messages.values().map(Vec::len).sum()
    }

    fn calculation_mut(&mut self, id: CalculationId) -> CalcResult<&mut CalculationRun> {
        self.calculations
            .get_mut(&id)
            .ok_or_else(|| CalcError::persistence(format!("calculation {} not found", id)))
    }

    fn allocate_device(&mut self, device: impl FnOnce(DeviceId) -> Device) -> DeviceId {
        let id = self.next_device_id;
        self.next_device_id += 1;
        self.devices.insert(id, device(id));
        id
    }

    fn has_messages(&self, simulation_id: SimulationId) -> bool {
        self.devices(simulation_id)
            .any(|d| self.messages.get(&d.id).is_some_and(|m| !m.is_empty()))
    }
}

impl DeviceStore for MemoryStore {
    fn load_devices(&mut self, simulation_id: SimulationId) -> CalcResult<DeviceListing> {
        Ok(DeviceListing::from_devices(self.devices(simulation_id).cloned()))
    }

    fn create_group_device(&mut self, simulation_id: SimulationId, group_name: &str, group_id: u32) -> CalcResult<DeviceId> {
        Ok(self.allocate_device(|id| Device::group(id, simulation_id, group_name, group_id)))
    }

    fn create_world_device(&mut self, simulation_id: SimulationId) -> CalcResult<DeviceId> {
        Ok(self.allocate_device(|id| Device::world(id, simulation_id)))
    }
}

impl ObservationSource for MemoryStore {
    fn fetch_observations(&mut self, device_ids: &[DeviceId], window: TimeWindow) -> CalcResult<Vec<DeviceObservation>> {
        let wanted: BTreeSet<DeviceId> = device_ids.iter().copied().collect();

        Ok(wanted
            .into_iter()
            .filter_map(|device_id| self.messages.get(&device_id).map(|m| (device_id, m)))
            .flat_map(|(device_id, messages)| {
                messages
                    .iter()
                    .filter(move |o| window.contains(o.timestamp))
                    .map(move |&observation| DeviceObservation { device_id, observation })
            })
            .collect())
    }
}

impl CalculationStore for MemoryStore {
    fn load_or_create_run(&mut self, simulation: &Simulation, timestep_seconds: f64) -> CalcResult<CalculationRun> {
        if !self.simulations.contains_key(&simulation.id) {
            return Err(CalcError::SimulationNotFound(simulation.id));
        }

        let resumable = self
            .calculations_for(simulation.id)
            .filter(|c| c.status.is_resumable())
            .max_by_key(|c| c.id)
            .cloned();
        if let Some(run) = resumable {
            return Ok(run);
        }

        let id = self.next_calculation_id;
        self.next_calculation_id += 1;
        let run = CalculationRun::new(id, simulation.id, timestep_seconds);
        self.calculations.insert(id, run.clone());
        Ok(run)
    }

    fn write_results(&mut self, calculation_id: CalculationId, results: &[StatisticResult]) -> CalcResult<()> {
        self.calculation_mut(calculation_id)?;
        for result in results {
            self.statistics
                .insert((calculation_id, result.device_id, result.iteration), result.clone());
        }
        Ok(())
    }

    fn checkpoint(&mut self, calculation_id: CalculationId, current_time: f64, current_iteration: u64) -> CalcResult<()> {
        let run = self.calculation_mut(calculation_id)?;
        run.current_time = current_time;
        run.current_iteration = current_iteration;
        run.checkpointed = true;
        Ok(())
    }

    fn mark_completed(&mut self, calculation_id: CalculationId) -> CalcResult<()> {
        self.calculation_mut(calculation_id)?.status = RunStatus::Completed;
        Ok(())
    }

    fn mark_failed(&mut self, calculation_id: CalculationId) -> CalcResult<()> {
        self.calculation_mut(calculation_id)?.status = RunStatus::Failed;
        Ok(())
    }

    fn post_aggregate(&mut self, calculation_id: CalculationId) -> CalcResult<()> {
        self.calculation_mut(calculation_id)?;
        let rows = summary::summarize_results(self.statistics(calculation_id));

        self.summaries.retain(|(calc, _), _| *calc != calculation_id);
        for row in rows {
            self.summaries.insert((calculation_id, row.device_id), row);
        }
        Ok(())
    }
}

impl SimulationCatalog for MemoryStore {
    fn pending_simulations(&mut self) -> CalcResult<Vec<Simulation>> {
        Ok(self
            .simulations
            .values()
            .filter(|s| s.status == SimulationStatus::Processed && s.end_time.is_some())
            .filter(|s| {
                !self
                    .calculations_for(s.id)
                    .any(|c| c.status == RunStatus::Completed)
            })
            .filter(|s| self.has_messages(s.id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cidstat_core::UnitVector2;

    fn seeded() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.insert_simulation(Simulation::processed(1, 60.0));
        store.insert_device(Device::local(10, 1, "car", 1, 0));
        store.insert_device(Device::local(11, 1, "car", 1, 1));
        store.push_message(10, Observation::new(1, 1, 5, 1.0));
        store.push_message(10, Observation::new(1, 2, 6, 25.0));
        store.push_message(11, Observation::new(2, 1, 7, 19.99));
        store
    }

    fn result(device_id: DeviceId, iteration: u64, length: f64) -> StatisticResult {
        StatisticResult {
            device_id,
            iteration,
            timestamp: 0.0,
            mean_vector: UnitVector2::new(1.0, 0.0),
            mean_value: 0,
            direction: 0.0,
            length,
            variance: 1.0 - length,
            std_deviation: Some(0.0),
            package_count: 1,
            unique_package_count: 1,
            min: 0,
            max: 0,
        }
    }

    #[test]
    fn test_fetch_respects_window_and_devices() {
        let mut store = seeded();
        let window = TimeWindow::new(0.0, 20.0);

        let both = store.fetch_observations(&[10, 11], window).unwrap();
        assert_eq!(both.len(), 2);

        let only_11 = store.fetch_observations(&[11], window).unwrap();
        assert_eq!(only_11.len(), 1);
        assert_eq!(only_11[0].device_id, 11);

        let later = store.fetch_observations(&[10, 11], TimeWindow::new(20.0, 40.0)).unwrap();
        assert_eq!(later.len(), 1);
        assert_eq!(later[0].observation.package_id, 2);
    }

    #[test]
    fn test_created_devices_get_fresh_ids() {
        let mut store = seeded();
        let group = store.create_group_device(1, "car", 1).unwrap();
        let world = store.create_world_device(1).unwrap();

        assert_eq!(group, 12);
        assert_eq!(world, 13);
        let listing = store.load_devices(1).unwrap();
        assert_eq!(listing.groups.len(), 1);
        assert_eq!(listing.world, Some(13));
    }

    #[test]
    fn test_results_are_upserted() {
        let mut store = seeded();
        let run = store.load_or_create_run(&Simulation::processed(1, 60.0), 20.0).unwrap();

        store.write_results(run.id, &[result(10, 0, 0.5)]).unwrap();
        store.write_results(run.id, &[result(10, 0, 0.9), result(10, 1, 0.1)]).unwrap();

        let rows: Vec<_> = store.statistics(run.id).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].length, 0.9);
    }

    #[test]
    fn test_write_to_unknown_calculation_fails() {
        let mut store = seeded();
        let err = store.write_results(99, &[result(10, 0, 0.5)]).unwrap_err();
        assert!(matches!(err, CalcError::Persistence(_)));
    }

    #[test]
    fn test_resumes_unfinished_run() {
        let mut store = seeded();
        let sim = Simulation::processed(1, 60.0);

        let first = store.load_or_create_run(&sim, 20.0).unwrap();
        store.checkpoint(first.id, 40.0, 2).unwrap();
        store.mark_failed(first.id).unwrap();

        let again = store.load_or_create_run(&sim, 20.0).unwrap();
        assert_eq!(again.id, first.id);
        assert_eq!(again.current_time, 40.0);
        assert_eq!(again.current_iteration, 2);
        assert!(!again.is_fresh());

        store.mark_completed(first.id).unwrap();
        let fresh = store.load_or_create_run(&sim, 20.0).unwrap();
        assert_ne!(fresh.id, first.id);
        assert!(fresh.is_fresh());
    }

    #[test]
    fn test_unknown_simulation() {
        let mut store = seeded();
        let err = store.load_or_create_run(&Simulation::processed(5, 60.0), 20.0).unwrap_err();
        assert!(matches!(err, CalcError::SimulationNotFound(5)));
    }

    #[test]
    fn test_post_aggregate_replaces_summaries() {
        let mut store = seeded();
        let run = store.load_or_create_run(&Simulation::processed(1, 60.0), 20.0).unwrap();
        store.write_results(run.id, &[result(10, 0, 0.2), result(10, 1, 0.4), result(11, 0, 1.0)]).unwrap();

        store.post_aggregate(run.id).unwrap();
        store.post_aggregate(run.id).unwrap();

        let rows: Vec<_> = store.summaries(run.id).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].statistic_count, 2);
        assert!((rows[0].median_length - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_pending_simulations() {
        let mut store = seeded();
        store.insert_simulation(Simulation {
            id: 2,
            status: SimulationStatus::Running,
            end_time: None,
        });
        store.insert_simulation(Simulation::processed(3, 60.0)); // no messages

        let pending = store.pending_simulations().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, 1);

        let run = store.load_or_create_run(&pending[0], 20.0).unwrap();
        store.mark_completed(run.id).unwrap();
        assert!(store.pending_simulations().unwrap().is_empty());
    }
}
