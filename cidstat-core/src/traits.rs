//! # Traits - The Persistence Boundary
//!
//! The calculator never touches storage directly. Everything it reads or
//! writes goes through these traits, so the same engine runs against an
//! in-memory store in tests and a durable store in production.
//!
//! ## Key Traits
//!
//! - `DeviceStore`: Device rows and lazy creation of groups/world
//! - `ObservationSource`: Received messages for a time window
//! - `CalculationStore`: Runs, checkpoints and result rows
//! - `SimulationCatalog`: Which simulations are waiting for a calculation

use crate::device::{DeviceId, DeviceListing, SimulationId};
use crate::error::CalcResult;
use crate::observation::{DeviceObservation, TimeWindow};
use crate::run::{CalculationId, CalculationRun, Simulation};
use crate::statistic::StatisticResult;

/// Device rows of a simulation
pub trait DeviceStore {
    /// All devices of a simulation, split by level
    fn load_devices(&mut self, simulation_id: SimulationId) -> CalcResult<DeviceListing>;

    /// Persist a new group device and return its id
    fn create_group_device(&mut self, simulation_id: SimulationId, group_name: &str, group_id: u32) -> CalcResult<DeviceId>;

    /// Persist the world device of a simulation and return its id
    fn create_world_device(&mut self, simulation_id: SimulationId) -> CalcResult<DeviceId>;
}

/// Received messages
pub trait ObservationSource {
    /// Observations received by any of `device_ids` with a timestamp in `window`
    fn fetch_observations(&mut self, device_ids: &[DeviceId], window: TimeWindow) -> CalcResult<Vec<DeviceObservation>>;
}

/// Calculation runs and their results
pub trait CalculationStore {
    /// Resume the latest started/failed run of a simulation, or register a new one
    fn load_or_create_run(&mut self, simulation: &Simulation, timestep_seconds: f64) -> CalcResult<CalculationRun>;

    /// Upsert results keyed by `(calculation_id, device_id, iteration)`
    fn write_results(&mut self, calculation_id: CalculationId, results: &[StatisticResult]) -> CalcResult<()>;

    /// Durably record the last completed timestep
    fn checkpoint(&mut self, calculation_id: CalculationId, current_time: f64, current_iteration: u64) -> CalcResult<()>;

    fn mark_completed(&mut self, calculation_id: CalculationId) -> CalcResult<()>;

    fn mark_failed(&mut self, calculation_id: CalculationId) -> CalcResult<()>;

    /// Compute and store per-device summaries over all results of the run
    fn post_aggregate(&mut self, calculation_id: CalculationId) -> CalcResult<()>;
}

/// Simulations waiting for a calculation
pub trait SimulationCatalog {
    /// Processed simulations with messages and no completed calculation, oldest first
    fn pending_simulations(&mut self) -> CalcResult<Vec<Simulation>>;
}

/// Everything the run controller needs
pub trait SimulationStore: DeviceStore + ObservationSource + CalculationStore {}

impl<T: DeviceStore + ObservationSource + CalculationStore> SimulationStore for T {}
