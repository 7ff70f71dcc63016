//! Durable store: a [`MemoryStore`] snapshot persisted with bincode
//!
//! Every mutating call rewrites the snapshot before returning, so a
//! checkpoint is on disk by the time the controller moves on. Writes go to
//! a sibling temp file that is renamed over the snapshot.

use std::fs;
use std::path::{Path, PathBuf};

use cidstat_core::{
    CalcError, CalcResult, CalculationId, CalculationRun, CalculationStore, Device, DeviceId,
    DeviceListing, DeviceObservation, DeviceStore, ObservationSource, Simulation,
    SimulationCatalog, SimulationId, StatisticResult, TimeWindow,
};
use serde::{Deserialize, Serialize};

use super::memory::{MemoryStore, STORE_VERSION};

/// Simulation data as exported by the message generator
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub simulations: Vec<Simulation>,
    #[serde(default)]
    pub devices: Vec<Device>,
    /// Received messages, in reception order
    #[serde(default)]
    pub messages: Vec<DeviceObservation>,
}

pub struct FileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl FileStore {
    /// Open the snapshot at `path`, or start an empty store if there is none
    ///
    /// A snapshot that exists but cannot be decoded is an error: starting
    /// fresh would silently drop every checkpoint.
    pub fn open(path: impl Into<PathBuf>) -> CalcResult<Self> {
        let path = path.into();
        if !path.exists() {
            tracing::info!("Creating new store at {}", path.display());
            return Ok(Self {
                path,
                inner: MemoryStore::new(),
            });
        }

        let data = fs::read(&path)?;
        let inner: MemoryStore = bincode::deserialize(&data)
            .map_err(|e| CalcError::serialization(format!("{} is corrupted: {}", path.display(), e)))?;
        if inner.version != STORE_VERSION {
            return Err(CalcError::serialization(format!(
                "{} has store version {}, expected {}",
                path.display(),
                inner.version,
                STORE_VERSION
            )));
        }

        tracing::info!(
            "Store loaded from {}: {} messages",
            path.display(),
            inner.message_count()
        );
        Ok(Self { path, inner })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read-only view of the snapshot
    pub fn snapshot(&self) -> &MemoryStore {
        &self.inner
    }

    /// Write the snapshot to disk
    pub fn save(&self) -> CalcResult<()> {
        // Create parent directories if needed
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let data = bincode::serialize(&self.inner).map_err(|e| CalcError::serialization(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, data)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Merge a JSON fixture into the store and save
    pub fn import_json(&mut self, path: &Path) -> CalcResult<()> {
        let content = fs::read_to_string(path)?;
        let fixture: Fixture = serde_json::from_str(&content)
            .map_err(|e| CalcError::serialization(format!("{}: {}", path.display(), e)))?;

        tracing::info!(
            "Importing {} simulations, {} devices, {} messages from {}",
            fixture.simulations.len(),
            fixture.devices.len(),
            fixture.messages.len(),
            path.display()
        );
        self.apply(fixture);
        self.save()
    }

    fn apply(&mut self, fixture: Fixture) {
        for simulation in fixture.simulations {
            self.inner.insert_simulation(simulation);
        }
        for device in fixture.devices {
            self.inner.insert_device(device);
        }
        for message in fixture.messages {
            self.inner.push_message(message.device_id, message.observation);
        }
    }

    /// Run a mutation and persist it
    fn commit<T>(&mut self, op: impl FnOnce(&mut MemoryStore) -> CalcResult<T>) -> CalcResult<T> {
        let value = op(&mut self.inner)?;
        self.save()
            .map_err(|e| CalcError::persistence(format!("saving {}: {}", self.path.display(), e)))?;
        Ok(value)
    }
}

impl DeviceStore for FileStore {
    fn load_devices(&mut self, simulation_id: SimulationId) -> CalcResult<DeviceListing> {
        self.inner.load_devices(simulation_id)
    }

    fn create_group_device(&mut self, simulation_id: SimulationId, group_name: &str, group_id: u32) -> CalcResult<DeviceId> {
        self.commit(|s| s.create_group_device(simulation_id, group_name, group_id))
    }

    fn create_world_device(&mut self, simulation_id: SimulationId) -> CalcResult<DeviceId> {
        self.commit(|s| s.create_world_device(simulation_id))
    }
}

impl ObservationSource for FileStore {
    fn fetch_observations(&mut self, device_ids: &[DeviceId], window: TimeWindow) -> CalcResult<Vec<DeviceObservation>> {
        self.inner.fetch_observations(device_ids, window)
    }
}

impl CalculationStore for FileStore {
    fn load_or_create_run(&mut self, simulation: &Simulation, timestep_seconds: f64) -> CalcResult<CalculationRun> {
        self.commit(|s| s.load_or_create_run(simulation, timestep_seconds))
    }

    fn write_results(&mut self, calculation_id: CalculationId, results: &[StatisticResult]) -> CalcResult<()> {
        self.commit(|s| s.write_results(calculation_id, results))
    }

    fn checkpoint(&mut self, calculation_id: CalculationId, current_time: f64, current_iteration: u64) -> CalcResult<()> {
        self.commit(|s| s.checkpoint(calculation_id, current_time, current_iteration))
    }

    fn mark_completed(&mut self, calculation_id: CalculationId) -> CalcResult<()> {
        self.commit(|s| s.mark_completed(calculation_id))
    }

    fn mark_failed(&mut self, calculation_id: CalculationId) -> CalcResult<()> {
        self.commit(|s| s.mark_failed(calculation_id))
    }

    fn post_aggregate(&mut self, calculation_id: CalculationId) -> CalcResult<()> {
        self.commit(|s| s.post_aggregate(calculation_id))
    }
}

impl SimulationCatalog for FileStore {
    fn pending_simulations(&mut self) -> CalcResult<Vec<Simulation>> {
        self.inner.pending_simulations()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cidstat_core::{Observation, RunStatus};
    use tempfile::tempdir;

    const FIXTURE: &str = r#"{
        "simulations": [ { "id": 4, "status": "Processed", "end_time": 40.0 } ],
        "devices": [
            { "id": 1, "simulation_id": 4, "kind": { "Local": { "group_name": "car", "group_id": 2, "local_id": 0 } } },
            { "id": 2, "simulation_id": 4, "kind": "World" }
        ],
        "messages": [
            { "device_id": 1, "observation": { "emitter_id": 9, "package_id": 1, "value": 12, "timestamp": 3.5, "distance": 1.25 } }
        ]
    }"#;

    #[test]
    fn test_save_and_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("test.store");

        let mut store = FileStore::open(&path).unwrap();
        let sim = Simulation::processed(1, 20.0);
        store.inner.insert_simulation(sim.clone());
        store.inner.push_message(1, Observation::new(1, 1, 42, 0.5));
        let run = store.load_or_create_run(&sim, 20.0).unwrap();
        store.checkpoint(run.id, 20.0, 1).unwrap();

        let reopened = FileStore::open(&path).unwrap();
        let loaded = reopened.snapshot().calculation(run.id).unwrap();
        assert_eq!(loaded.current_iteration, 1);
        assert_eq!(loaded.status, RunStatus::Started);
        assert_eq!(reopened.snapshot().message_count(), 1);
    }

    #[test]
    fn test_corrupted_snapshot_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.store");
        fs::write(&path, b"definitely not bincode").unwrap();

        assert!(matches!(FileStore::open(&path), Err(CalcError::Serialization(_))));
    }

    #[test]
    fn test_import_json() {
        let dir = tempdir().unwrap();
        let fixture = dir.path().join("sim.json");
        fs::write(&fixture, FIXTURE).unwrap();

        let mut store = FileStore::open(dir.path().join("cidstat.store")).unwrap();
        store.import_json(&fixture).unwrap();

        let listing = store.load_devices(4).unwrap();
        assert_eq!(listing.locals.len(), 1);
        assert_eq!(listing.world, Some(2));
        assert_eq!(store.pending_simulations().unwrap().len(), 1);

        let fetched = store.fetch_observations(&[1], TimeWindow::new(0.0, 20.0)).unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].observation.distance, 1.25);
        assert!(store.path().exists());
    }
}
