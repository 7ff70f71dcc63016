//! # Device Topology
//!
//! Resolves the local → group → world hierarchy of a simulation once per
//! run and freezes it into lookup tables.
//!
//! Resolution runs in two passes:
//! 1. Load every device and index the existing groups by `(name, id)`
//! 2. Walk the locals, creating any group that is referenced but missing,
//!    then create the world device if the simulation has none
//!
//! Device creation happens here and only here. Aggregation reads the
//! tables and never mutates them, so a topology change mid-run is not
//! picked up.

use std::collections::{BTreeMap, BTreeSet};

use cidstat_core::{CalcError, CalcResult, Device, DeviceId, DeviceStore, SimulationId};
use tracing::{debug, info};

/// Frozen hierarchy of one simulation
#[derive(Clone, Debug)]
pub struct DeviceTopology {
    simulation_id: SimulationId,
    locals: Vec<Device>,
    groups: BTreeSet<DeviceId>,
    local_to_group: BTreeMap<DeviceId, DeviceId>,
    participants: Vec<DeviceId>,
    world: DeviceId,
}

impl DeviceTopology {
    /// Load the hierarchy, creating missing group and world devices
    pub fn resolve<S: DeviceStore + ?Sized>(store: &mut S, simulation_id: SimulationId) -> CalcResult<Self> {
        let listing = store.load_devices(simulation_id)?;

        let mut group_index: BTreeMap<(String, u32), DeviceId> = listing
            .groups
            .iter()
            .filter_map(|g| g.group_key().map(|(name, id)| ((name.to_string(), id), g.id)))
            .collect();

        let mut local_to_group = BTreeMap::new();
        let mut participants = Vec::new();
        let mut created = 0usize;

        for local in &listing.locals {
            if local.is_person() {
                continue;
            }
            let Some((name, id)) = local.group_key() else {
                continue;
            };

            let group = match group_index.get(&(name.to_string(), id)) {
                Some(&group) => group,
                None => {
                    let group = store.create_group_device(simulation_id, name, id).map_err(|e| {
                        CalcError::topology(format!(
                            "creating group {}#{} for simulation {}: {}",
                            name, id, simulation_id, e
                        ))
                    })?;
                    debug!("Created group device {} for {}#{}", group, name, id);
                    group_index.insert((name.to_string(), id), group);
                    created += 1;
                    group
                }
            };

            local_to_group.insert(local.id, group);
            participants.push(local.id);
        }

        let world = match listing.world {
            Some(world) => world,
            None => {
                let world = store.create_world_device(simulation_id).map_err(|e| {
                    CalcError::topology(format!("creating world device for simulation {}: {}", simulation_id, e))
                })?;
                debug!("Created world device {}", world);
                world
            }
        };

        let topology = Self {
            simulation_id,
            locals: listing.locals,
            groups: group_index.into_values().collect(),
            local_to_group,
            participants,
            world,
        };

        info!(
            "Topology for simulation {}: {} locals ({} aggregated), {} groups ({} created), world {}",
            simulation_id,
            topology.locals.len(),
            topology.participants.len(),
            topology.groups.len(),
            created,
            topology.world
        );
        Ok(topology)
    }

    pub fn simulation_id(&self) -> SimulationId {
        self.simulation_id
    }

    /// Group a local device rolls up into, `None` for persons and unknown ids
    pub fn group_of(&self, local: DeviceId) -> Option<DeviceId> {
        self.local_to_group.get(&local).copied()
    }

    /// Locals whose observations are fetched and aggregated
    pub fn participants(&self) -> &[DeviceId] {
        &self.participants
    }

    pub fn groups(&self) -> &BTreeSet<DeviceId> {
        &self.groups
    }

    pub fn world(&self) -> DeviceId {
        self.world
    }

    /// All locals, persons included
    pub fn local_count(&self) -> usize {
        self.locals.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use cidstat_core::{DeviceListing, Simulation, PERSON_GROUP};

    fn store_with(devices: Vec<Device>) -> MemoryStore {
        let mut store = MemoryStore::new();
        store.insert_simulation(Simulation::processed(1, 100.0));
        for device in devices {
            store.insert_device(device);
        }
        store
    }

    #[test]
    fn test_creates_missing_groups_once() {
        let mut store = store_with(vec![
            Device::local(1, 1, "car", 7, 0),
            Device::local(2, 1, "car", 7, 1),
            Device::local(3, 1, "bike", 7, 0),
        ]);

        let topology = DeviceTopology::resolve(&mut store, 1).unwrap();

        assert_eq!(topology.groups().len(), 2);
        assert_eq!(topology.group_of(1), topology.group_of(2));
        assert_ne!(topology.group_of(1), topology.group_of(3));
        assert_eq!(topology.participants(), &[1, 2, 3]);

        let listing = store.load_devices(1).unwrap();
        assert_eq!(listing.groups.len(), 2);
        assert_eq!(listing.world, Some(topology.world()));
    }

    #[test]
    fn test_reuses_existing_devices() {
        let mut store = store_with(vec![
            Device::local(1, 1, "car", 7, 0),
            Device::group(5, 1, "car", 7),
            Device::world(6, 1),
        ]);

        let topology = DeviceTopology::resolve(&mut store, 1).unwrap();

        assert_eq!(topology.group_of(1), Some(5));
        assert_eq!(topology.world(), 6);
        assert_eq!(store.devices(1).count(), 3);
    }

    #[test]
    fn test_persons_are_excluded() {
        let mut store = store_with(vec![
            Device::local(1, 1, PERSON_GROUP, 1, 0),
            Device::local(2, 1, "car", 1, 0),
        ]);

        let topology = DeviceTopology::resolve(&mut store, 1).unwrap();

        assert_eq!(topology.group_of(1), None);
        assert_eq!(topology.participants(), &[2]);
        assert_eq!(topology.local_count(), 2);
        // No "person" group was created
        assert_eq!(topology.groups().len(), 1);
    }

    #[test]
    fn test_resolving_twice_is_stable() {
        let mut store = store_with(vec![Device::local(1, 1, "car", 7, 0)]);

        let first = DeviceTopology::resolve(&mut store, 1).unwrap();
        let second = DeviceTopology::resolve(&mut store, 1).unwrap();

        assert_eq!(first.group_of(1), second.group_of(1));
        assert_eq!(first.world(), second.world());
    }

    struct ReadOnlyDevices(DeviceListing);

    impl DeviceStore for ReadOnlyDevices {
        fn load_devices(&mut self, _: SimulationId) -> CalcResult<DeviceListing> {
            Ok(self.0.clone())
        }

        fn create_group_device(&mut self, _: SimulationId, _: &str, _: u32) -> CalcResult<DeviceId> {
            Err(CalcError::persistence("read-only"))
        }

        fn create_world_device(&mut self, _: SimulationId) -> CalcResult<DeviceId> {
            Err(CalcError::persistence("read-only"))
        }
    }

    #[test]
    fn test_creation_failure_is_a_topology_error() {
        let mut store = ReadOnlyDevices(DeviceListing::from_devices(vec![Device::local(1, 1, "car", 7, 0)]));
        let err = DeviceTopology::resolve(&mut store, 1).unwrap_err();
        assert!(matches!(err, CalcError::TopologyResolution(_)));

        let mut no_world = ReadOnlyDevices(DeviceListing::default());
        let err = DeviceTopology::resolve(&mut no_world, 1).unwrap_err();
        assert!(matches!(err, CalcError::TopologyResolution(_)));
    }
}
