//! # Devices - The Aggregation Hierarchy
//!
//! Three levels, narrowest to broadest:
//!
//! - **Local**: a simulated receiver, belongs to one group by `(group_name, group_id)`
//! - **Group**: pools the observations of its locals
//! - **World**: one per simulation, pools every group
//!
//! Locals in the `"person"` group are carried around but never aggregated.

use serde::{Deserialize, Serialize};

pub type DeviceId = u32;
pub type SimulationId = u32;

/// Group name of devices that take no part in group/world aggregation
pub const PERSON_GROUP: &str = "person";

/// Which level of the hierarchy a device lives on
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceKind {
    Local {
        group_name: String,
        group_id: u32,
        local_id: u32,
    },
    Group {
        group_name: String,
        group_id: u32,
    },
    World,
}

/// A device row
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub simulation_id: SimulationId,
    pub kind: DeviceKind,
}

impl Device {
    pub fn local(id: DeviceId, simulation_id: SimulationId, group_name: impl Into<String>, group_id: u32, local_id: u32) -> Self {
        Self {
            id,
            simulation_id,
            kind: DeviceKind::Local {
                group_name: group_name.into(),
                group_id,
                local_id,
            },
        }
    }

    pub fn group(id: DeviceId, simulation_id: SimulationId, group_name: impl Into<String>, group_id: u32) -> Self {
        Self {
            id,
            simulation_id,
            kind: DeviceKind::Group {
                group_name: group_name.into(),
                group_id,
            },
        }
    }

    pub fn world(id: DeviceId, simulation_id: SimulationId) -> Self {
        Self {
            id,
            simulation_id,
            kind: DeviceKind::World,
        }
    }

    /// `(group_name, group_id)` for locals and groups, `None` for the world
    pub fn group_key(&self) -> Option<(&str, u32)> {
        match &self.kind {
            DeviceKind::Local { group_name, group_id, .. } | DeviceKind::Group { group_name, group_id } => {
                Some((group_name.as_str(), *group_id))
            }
            DeviceKind::World => None,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self.kind, DeviceKind::Local { .. })
    }

    /// Persons are tracked but excluded from grouping
    pub fn is_person(&self) -> bool {
        matches!(&self.kind, DeviceKind::Local { group_name, .. } if group_name == PERSON_GROUP)
    }
}

/// All devices of one simulation, split by level
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceListing {
    pub locals: Vec<Device>,
    pub groups: Vec<Device>,
    pub world: Option<DeviceId>,
}

impl DeviceListing {
    /// Sort a flat device list into levels
    ///
    /// If several world rows exist the last one wins.
    pub fn from_devices(devices: impl IntoIterator<Item = Device>) -> Self {
        let mut listing = Self::default();
        for device in devices {
            match device.kind {
                DeviceKind::Local { .. } => listing.locals.push(device),
                DeviceKind::Group { .. } => listing.groups.push(device),
                DeviceKind::World => listing.world = Some(device.id),
            }
        }
        listing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_splits_levels() {
        let listing = DeviceListing::from_devices(vec![
            Device::local(1, 7, "car", 3, 0),
            Device::group(2, 7, "car", 3),
            Device::world(3, 7),
            Device::local(4, 7, PERSON_GROUP, 1, 0),
        ]);

        assert_eq!(listing.locals.len(), 2);
        assert_eq!(listing.groups.len(), 1);
        assert_eq!(listing.world, Some(3));
    }

    #[test]
    fn test_person_and_group_key() {
        let person = Device::local(1, 1, PERSON_GROUP, 9, 0);
        let car = Device::local(2, 1, "car", 9, 1);

        assert!(person.is_person());
        assert!(!car.is_person());
        assert_eq!(car.group_key(), Some(("car", 9)));
        assert_eq!(Device::world(3, 1).group_key(), None);
        assert!(!Device::group(4, 1, PERSON_GROUP, 9).is_person());
    }
}
