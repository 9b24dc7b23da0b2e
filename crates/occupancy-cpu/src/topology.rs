//! hwloc-backed topology provider.

use hwlocality::object::types::ObjectType;
use hwlocality::object::TopologyObject;
use occupancy_core::{validate_topology, Topology, TopologyError};
use tracing::{debug, info};

use crate::affinity::CpuSlotResolver;

/// Processor topology discovered through hwloc.
///
/// Owns the hwloc handle for the lifetime of the benchmark. Physical units are
/// hwloc `Core` objects, logical units are `PU` objects (hardware threads).
pub struct HwlocTopology {
    handle: hwlocality::Topology,
}

impl HwlocTopology {
    /// Discover the topology of the running machine.
    ///
    /// Fails if hwloc cannot build a topology or the result is inconsistent
    /// (no cores, or per-core thread counts that do not add up).
    pub fn init() -> Result<Self, TopologyError> {
        let handle =
            hwlocality::Topology::new().map_err(|e| TopologyError::Discovery(e.to_string()))?;
        let topology = Self { handle };
        validate_topology(&topology)?;

        info!(
            physical = topology.physical_unit_count(),
            logical = topology.logical_unit_count(),
            "discovered CPU topology"
        );
        for core in 0..topology.physical_unit_count() {
            debug!(core, arity = ?topology.logical_units_of(core), "core arity");
        }
        Ok(topology)
    }

    /// Release the hwloc handle.
    pub fn teardown(self) {
        drop(self.handle);
        debug!("CPU topology released");
    }

    fn core(&self, physical: usize) -> Option<&TopologyObject> {
        self.handle.objects_with_type(ObjectType::Core).nth(physical)
    }
}

impl Topology for HwlocTopology {
    fn physical_unit_count(&self) -> usize {
        self.handle.objects_with_type(ObjectType::Core).count()
    }

    fn logical_unit_count(&self) -> usize {
        self.handle.objects_with_type(ObjectType::PU).count()
    }

    fn logical_units_of(&self, physical: usize) -> Option<usize> {
        self.core(physical).map(|core| core.normal_children().count())
    }
}

impl CpuSlotResolver for HwlocTopology {
    fn os_index(&self, physical: usize, logical: usize) -> Option<usize> {
        self.core(physical)?
            .normal_children()
            .nth(logical)?
            .os_index()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topology_or_skip() -> Option<HwlocTopology> {
        match HwlocTopology::init() {
            Ok(topology) => Some(topology),
            Err(e) => {
                println!("hwloc topology not available ({e}), skipping test");
                None
            }
        }
    }

    #[test]
    fn test_discovered_topology_is_consistent() {
        let Some(topology) = topology_or_skip() else {
            return;
        };
        assert!(topology.physical_unit_count() >= 1);
        assert!(topology.physical_unit_count() <= topology.logical_unit_count());
        let sum: usize = (0..topology.physical_unit_count())
            .map(|p| topology.logical_units_of(p).unwrap())
            .sum();
        assert_eq!(sum, topology.logical_unit_count());
        assert_eq!(topology.logical_units_of(topology.physical_unit_count()), None);
        topology.teardown();
    }

    #[test]
    fn test_every_slot_has_os_index() {
        let Some(topology) = topology_or_skip() else {
            return;
        };
        for physical in 0..topology.physical_unit_count() {
            let arity = topology.logical_units_of(physical).unwrap();
            for logical in 0..arity {
                assert!(topology.os_index(physical, logical).is_some());
            }
            assert_eq!(topology.os_index(physical, arity), None);
        }
    }
}
