//! Binding worker threads to hardware threads.

use core_affinity::CoreId;
use occupancy_core::{FixedTopology, Topology};

/// A topology that can name the OS processor behind each slot.
pub trait CpuSlotResolver: Topology {
    /// OS processor index of logical unit `logical` of physical unit `physical`.
    fn os_index(&self, physical: usize, logical: usize) -> Option<usize>;
}

/// Crafted topologies number processors core by core.
impl CpuSlotResolver for FixedTopology {
    fn os_index(&self, physical: usize, logical: usize) -> Option<usize> {
        let arity = *self.arities().get(physical)?;
        (logical < arity).then(|| self.arities()[..physical].iter().sum::<usize>() + logical)
    }
}

/// Pins the calling thread to one OS processor.
pub trait AffinityBinder: Send + Sync + 'static {
    /// Returns `false` if the OS refused the binding.
    fn bind_current(&self, os_index: usize) -> bool;
}

/// Thread affinity through `core_affinity`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoreAffinityBinder;

impl AffinityBinder for CoreAffinityBinder {
    fn bind_current(&self, os_index: usize) -> bool {
        core_affinity::set_for_current(CoreId { id: os_index })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fixed_topology_os_indices() {
        let topo = FixedTopology::new(vec![2, 1, 2]);
        assert_eq!(topo.os_index(0, 0), Some(0));
        assert_eq!(topo.os_index(0, 1), Some(1));
        assert_eq!(topo.os_index(1, 0), Some(2));
        assert_eq!(topo.os_index(1, 1), None);
        assert_eq!(topo.os_index(2, 1), Some(4));
        assert_eq!(topo.os_index(3, 0), None);
    }

    proptest! {
        #[test]
        fn prop_slots_cover_processors_once(arities in prop::collection::vec(1usize..5, 1..12)) {
            let topo = FixedTopology::new(arities.clone());
            let mut seen = Vec::new();
            for (physical, &arity) in arities.iter().enumerate() {
                for logical in 0..arity {
                    seen.push(topo.os_index(physical, logical).unwrap());
                }
                prop_assert_eq!(topo.os_index(physical, arity), None);
            }
            let expected: Vec<usize> = (0..topo.logical_unit_count()).collect();
            prop_assert_eq!(seen, expected);
        }
    }
}
