//! Placement strategies: which execution unit each worker runs on.

use std::fmt;
use std::str::FromStr;

use crate::error::PlacementError;
use crate::topology::Topology;

/// Where one worker of a parallel region runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Placement {
    /// Worker index inside the parallel region.
    pub worker: usize,
    /// Physical unit the worker is bound to.
    pub physical: usize,
    /// Logical sub-unit, relative to `physical`.
    pub logical: usize,
}

/// Slot of worker `worker` under the compat logical mapping.
///
/// `physical = worker / physical_count`, `logical = worker % physical_count`.
/// This exact formula is what earlier measurements were taken with, so it is
/// kept bit-for-bit for comparability even though it only fits topologies
/// whose per-core arity equals the core count.
#[inline]
pub fn compat_logical_slot(worker: usize, physical_count: usize) -> (usize, usize) {
    (worker / physical_count, worker % physical_count)
}

/// Slot of worker `worker` under the interleaved logical mapping.
///
/// Visits every physical unit once before reusing a unit's additional slots:
/// `physical = worker % physical_count`, `logical = worker / physical_count`.
#[inline]
pub fn interleaved_logical_slot(worker: usize, physical_count: usize) -> (usize, usize) {
    (worker % physical_count, worker / physical_count)
}

/// How logical-placement workers are spread over the topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogicalMapping {
    /// [`compat_logical_slot`].
    #[default]
    Compat,
    /// [`interleaved_logical_slot`].
    Interleaved,
}

impl LogicalMapping {
    /// Resolve the `(physical, logical)` slot of `worker`.
    pub fn slot(self, worker: usize, physical_count: usize) -> (usize, usize) {
        match self {
            LogicalMapping::Compat => compat_logical_slot(worker, physical_count),
            LogicalMapping::Interleaved => interleaved_logical_slot(worker, physical_count),
        }
    }
}

impl FromStr for LogicalMapping {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "compat" => Ok(LogicalMapping::Compat),
            "interleaved" => Ok(LogicalMapping::Interleaved),
            other => Err(format!(
                "unknown logical mapping '{other}' (expected compat or interleaved)"
            )),
        }
    }
}

/// CPU placement strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementStrategy {
    /// One worker per physical unit, each on logical slot 0.
    Physical,
    /// One worker per logical unit.
    Logical(LogicalMapping),
}

impl PlacementStrategy {
    /// Short name used in reports.
    pub fn name(&self) -> &'static str {
        match self {
            PlacementStrategy::Physical => "physical",
            PlacementStrategy::Logical(_) => "logical",
        }
    }

    /// Number of concurrent workers this strategy launches.
    pub fn worker_count<T: Topology + ?Sized>(&self, topology: &T) -> usize {
        match self {
            PlacementStrategy::Physical => topology.physical_unit_count(),
            PlacementStrategy::Logical(_) => topology.logical_unit_count(),
        }
    }

    /// Placement of `worker`, validated against the topology.
    pub fn place<T: Topology + ?Sized>(
        &self,
        topology: &T,
        worker: usize,
    ) -> Result<Placement, PlacementError> {
        let (physical, logical) = match self {
            PlacementStrategy::Physical => (worker, 0),
            PlacementStrategy::Logical(mapping) => {
                mapping.slot(worker, topology.physical_unit_count())
            }
        };
        check_slot(topology, physical, logical)?;
        Ok(Placement {
            worker,
            physical,
            logical,
        })
    }

    /// Placements for every worker, in worker order.
    ///
    /// Fails on the first worker whose slot does not exist; no partial plan is
    /// returned because a partial measurement is meaningless.
    pub fn plan<T: Topology + ?Sized>(&self, topology: &T) -> Result<Vec<Placement>, PlacementError> {
        let plan = (0..self.worker_count(topology))
            .map(|worker| self.place(topology, worker))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(strategy = self.name(), workers = plan.len(), "placement planned");
        Ok(plan)
    }
}

/// Verify that `(physical, logical)` names an existing unit.
///
/// The logical index is checked against the arity of that specific physical
/// unit, not a global maximum.
pub fn check_slot<T: Topology + ?Sized>(
    topology: &T,
    physical: usize,
    logical: usize,
) -> Result<(), PlacementError> {
    let arity = topology
        .logical_units_of(physical)
        .ok_or_else(|| PlacementError::PhysicalIndexOutOfRange {
            physical,
            count: topology.physical_unit_count(),
        })?;
    if logical >= arity {
        return Err(PlacementError::LogicalIndexOutOfRange {
            physical,
            logical,
            arity,
        });
    }
    Ok(())
}

/// GPU placement modes.
///
/// The per-SM modes launch single-block kernels on independent streams. The
/// driver decides which SM runs each block; "two per SM" is requested
/// oversubscription via stream count, not an enforced SM affinity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SmMode {
    /// One kernel whose grid covers the whole output.
    Baseline,
    /// One single-block kernel per SM, each on its own stream.
    OnePerSm,
    /// Two single-block kernels per SM, each on its own stream.
    TwoPerSm,
}

impl SmMode {
    /// All modes, in the order they are benchmarked.
    pub const ALL: [SmMode; 3] = [SmMode::Baseline, SmMode::OnePerSm, SmMode::TwoPerSm];

    /// Name used in reports and trace lines. Contains no whitespace.
    pub fn name(&self) -> &'static str {
        match self {
            SmMode::Baseline => "baseline",
            SmMode::OnePerSm => "one-per-sm",
            SmMode::TwoPerSm => "two-per-sm",
        }
    }

    /// Number of independent kernels (and streams, and buffer triples).
    pub fn concurrency(&self, sm_count: usize) -> usize {
        match self {
            SmMode::Baseline => 1,
            SmMode::OnePerSm => sm_count,
            SmMode::TwoPerSm => 2 * sm_count,
        }
    }

    /// Whether each kernel is launched as a single block.
    pub fn single_block(&self) -> bool {
        !matches!(self, SmMode::Baseline)
    }
}

impl fmt::Display for SmMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SmMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SmMode::ALL
            .into_iter()
            .find(|mode| mode.name() == s)
            .ok_or_else(|| {
                format!("unknown mode '{s}' (expected baseline, one-per-sm or two-per-sm)")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::FixedTopology;
    use proptest::prelude::*;

    #[test]
    fn test_physical_plan_uses_slot_zero() {
        let topo = FixedTopology::new(vec![2, 2, 1]);
        let plan = PlacementStrategy::Physical.plan(&topo).unwrap();
        assert_eq!(plan.len(), 3);
        for (i, p) in plan.iter().enumerate() {
            assert_eq!(p.worker, i);
            assert_eq!(p.physical, i);
            assert_eq!(p.logical, 0);
        }
    }

    #[test]
    fn test_compat_plan_two_by_two() {
        // The one shape where the compat mapping covers every slot.
        let topo = FixedTopology::uniform(2, 2);
        let plan = PlacementStrategy::Logical(LogicalMapping::Compat)
            .plan(&topo)
            .unwrap();
        let slots: Vec<_> = plan.iter().map(|p| (p.physical, p.logical)).collect();
        assert_eq!(slots, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    }

    #[test]
    fn test_compat_plan_fails_on_smt2_quad_core() {
        // Worker 2 maps to (0, 2) but core 0 only has two hardware threads.
        let topo = FixedTopology::uniform(4, 2);
        let err = PlacementStrategy::Logical(LogicalMapping::Compat)
            .plan(&topo)
            .unwrap_err();
        assert_eq!(
            err,
            PlacementError::LogicalIndexOutOfRange {
                physical: 0,
                logical: 2,
                arity: 2
            }
        );
    }

    #[test]
    fn test_interleaved_plan_covers_every_slot() {
        let topo = FixedTopology::uniform(4, 2);
        let plan = PlacementStrategy::Logical(LogicalMapping::Interleaved)
            .plan(&topo)
            .unwrap();
        let slots: Vec<_> = plan.iter().map(|p| (p.physical, p.logical)).collect();
        assert_eq!(
            slots,
            vec![
                (0, 0),
                (1, 0),
                (2, 0),
                (3, 0),
                (0, 1),
                (1, 1),
                (2, 1),
                (3, 1)
            ]
        );
    }

    #[test]
    fn test_logical_index_beyond_arity_one() {
        let topo = FixedTopology::uniform(2, 1);
        assert_eq!(
            check_slot(&topo, 0, 1),
            Err(PlacementError::LogicalIndexOutOfRange {
                physical: 0,
                logical: 1,
                arity: 1
            })
        );
        assert!(check_slot(&topo, 1, 0).is_ok());
    }

    #[test]
    fn test_physical_index_out_of_range() {
        let topo = FixedTopology::uniform(1, 2);
        assert_eq!(
            check_slot(&topo, 1, 0),
            Err(PlacementError::PhysicalIndexOutOfRange {
                physical: 1,
                count: 1
            })
        );
    }

    #[test]
    fn test_heterogeneous_arity_checked_per_unit() {
        let topo = FixedTopology::new(vec![2, 1]);
        assert!(check_slot(&topo, 0, 1).is_ok());
        assert!(check_slot(&topo, 1, 1).is_err());
    }

    #[test]
    fn test_logical_mapping_from_str() {
        assert_eq!("compat".parse::<LogicalMapping>(), Ok(LogicalMapping::Compat));
        assert_eq!("interleaved".parse::<LogicalMapping>(), Ok(LogicalMapping::Interleaved));
        assert!("round".parse::<LogicalMapping>().is_err());
    }

    #[test]
    fn test_sm_mode_concurrency() {
        assert_eq!(SmMode::Baseline.concurrency(80), 1);
        assert_eq!(SmMode::OnePerSm.concurrency(80), 80);
        assert_eq!(SmMode::TwoPerSm.concurrency(80), 160);
        assert!(!SmMode::Baseline.single_block());
        assert!(SmMode::TwoPerSm.single_block());
    }

    #[test]
    fn test_sm_mode_names_round_trip() {
        for mode in SmMode::ALL {
            assert!(!mode.name().contains(char::is_whitespace));
            assert_eq!(mode.to_string().parse::<SmMode>(), Ok(mode));
        }
        assert!("three-per-sm".parse::<SmMode>().is_err());
    }

    fn physical_counts() -> impl Strategy<Value = (usize, usize)> {
        (prop::sample::select(vec![1usize, 2, 4, 8, 16]), 1usize..=4)
            .prop_map(|(p, multiple)| (p, p * multiple))
    }

    proptest! {
        #[test]
        fn prop_compat_mapping_formula((physical, logical) in physical_counts()) {
            for worker in 0..logical {
                let (p, l) = compat_logical_slot(worker, physical);
                prop_assert_eq!(p, worker / physical);
                prop_assert_eq!(l, worker % physical);
                prop_assert_eq!(LogicalMapping::Compat.slot(worker, physical), (p, l));
            }
        }

        #[test]
        fn prop_compat_plan_matches_formula_when_it_fits((physical, _logical) in physical_counts()) {
            // A square topology (arity == core count) is exactly what the
            // compat mapping covers.
            let topo = FixedTopology::uniform(physical, physical);
            let plan = PlacementStrategy::Logical(LogicalMapping::Compat).plan(&topo).unwrap();
            prop_assert_eq!(plan.len(), physical * physical);
            for p in plan {
                prop_assert_eq!(p.physical, p.worker / physical);
                prop_assert_eq!(p.logical, p.worker % physical);
            }
        }

        #[test]
        fn prop_interleaved_plan_is_a_bijection((physical, logical) in physical_counts()) {
            let topo = FixedTopology::uniform(physical, logical / physical);
            let plan = PlacementStrategy::Logical(LogicalMapping::Interleaved).plan(&topo).unwrap();
            let mut seen = std::collections::HashSet::new();
            for p in &plan {
                prop_assert!(seen.insert((p.physical, p.logical)));
            }
            prop_assert_eq!(seen.len(), logical);
        }
    }
}
