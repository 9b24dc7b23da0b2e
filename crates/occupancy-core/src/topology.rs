//! Topology provider contract.

use crate::error::TopologyError;

/// Counts of parallel execution units exposed by a piece of hardware.
///
/// A topology value is the explicitly owned context every query goes through.
/// Implementations are created once at startup and released by dropping them
/// (or through an inherent consuming `teardown`), so a query after teardown
/// cannot be expressed.
pub trait Topology {
    /// Number of top-level execution units (physical cores, or SMs).
    fn physical_unit_count(&self) -> usize;

    /// Number of finest-grained schedulable units across the whole device.
    fn logical_unit_count(&self) -> usize;

    /// Number of logical sub-units owned by `physical`.
    ///
    /// Returns `None` when `physical` is out of range. Arity may differ
    /// between physical units, so callers must not assume it is uniform.
    fn logical_units_of(&self, physical: usize) -> Option<usize>;
}

impl<T: Topology + ?Sized> Topology for &T {
    fn physical_unit_count(&self) -> usize {
        (**self).physical_unit_count()
    }

    fn logical_unit_count(&self) -> usize {
        (**self).logical_unit_count()
    }

    fn logical_units_of(&self, physical: usize) -> Option<usize> {
        (**self).logical_units_of(physical)
    }
}

/// Check the structural invariants every topology must satisfy.
///
/// - at least one physical unit,
/// - `physical_unit_count() <= logical_unit_count()`,
/// - the per-unit arities sum to `logical_unit_count()`.
pub fn validate_topology<T: Topology + ?Sized>(topology: &T) -> Result<(), TopologyError> {
    let physical = topology.physical_unit_count();
    let logical = topology.logical_unit_count();

    if physical == 0 {
        return Err(TopologyError::Empty);
    }
    if physical > logical {
        return Err(TopologyError::MorePhysicalThanLogical { physical, logical });
    }

    let arity_sum: usize = (0..physical)
        .map(|p| topology.logical_units_of(p).unwrap_or(0))
        .sum();
    if arity_sum != logical {
        return Err(TopologyError::ArityMismatch { arity_sum, logical });
    }

    Ok(())
}

/// A topology described by an explicit list of per-unit arities.
///
/// Used for crafted topologies in tests and for devices whose topology is
/// fully described by a count, such as the SM array of a GPU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedTopology {
    arities: Vec<usize>,
}

impl FixedTopology {
    /// Create a topology where physical unit `p` has `arities[p]` logical units.
    pub fn new(arities: Vec<usize>) -> Self {
        Self { arities }
    }

    /// `physical` units with `per_unit` logical units each.
    pub fn uniform(physical: usize, per_unit: usize) -> Self {
        Self::new(vec![per_unit; physical])
    }

    /// Per-unit arities, indexed by physical unit.
    pub fn arities(&self) -> &[usize] {
        &self.arities
    }
}

impl Topology for FixedTopology {
    fn physical_unit_count(&self) -> usize {
        self.arities.len()
    }

    fn logical_unit_count(&self) -> usize {
        self.arities.iter().sum()
    }

    fn logical_units_of(&self, physical: usize) -> Option<usize> {
        self.arities.get(physical).copied()
    }
}
