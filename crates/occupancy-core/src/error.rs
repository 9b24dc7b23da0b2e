//! Error types shared by both benchmark programs.

use thiserror::Error;

/// Errors raised while discovering or validating a hardware topology.
///
/// Every variant is fatal: there is no degraded mode in which a benchmark can
/// produce meaningful numbers without a consistent topology.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopologyError {
    /// The discovery backend could not produce a topology.
    #[error("topology discovery failed: {0}")]
    Discovery(String),

    /// No physical units were reported.
    #[error("topology reports no physical units")]
    Empty,

    /// More physical units than logical units were reported.
    #[error("topology reports {physical} physical units but only {logical} logical units")]
    MorePhysicalThanLogical { physical: usize, logical: usize },

    /// Per-unit arities do not add up to the logical unit count.
    #[error("per-core arities sum to {arity_sum}, expected {logical} logical units")]
    ArityMismatch { arity_sum: usize, logical: usize },
}

/// Errors raised when a worker cannot be placed on the requested unit.
///
/// These signal a topology/strategy mismatch that invalidates the whole
/// measurement, so callers terminate on them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlacementError {
    /// Physical unit index beyond the number of physical units.
    #[error("physical unit index {physical} beyond {count} physical units")]
    PhysicalIndexOutOfRange { physical: usize, count: usize },

    /// Logical index beyond the arity of its physical unit.
    #[error("logical core index {logical} beyond arity {arity} of physical unit {physical}")]
    LogicalIndexOutOfRange {
        physical: usize,
        logical: usize,
        arity: usize,
    },
}

/// Errors raised when a workload descriptor is malformed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkloadError {
    /// Inner dimensions of the multiply disagree.
    #[error("outer matrix dimensions must match: wA ({wa}) != hB ({hb})")]
    DimensionMismatch { wa: usize, hb: usize },

    /// A matrix dimension is zero.
    #[error("matrix dimensions must be non-zero, got {width}x{height}")]
    EmptyMatrix { width: usize, height: usize },

    /// The CPU workload has no iterations.
    #[error("workload iteration count must be non-zero")]
    NoWork,
}

/// A timing sample that cannot be turned into a throughput figure.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MeasurementFault {
    /// Elapsed time was zero or negative.
    #[error("non-positive elapsed time: {0} s")]
    NonPositiveElapsed(f64),

    /// Elapsed time was NaN or infinite.
    #[error("non-finite elapsed time: {0} s")]
    NonFiniteElapsed(f64),

    /// The sample brackets no iterations.
    #[error("timing sample covers zero iterations")]
    NoIterations,

    /// The operation count was zero, which cannot give a positive throughput.
    #[error("operation count is zero")]
    NoOperations,
}
