//! Hardware-independent primitives for resource-occupancy benchmarks.
//!
//! Both benchmark programs share one shape:
//!
//! 1. a [`Topology`] reports how many physical and logical execution units exist,
//! 2. a placement strategy maps each worker onto one of those units,
//! 3. a runner times every placed worker inside a single bracket,
//! 4. the reporter turns the [`TimingSample`] into a [`Throughput`] figure.
//!
//! This crate holds the pieces of that pipeline that do not touch hardware, so
//! they can be tested against a [`FixedTopology`] stub.
//!
//! # Example
//!
//! ```
//! use occupancy_core::{FixedTopology, PlacementStrategy, LogicalMapping, Topology};
//!
//! let topology = FixedTopology::uniform(2, 2);
//! let plan = PlacementStrategy::Logical(LogicalMapping::Compat)
//!     .plan(&topology)
//!     .unwrap();
//!
//! assert_eq!(plan.len(), topology.logical_unit_count());
//! assert_eq!((plan[1].physical, plan[1].logical), (0, 1));
//! ```

mod error;
mod placement;
mod report;
mod timing;
mod topology;
mod trace;
mod verify;
mod workload;

pub use error::{MeasurementFault, PlacementError, TopologyError, WorkloadError};
pub use placement::{
    check_slot, compat_logical_slot, interleaved_logical_slot, LogicalMapping, Placement, PlacementStrategy,
    SmMode,
};
pub use report::Throughput;
pub use timing::TimingSample;
pub use topology::{validate_topology, FixedTopology, Topology};
pub use trace::{SmSpan, SmTraceRecord, Timeline, TraceLine};
pub use verify::{verify_constant_product, Mismatch, VerifyReport, RELATIVE_TOLERANCE};
pub use workload::{AccumulateWorkload, GemmWorkload, MatrixDims, DEFAULT_N_WORK};
