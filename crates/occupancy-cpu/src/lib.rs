//! Physical-versus-logical core throughput benchmark.
//!
//! A fixed integer accumulation loop is run once per worker, with workers
//! pinned either one per physical core or one per hardware thread. The whole
//! parallel region is timed as one bracket and converted into GOPS.
//!
//! ```ignore
//! use occupancy_cpu::{CoreAffinityBinder, HwlocTopology, ParallelRegion};
//! use occupancy_core::{AccumulateWorkload, PlacementStrategy};
//!
//! let topology = HwlocTopology::init()?;
//! let region = ParallelRegion::new(CoreAffinityBinder);
//! let outcome = region.run(&topology, PlacementStrategy::Physical, AccumulateWorkload::default())?;
//! println!("{}", outcome.throughput()?);
//! topology.teardown();
//! ```

mod affinity;
mod config;
mod error;
mod runner;
mod topology;
mod workload;

pub use affinity::{AffinityBinder, CoreAffinityBinder, CpuSlotResolver};
pub use config::{CpuArgs, StrategyChoice};
pub use error::{CpuBenchError, Result};
pub use runner::{ParallelRegion, RegionOutcome};
pub use topology::HwlocTopology;
pub use workload::accumulate;
