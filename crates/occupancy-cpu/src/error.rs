//! Error types for the CPU benchmark.

use std::time::Duration;

use occupancy_core::{MeasurementFault, PlacementError, TopologyError, WorkloadError};
use thiserror::Error;

/// Errors that can occur while running the CPU benchmark.
#[derive(Debug, Error)]
pub enum CpuBenchError {
    /// Topology discovery or validation failed.
    #[error(transparent)]
    Topology(#[from] TopologyError),

    /// A worker could not be placed on its unit.
    #[error(transparent)]
    Placement(#[from] PlacementError),

    /// Malformed workload descriptor.
    #[error(transparent)]
    Workload(#[from] WorkloadError),

    /// Timing sample could not be converted into throughput.
    #[error(transparent)]
    Measurement(#[from] MeasurementFault),

    /// The topology has no OS processor index for a slot.
    #[error("no OS processor index for physical unit {physical}, logical unit {logical}")]
    NoProcessorIndex { physical: usize, logical: usize },

    /// The OS refused to bind a worker thread.
    #[error("failed to bind worker {worker} to processor {os_index}")]
    Bind { worker: usize, os_index: usize },

    /// A worker thread could not be spawned.
    #[error("failed to spawn worker {worker}: {source}")]
    Spawn {
        worker: usize,
        #[source]
        source: std::io::Error,
    },

    /// A worker thread panicked.
    #[error("worker {0} panicked")]
    WorkerPanicked(usize),

    /// Not every worker finished within the bounded join.
    #[error("{finished} of {expected} workers finished within {waited:?}")]
    Timeout {
        waited: Duration,
        finished: usize,
        expected: usize,
    },
}

/// Result type for CPU benchmark operations.
pub type Result<T> = std::result::Result<T, CpuBenchError>;
