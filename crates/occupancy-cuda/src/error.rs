//! Failures of the GPU benchmark.

use cudarc::driver::DriverError;
use cudarc::nvrtc::CompileError;
use occupancy_core::{TopologyError, WorkloadError};
use thiserror::Error;

/// Anything that stops a GPU mode from producing a measurement.
#[derive(Debug, Error)]
pub enum CudaError {
    /// A driver call failed.
    #[error("CUDA driver call failed: {0}")]
    Driver(#[from] DriverError),

    /// NVRTC rejected the kernel source.
    #[error("NVRTC compilation failed: {0}")]
    Compile(#[from] CompileError),

    /// Device properties are unusable as a topology.
    #[error("device topology: {0}")]
    Topology(#[from] TopologyError),

    /// Malformed matrix dimensions.
    #[error(transparent)]
    Workload(#[from] WorkloadError),

    /// Host buffer could not be allocated.
    #[error("failed to allocate {bytes} bytes of host memory")]
    HostAlloc { bytes: usize },

    /// Host data or a trace buffer does not match the expected shape.
    #[error("buffer shape mismatch: {0}")]
    DimensionMismatch(String),

    /// An entry point is missing from the loaded module.
    #[error("kernel entry point `{0}` not loaded")]
    KernelNotFound(String),
}

/// Result alias for the GPU benchmark.
pub type Result<T> = std::result::Result<T, CudaError>;
