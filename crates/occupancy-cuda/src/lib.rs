//! Per-SM occupancy benchmark for a tiled CUDA matrix multiply.
//!
//! The same multiply `C = A * B` is timed in three modes:
//!
//! - **baseline**: one kernel whose grid has one block per output tile,
//! - **one-per-sm**: one single-block kernel per SM, each on its own stream
//!   and with private buffers,
//! - **two-per-sm**: as above with two kernels per SM.
//!
//! Each mode is bracketed by device events on the default stream, into which
//! every worker stream is joined before the stop event.
//!
//! # Usage
//!
//! ```ignore
//! use occupancy_cuda::{CudaContext, SmBenchmark, DEFAULT_ITERATIONS};
//! use occupancy_core::{GemmWorkload, SmMode};
//!
//! let ctx = CudaContext::new()?;
//! let bench = SmBenchmark::new(&ctx, GemmWorkload::default(), DEFAULT_ITERATIONS, false)?;
//! for mode in SmMode::ALL {
//!     let outcome = bench.run_mode(mode)?;
//!     println!("{mode}: {} pass={}", outcome.throughput()?, outcome.passed());
//! }
//! ctx.teardown();
//! ```
//!
//! Kernels are compiled with NVRTC when the context is created, so the CUDA
//! toolkit must be installed at runtime.

mod config;
mod context;
mod error;
mod kernels;
mod memory;
mod runner;
mod streams;
mod timer;

pub use config::{normalize_legacy_args, GpuArgs};
pub use context::CudaContext;
pub use error::{CudaError, Result};
pub use kernels::{
    launch_matmul, launch_matmul_traced, LaunchShape, KERNEL_PLAIN, KERNEL_TRACED, TILE,
};
pub use memory::{filled_host, BufferTriple, GpuMatrix, HostInputs, VALUE_A, VALUE_B};
pub use runner::{ModeOutcome, SmBenchmark, DEFAULT_ITERATIONS};
pub use streams::StreamSet;
pub use timer::EventTimer;
