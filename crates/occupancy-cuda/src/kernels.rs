//! Tiled matrix-multiply launches.

use crate::context::CudaContext;
use crate::error::Result;
use crate::memory::{BufferTriple, GpuMatrix};
use cudarc::driver::{CudaStream, LaunchAsync, LaunchConfig};
use occupancy_core::{MatrixDims, SmMode};

/// Tile edge; the kernel source is compiled with the same value.
pub const TILE: u32 = 32;

/// Untraced kernel used for warm-up and timed iterations.
pub const KERNEL_PLAIN: &str = "matrix_mul_tiled";

/// Kernel that additionally records SM id and cycle counters per block.
pub const KERNEL_TRACED: &str = "matrix_mul_tiled_traced";

/// Grid and block dimensions of one launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchShape {
    pub grid: (u32, u32, u32),
    pub block: (u32, u32, u32),
}

impl LaunchShape {
    /// Shape for `mode` when computing a `c`-shaped output.
    ///
    /// The baseline grid has one block per output tile; per-SM modes use a
    /// single block that walks every tile.
    pub fn for_mode(mode: SmMode, c: MatrixDims) -> Self {
        let grid = if mode.single_block() {
            (1, 1, 1)
        } else {
            (
                (c.width as u32).div_ceil(TILE),
                (c.height as u32).div_ceil(TILE),
                1,
            )
        };
        Self {
            grid,
            block: (TILE, TILE, 1),
        }
    }

    /// Blocks per launch.
    pub fn blocks(&self) -> usize {
        (self.grid.0 * self.grid.1 * self.grid.2) as usize
    }

    /// Threads per block.
    pub fn threads_per_block(&self) -> u32 {
        self.block.0 * self.block.1 * self.block.2
    }

    fn config(&self) -> LaunchConfig {
        LaunchConfig {
            grid_dim: self.grid,
            block_dim: self.block,
            shared_mem_bytes: 0,
        }
    }
}

fn dims_i32(triple: &BufferTriple) -> (i32, i32, i32) {
    let a = triple.a.dims();
    let b = triple.b.dims();
    (a.width as i32, a.height as i32, b.width as i32)
}

/// Queue `C = A * B` on `stream`. Does not synchronize.
pub fn launch_matmul(
    ctx: &CudaContext,
    stream: &CudaStream,
    triple: &mut BufferTriple,
    shape: LaunchShape,
) -> Result<()> {
    let (wa, ha, wb) = dims_i32(triple);
    let kernel = ctx.get_kernel(KERNEL_PLAIN)?;

    unsafe {
        kernel.launch_on_stream(
            stream,
            shape.config(),
            (
                triple.c.as_slice_mut(),
                triple.a.as_slice(),
                triple.b.as_slice(),
                wa,
                ha,
                wb,
            ),
        )?;
    }
    Ok(())
}

/// Queue the traced variant, writing one record per block into `trace`.
///
/// `trace` must hold at least `shape.blocks()` records.
pub fn launch_matmul_traced(
    ctx: &CudaContext,
    stream: &CudaStream,
    triple: &mut BufferTriple,
    shape: LaunchShape,
    trace: &mut GpuMatrix<u64>,
) -> Result<()> {
    let (wa, ha, wb) = dims_i32(triple);
    let kernel = ctx.get_kernel(KERNEL_TRACED)?;

    unsafe {
        kernel.launch_on_stream(
            stream,
            shape.config(),
            (
                triple.c.as_slice_mut(),
                triple.a.as_slice(),
                triple.b.as_slice(),
                wa,
                ha,
                wb,
                trace.as_slice_mut(),
            ),
        )?;
    }
    Ok(())
}
