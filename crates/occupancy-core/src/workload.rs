//! Workload descriptors and their exact operation counts.

use crate::error::WorkloadError;

/// Default CPU loop length per worker.
pub const DEFAULT_N_WORK: u64 = 1_000_000_000;

/// Fixed integer accumulation loop run by every CPU worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccumulateWorkload {
    n_work: u64,
}

impl AccumulateWorkload {
    pub fn new(n_work: u64) -> Result<Self, WorkloadError> {
        if n_work == 0 {
            return Err(WorkloadError::NoWork);
        }
        Ok(Self { n_work })
    }

    /// Loop iterations per worker.
    pub fn n_work(&self) -> u64 {
        self.n_work
    }

    /// Total scalar operations when `units` workers each run the loop once.
    pub fn total_ops(&self, units: usize) -> u64 {
        self.n_work * units as u64
    }

    /// Value each worker's accumulator holds after the loop.
    ///
    /// Sum of `0..n_work` with two's-complement wrap-around.
    pub fn expected_checksum(&self) -> i64 {
        let n = self.n_work;
        let sum = if n % 2 == 0 {
            (n / 2).wrapping_mul(n - 1)
        } else {
            n.wrapping_mul((n - 1) / 2)
        };
        sum as i64
    }
}

impl Default for AccumulateWorkload {
    fn default() -> Self {
        Self {
            n_work: DEFAULT_N_WORK,
        }
    }
}

/// Matrix shape as (width, height), i.e. (columns, rows).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixDims {
    pub width: usize,
    pub height: usize,
}

impl MatrixDims {
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `C = A * B` with fixed dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GemmWorkload {
    a: MatrixDims,
    b: MatrixDims,
}

impl GemmWorkload {
    /// Tile edge the default dimensions are derived from.
    pub const DEFAULT_BLOCK: usize = 32;

    /// Validate that `A.width == B.height` and no matrix is empty.
    pub fn new(a: MatrixDims, b: MatrixDims) -> Result<Self, WorkloadError> {
        for dims in [a, b] {
            if dims.is_empty() {
                return Err(WorkloadError::EmptyMatrix {
                    width: dims.width,
                    height: dims.height,
                });
            }
        }
        if a.width != b.height {
            return Err(WorkloadError::DimensionMismatch {
                wa: a.width,
                hb: b.height,
            });
        }
        Ok(Self { a, b })
    }

    pub fn a(&self) -> MatrixDims {
        self.a
    }

    pub fn b(&self) -> MatrixDims {
        self.b
    }

    /// Shape of `C`: `B.width` columns, `A.height` rows.
    pub fn c(&self) -> MatrixDims {
        MatrixDims::new(self.b.width, self.a.height)
    }

    /// Length of every dot product (`A.width`).
    pub fn dot_length(&self) -> usize {
        self.a.width
    }

    /// Floating point operations of one multiply: `2 * hA * wA * wB`.
    pub fn flops_per_matmul(&self) -> f64 {
        2.0 * self.a.height as f64 * self.a.width as f64 * self.b.width as f64
    }

    /// Operations of one timed iteration when `concurrency` kernels run side by side.
    pub fn flops_per_iteration(&self, concurrency: usize) -> f64 {
        self.flops_per_matmul() * concurrency as f64
    }
}

impl Default for GemmWorkload {
    fn default() -> Self {
        let block = Self::DEFAULT_BLOCK;
        Self {
            a: MatrixDims::new(5 * 2 * block, 5 * 2 * block),
            b: MatrixDims::new(5 * 4 * block, 5 * 2 * block),
        }
    }
}
