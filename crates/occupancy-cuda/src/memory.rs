//! Host and device buffers.

use crate::context::CudaContext;
use crate::error::{CudaError, Result};
use cudarc::driver::{CudaSlice, DeviceRepr, ValidAsZeroBits};
use occupancy_core::{GemmWorkload, MatrixDims};
use tracing::trace;

/// Value every element of `A` is filled with.
pub const VALUE_A: f32 = 1.0;

/// Value every element of `B` is filled with.
pub const VALUE_B: f32 = 0.01;

/// Allocate a host buffer of `len` copies of `value`.
///
/// Allocation failure is reported as [`CudaError::HostAlloc`] instead of
/// aborting the process.
pub fn filled_host<T: Clone>(len: usize, value: T) -> Result<Vec<T>> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| CudaError::HostAlloc {
            bytes: len.saturating_mul(std::mem::size_of::<T>()),
        })?;
    data.resize(len, value);
    Ok(data)
}

fn validate_dims<T>(data: &[T], dims: MatrixDims) -> Result<()> {
    if data.len() != dims.len() {
        return Err(CudaError::DimensionMismatch(format!(
            "{}x{} matrix needs {} elements, host buffer has {}",
            dims.width,
            dims.height,
            dims.len(),
            data.len()
        )));
    }
    Ok(())
}

/// Row-major device buffer with its shape.
pub struct GpuMatrix<T: DeviceRepr> {
    slice: CudaSlice<T>,
    dims: MatrixDims,
}

impl<T: DeviceRepr + Default + Clone + ValidAsZeroBits + Unpin> GpuMatrix<T> {
    /// Blocking upload of `data`, which must hold exactly `dims.len()` elements.
    pub fn from_host(ctx: &CudaContext, data: &[T], dims: MatrixDims) -> Result<Self> {
        validate_dims(data, dims)?;
        let slice = ctx.device().htod_sync_copy(data)?;
        Ok(Self { slice, dims })
    }

    /// Zero-filled device buffer.
    pub fn alloc(ctx: &CudaContext, dims: MatrixDims) -> Result<Self> {
        let slice = ctx.device().alloc_zeros::<T>(dims.len())?;
        Ok(Self { slice, dims })
    }

    /// Blocking download.
    pub fn to_host(&self, ctx: &CudaContext) -> Result<Vec<T>> {
        let host = ctx.device().dtoh_sync_copy(&self.slice)?;
        Ok(host)
    }

    pub fn dims(&self) -> MatrixDims {
        self.dims
    }

    pub fn as_slice(&self) -> &CudaSlice<T> {
        &self.slice
    }

    pub fn as_slice_mut(&mut self) -> &mut CudaSlice<T> {
        &mut self.slice
    }
}

/// Host copies of the constant-filled inputs, uploaded once per triple.
pub struct HostInputs {
    pub a: Vec<f32>,
    pub b: Vec<f32>,
}

impl HostInputs {
    pub fn new(workload: &GemmWorkload) -> Result<Self> {
        Ok(Self {
            a: filled_host(workload.a().len(), VALUE_A)?,
            b: filled_host(workload.b().len(), VALUE_B)?,
        })
    }

    /// Every element of `C` when computed exactly.
    pub fn expected_value(workload: &GemmWorkload) -> f64 {
        workload.dot_length() as f64 * VALUE_A as f64 * VALUE_B as f64
    }
}

/// Private `A`, `B`, `C` buffers of one concurrency unit.
///
/// A triple is used by exactly one stream and never shared.
pub struct BufferTriple {
    pub a: GpuMatrix<f32>,
    pub b: GpuMatrix<f32>,
    pub c: GpuMatrix<f32>,
}

impl BufferTriple {
    pub fn upload(ctx: &CudaContext, workload: &GemmWorkload, inputs: &HostInputs) -> Result<Self> {
        let triple = Self {
            a: GpuMatrix::from_host(ctx, &inputs.a, workload.a())?,
            b: GpuMatrix::from_host(ctx, &inputs.b, workload.b())?,
            c: GpuMatrix::alloc(ctx, workload.c())?,
        };
        trace!(
            bytes = 4 * (workload.a().len() + workload.b().len() + workload.c().len()),
            "allocated buffer triple"
        );
        Ok(triple)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filled_host() {
        let data = filled_host(6, 0.5f32).unwrap();
        assert_eq!(data, vec![0.5; 6]);
    }

    #[test]
    fn test_filled_host_too_large() {
        let err = filled_host(usize::MAX / 2, 0u64).unwrap_err();
        assert!(matches!(err, CudaError::HostAlloc { .. }));
    }

    #[test]
    fn test_expected_value() {
        let expected = HostInputs::expected_value(&GemmWorkload::default());
        assert!((expected - 3.2).abs() < 1e-6);
    }

    #[test]
    fn test_validate_dims() {
        assert!(validate_dims(&[0.0f32; 6], MatrixDims::new(3, 2)).is_ok());
        assert!(matches!(
            validate_dims(&[0.0f32; 5], MatrixDims::new(3, 2)),
            Err(CudaError::DimensionMismatch(_))
        ));
    }
}
