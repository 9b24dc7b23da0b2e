//! Device handle, compiled kernels and the SM topology.

use crate::error::{CudaError, Result};
use crate::kernels::{KERNEL_PLAIN, KERNEL_TRACED, TILE};
use cudarc::driver::sys::CUdevice_attribute;
use cudarc::driver::{CudaDevice, CudaFunction};
use cudarc::nvrtc::CompileOptions;
use occupancy_core::{validate_topology, Topology};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

const MATMUL_SOURCE: &str = include_str!("../kernels/matrix_mul.cu");

const MODULE: &str = "matrix_mul";

const ENTRY_POINTS: [&str; 2] = [KERNEL_PLAIN, KERNEL_TRACED];

/// An opened CUDA device with the matrix-multiply kernels loaded.
///
/// Also the device's [`Topology`]: every SM is one physical unit holding a
/// single logical slot.
pub struct CudaContext {
    device: Arc<CudaDevice>,
    entry_points: HashMap<&'static str, CudaFunction>,
    sm_count: usize,
    name: String,
}

impl CudaContext {
    /// Open device 0.
    pub fn new() -> Result<Self> {
        Self::new_on_device(0)
    }

    /// Open device `ordinal`.
    pub fn new_on_device(ordinal: usize) -> Result<Self> {
        Self::from_device(CudaDevice::new(ordinal)?)
    }

    /// Query the SM count, compile the kernels with NVRTC and load them.
    pub fn from_device(device: Arc<CudaDevice>) -> Result<Self> {
        let raw_sm_count =
            device.attribute(CUdevice_attribute::CU_DEVICE_ATTRIBUTE_MULTIPROCESSOR_COUNT)?;
        let sm_count = usize::try_from(raw_sm_count).unwrap_or(0);
        let name = device.name()?;

        let opts = CompileOptions {
            options: vec![format!("-DTILE={TILE}")],
            ..Default::default()
        };
        let ptx = cudarc::nvrtc::compile_ptx_with_opts(MATMUL_SOURCE, opts)?;
        device.load_ptx(ptx, MODULE, &ENTRY_POINTS)?;
        debug!(module = MODULE, tile = TILE, "kernels compiled and loaded");

        let entry_points = ENTRY_POINTS
            .iter()
            .map(|&entry| {
                device
                    .get_func(MODULE, entry)
                    .map(|func| (entry, func))
                    .ok_or_else(|| CudaError::KernelNotFound(entry.to_string()))
            })
            .collect::<Result<HashMap<_, _>>>()?;

        let ctx = Self {
            device,
            entry_points,
            sm_count,
            name,
        };
        validate_topology(&ctx)?;
        info!(
            ordinal = ctx.ordinal(),
            name = %ctx.name,
            sm_count,
            "CUDA context ready"
        );
        Ok(ctx)
    }

    pub fn device(&self) -> &Arc<CudaDevice> {
        &self.device
    }

    /// A loaded entry point, by its `extern "C"` name.
    pub fn get_kernel(&self, entry: &'static str) -> Result<CudaFunction> {
        match self.entry_points.get(entry) {
            Some(func) => Ok(func.clone()),
            None => Err(CudaError::KernelNotFound(entry.to_string())),
        }
    }

    pub fn ordinal(&self) -> usize {
        self.device.ordinal()
    }

    /// Marketing name reported by the driver.
    pub fn device_name(&self) -> &str {
        &self.name
    }

    /// Streaming multiprocessors on the device.
    pub fn sm_count(&self) -> usize {
        self.sm_count
    }

    /// Wait for all queued work on the device.
    pub fn synchronize(&self) -> Result<()> {
        self.device.synchronize()?;
        Ok(())
    }

    /// Release the device. Every stream and buffer of every mode must already
    /// be dropped.
    pub fn teardown(self) {
        debug!(ordinal = self.ordinal(), "CUDA context released");
    }
}

impl Topology for CudaContext {
    fn physical_unit_count(&self) -> usize {
        self.sm_count
    }

    fn logical_unit_count(&self) -> usize {
        self.sm_count
    }

    fn logical_units_of(&self, physical: usize) -> Option<usize> {
        (physical < self.sm_count).then_some(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_reports_sm_topology() {
        let Ok(ctx) = std::panic::catch_unwind(CudaContext::new) else {
            println!("CUDA libraries not found, skipping test");
            return;
        };
        let Ok(ctx) = ctx else {
            println!("CUDA not available, skipping test");
            return;
        };
        assert!(ctx.sm_count() >= 1);
        assert_eq!(ctx.physical_unit_count(), ctx.logical_unit_count());
        assert_eq!(ctx.logical_units_of(0), Some(1));
        assert_eq!(ctx.logical_units_of(ctx.sm_count()), None);
        assert!(ctx.get_kernel(KERNEL_PLAIN).is_ok());
        assert!(ctx.get_kernel(KERNEL_TRACED).is_ok());
        assert!(matches!(
            ctx.get_kernel("missing"),
            Err(CudaError::KernelNotFound(_))
        ));
        ctx.teardown();
    }
}
