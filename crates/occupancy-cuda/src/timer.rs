//! Device event timing.

use crate::context::CudaContext;
use crate::error::Result;
use cudarc::driver::{result, sys};

/// A CUDA event owned by this process.
struct DeviceEvent {
    event: sys::CUevent,
}

impl DeviceEvent {
    fn new(ctx: &CudaContext) -> Result<Self> {
        ctx.device().bind_to_thread()?;
        let event = result::event::create(sys::CUevent_flags::CU_EVENT_DEFAULT)?;
        Ok(Self { event })
    }

    /// Enqueue the event on the device's default stream.
    fn record(&self, ctx: &CudaContext) -> Result<()> {
        unsafe { result::event::record(self.event, *ctx.device().cu_stream()) }?;
        Ok(())
    }
}

impl Drop for DeviceEvent {
    fn drop(&mut self) {
        unsafe {
            let _ = result::event::destroy(self.event);
        }
    }
}

/// Start/stop event pair bracketing work on the default stream.
pub struct EventTimer {
    start: DeviceEvent,
    stop: DeviceEvent,
}

impl EventTimer {
    pub fn new(ctx: &CudaContext) -> Result<Self> {
        Ok(Self {
            start: DeviceEvent::new(ctx)?,
            stop: DeviceEvent::new(ctx)?,
        })
    }

    pub fn start(&self, ctx: &CudaContext) -> Result<()> {
        self.start.record(ctx)
    }

    pub fn stop(&self, ctx: &CudaContext) -> Result<()> {
        self.stop.record(ctx)
    }

    /// Milliseconds between the two events.
    ///
    /// Only valid once the stop event has completed, i.e. after a device
    /// synchronization following [`EventTimer::stop`].
    pub fn elapsed_ms(&self) -> Result<f32> {
        let ms = unsafe { result::event::elapsed(self.start.event, self.stop.event) }?;
        Ok(ms)
    }
}
