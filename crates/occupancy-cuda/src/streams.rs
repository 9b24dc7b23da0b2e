//! Independent command streams, one per concurrency unit.

use crate::context::CudaContext;
use crate::error::Result;
use cudarc::driver::CudaStream;
use tracing::debug;

/// The streams of one benchmark mode.
///
/// All streams are created up front, before any launch of the mode, and are
/// destroyed together when the set is dropped.
pub struct StreamSet {
    streams: Vec<CudaStream>,
}

impl StreamSet {
    /// Fork `count` streams off the device's default stream.
    ///
    /// Each new stream first waits for work already queued on the default
    /// stream, so uploads issued before this call are visible to its kernels.
    pub fn create(ctx: &CudaContext, count: usize) -> Result<Self> {
        let streams = (0..count)
            .map(|_| ctx.device().fork_default_stream())
            .collect::<std::result::Result<Vec<_>, _>>()?;
        debug!(count, "created streams");
        Ok(Self { streams })
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CudaStream> {
        self.streams.iter()
    }

    /// Make the default stream wait for everything queued on every stream.
    ///
    /// Host-side non-blocking; an event recorded on the default stream after
    /// this call completes only once all streams have drained.
    pub fn join_into_default(&self, ctx: &CudaContext) -> Result<()> {
        for stream in &self.streams {
            ctx.device().wait_for(stream)?;
        }
        Ok(())
    }
}
