//! Timed parallel region over placed workers.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use occupancy_core::{
    AccumulateWorkload, MeasurementFault, PlacementStrategy, Throughput, TimingSample,
};
use tracing::{debug, warn};

use crate::affinity::{AffinityBinder, CpuSlotResolver};
use crate::error::{CpuBenchError, Result};
use crate::workload::accumulate;

/// Result of one timed parallel region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionOutcome {
    pub strategy: PlacementStrategy,
    /// Number of concurrent workers.
    pub units: usize,
    /// `n_work * units`.
    pub total_ops: u64,
    /// Single bracket around spawning, running and joining every worker.
    pub sample: TimingSample,
    /// Final accumulator of each worker, in worker order.
    pub checksums: Vec<i64>,
}

impl RegionOutcome {
    pub fn throughput(&self) -> std::result::Result<Throughput, MeasurementFault> {
        Throughput::gops(self.total_ops, &self.sample)
    }

    /// Whether every worker ran the full loop.
    pub fn checksums_match(&self, workload: &AccumulateWorkload) -> bool {
        let expected = workload.expected_checksum();
        self.checksums.iter().all(|&sum| sum == expected)
    }
}

/// Fork-join region with one pinned thread per placement.
///
/// Workers share nothing: each owns its accumulator and reports it back once
/// over a channel. The clock starts before the first worker is spawned and
/// stops after the last one has reported.
pub struct ParallelRegion<B> {
    binder: Arc<B>,
    join_timeout: Option<Duration>,
}

impl<B: AffinityBinder> ParallelRegion<B> {
    pub fn new(binder: B) -> Self {
        Self {
            binder: Arc::new(binder),
            join_timeout: None,
        }
    }

    /// Bound the wait for workers. Without a bound a hung worker hangs the
    /// benchmark; with one, the region fails with [`CpuBenchError::Timeout`]
    /// and the stragglers are left detached.
    pub fn with_join_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.join_timeout = timeout;
        self
    }

    /// Run `workload` once on every worker of `strategy`.
    ///
    /// Every placement is validated and resolved to an OS processor before the
    /// clock starts; an out-of-range slot aborts the region without running
    /// anything.
    pub fn run<T: CpuSlotResolver + ?Sized>(
        &self,
        topology: &T,
        strategy: PlacementStrategy,
        workload: AccumulateWorkload,
    ) -> Result<RegionOutcome> {
        let plan = strategy.plan(topology)?;
        let targets = plan
            .iter()
            .map(|p| {
                topology
                    .os_index(p.physical, p.logical)
                    .map(|os_index| (p.worker, os_index))
                    .ok_or(CpuBenchError::NoProcessorIndex {
                        physical: p.physical,
                        logical: p.logical,
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        let units = targets.len();
        debug!(strategy = strategy.name(), units, "starting parallel region");

        let (tx, rx) = mpsc::channel::<(usize, Result<i64>)>();
        let n_work = workload.n_work();

        let start = Instant::now();
        let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(units);
        for (worker, os_index) in targets {
            let tx = tx.clone();
            let binder = Arc::clone(&self.binder);
            let handle = thread::Builder::new()
                .name(format!("occupancy-worker-{worker}"))
                .spawn(move || {
                    let result = if binder.bind_current(os_index) {
                        Ok(accumulate(n_work))
                    } else {
                        Err(CpuBenchError::Bind { worker, os_index })
                    };
                    let _ = tx.send((worker, result));
                })
                .map_err(|source| CpuBenchError::Spawn { worker, source })?;
            handles.push(handle);
        }
        drop(tx);

        let mut checksums = vec![0i64; units];
        let deadline = self.join_timeout.map(|timeout| start + timeout);
        for finished in 0..units {
            let message = match deadline {
                Some(deadline) => {
                    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                        Ok(message) => Some(message),
                        Err(RecvTimeoutError::Timeout) => {
                            warn!(finished, expected = units, "parallel region timed out");
                            return Err(CpuBenchError::Timeout {
                                waited: start.elapsed(),
                                finished,
                                expected: units,
                            });
                        }
                        Err(RecvTimeoutError::Disconnected) => None,
                    }
                }
                None => rx.recv().ok(),
            };
            // Disconnected before every worker reported: one of them panicked.
            let Some((worker, result)) = message else {
                return Err(find_panicked(handles));
            };
            checksums[worker] = result?;
        }
        let elapsed = start.elapsed();

        for (worker, handle) in handles.into_iter().enumerate() {
            handle
                .join()
                .map_err(|_| CpuBenchError::WorkerPanicked(worker))?;
        }

        debug!(strategy = strategy.name(), ?elapsed, "parallel region finished");
        Ok(RegionOutcome {
            strategy,
            units,
            total_ops: workload.total_ops(units),
            sample: TimingSample::from_duration(elapsed, 1),
            checksums,
        })
    }
}

fn find_panicked(handles: Vec<JoinHandle<()>>) -> CpuBenchError {
    handles
        .into_iter()
        .enumerate()
        .find_map(|(worker, handle)| {
            handle
                .join()
                .is_err()
                .then_some(CpuBenchError::WorkerPanicked(worker))
        })
        .unwrap_or(CpuBenchError::WorkerPanicked(usize::MAX))
}
