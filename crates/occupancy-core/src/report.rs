//! Throughput reporter.

use std::fmt;

use crate::error::MeasurementFault;
use crate::timing::TimingSample;

/// Normalized throughput of one placement strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Throughput {
    /// Operations executed by one iteration across all concurrent units.
    pub ops_per_iteration: f64,
    /// Seconds one iteration took.
    pub secs_per_iteration: f64,
    /// Giga-operations per second.
    pub giga_ops_per_sec: f64,
}

impl Throughput {
    /// Convert a timing sample and the per-iteration operation count into
    /// giga-operations per second.
    ///
    /// A zero, negative or non-finite elapsed time is a measurement fault and
    /// is returned as such instead of being divided through.
    pub fn measure(ops_per_iteration: f64, sample: &TimingSample) -> Result<Self, MeasurementFault> {
        let elapsed = sample.elapsed_secs();
        if !elapsed.is_finite() {
            return Err(MeasurementFault::NonFiniteElapsed(elapsed));
        }
        if elapsed <= 0.0 {
            return Err(MeasurementFault::NonPositiveElapsed(elapsed));
        }
        let secs_per_iteration = sample
            .secs_per_iteration()
            .ok_or(MeasurementFault::NoIterations)?;
        if ops_per_iteration <= 0.0 || !ops_per_iteration.is_finite() {
            return Err(MeasurementFault::NoOperations);
        }

        let giga_ops_per_sec = ops_per_iteration / secs_per_iteration / 1e9;
        if !giga_ops_per_sec.is_finite() || giga_ops_per_sec <= 0.0 {
            return Err(MeasurementFault::NonPositiveElapsed(secs_per_iteration));
        }

        Ok(Self {
            ops_per_iteration,
            secs_per_iteration,
            giga_ops_per_sec,
        })
    }

    /// Integer-operation throughput of a CPU region (`total_ops` over one bracket).
    pub fn gops(total_ops: u64, sample: &TimingSample) -> Result<Self, MeasurementFault> {
        Self::measure(total_ops as f64, sample)
    }

    /// Floating-point throughput of a GPU mode.
    pub fn gflops(flops_per_iteration: f64, sample: &TimingSample) -> Result<Self, MeasurementFault> {
        Self::measure(flops_per_iteration, sample)
    }

    /// Milliseconds per iteration.
    pub fn msecs_per_iteration(&self) -> f64 {
        self.secs_per_iteration * 1e3
    }
}

impl fmt::Display for Throughput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2} G/s, {:.3} msec, {:.0} ops",
            self.giga_ops_per_sec,
            self.msecs_per_iteration(),
            self.ops_per_iteration
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gops() {
        let sample = TimingSample::new(2.0, 1);
        let t = Throughput::gops(8_000_000_000, &sample).unwrap();
        assert!((t.giga_ops_per_sec - 4.0).abs() < 1e-12);
        assert_eq!(t.secs_per_iteration, 2.0);
    }

    #[test]
    fn test_gflops_per_iteration() {
        // 300 iterations in 0.3 s of a 131 MFLOP multiply.
        let flops = 2.0 * 320.0 * 320.0 * 640.0;
        let sample = TimingSample::from_millis(300.0, 300);
        let t = Throughput::gflops(flops, &sample).unwrap();
        assert!((t.giga_ops_per_sec - flops / 1e-3 / 1e9).abs() < 1e-9);
        assert!((t.msecs_per_iteration() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_elapsed_is_fault() {
        let sample = TimingSample::new(0.0, 1);
        assert_eq!(
            Throughput::gops(10, &sample),
            Err(MeasurementFault::NonPositiveElapsed(0.0))
        );
    }

    #[test]
    fn test_negative_elapsed_is_fault() {
        let sample = TimingSample::from_millis(-1.0, 10);
        assert!(matches!(
            Throughput::gflops(1.0, &sample),
            Err(MeasurementFault::NonPositiveElapsed(_))
        ));
    }

    #[test]
    fn test_nan_elapsed_is_fault() {
        let sample = TimingSample::new(f64::NAN, 1);
        assert!(matches!(
            Throughput::gops(10, &sample),
            Err(MeasurementFault::NonFiniteElapsed(_))
        ));
    }

    #[test]
    fn test_no_iterations_is_fault() {
        let sample = TimingSample::new(1.0, 0);
        assert_eq!(
            Throughput::gops(10, &sample),
            Err(MeasurementFault::NoIterations)
        );
    }

    #[test]
    fn test_no_ops_is_fault() {
        let sample = TimingSample::new(1.0, 1);
        assert_eq!(Throughput::gops(0, &sample), Err(MeasurementFault::NoOperations));
    }

    #[test]
    fn test_positive_and_finite() {
        for secs in [1e-9, 1e-3, 1.0, 1e4] {
            let t = Throughput::gops(1, &TimingSample::new(secs, 1)).unwrap();
            assert!(t.giga_ops_per_sec > 0.0 && t.giga_ops_per_sec.is_finite());
        }
    }

    #[test]
    fn test_display() {
        let t = Throughput::gops(2_000_000_000, &TimingSample::new(1.0, 1)).unwrap();
        assert_eq!(t.to_string(), "2.00 G/s, 1000.000 msec, 2000000000 ops");
    }
}
