//! Timing samples.

use std::time::Duration;

/// One start/stop bracket around `iterations` back-to-back workload executions.
///
/// Elapsed time is raw seconds, not a [`Duration`]: zero, negative and NaN
/// readings from a device timer reach the reporter unchanged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingSample {
    elapsed_secs: f64,
    iterations: u32,
}

impl TimingSample {
    pub fn new(elapsed_secs: f64, iterations: u32) -> Self {
        Self {
            elapsed_secs,
            iterations,
        }
    }

    /// Sample from a monotonic host clock.
    pub fn from_duration(elapsed: Duration, iterations: u32) -> Self {
        Self::new(elapsed.as_secs_f64(), iterations)
    }

    /// Sample from a device event pair, which reports milliseconds.
    pub fn from_millis(elapsed_ms: f64, iterations: u32) -> Self {
        Self::new(elapsed_ms / 1e3, iterations)
    }

    /// Total bracketed time in seconds.
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Seconds per iteration, or `None` when the sample covers no iterations.
    pub fn secs_per_iteration(&self) -> Option<f64> {
        (self.iterations > 0).then(|| self.elapsed_secs / self.iterations as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_millis() {
        let s = TimingSample::from_millis(300.0, 300);
        assert!((s.elapsed_secs() - 0.3).abs() < 1e-12);
        assert!((s.secs_per_iteration().unwrap() - 0.001).abs() < 1e-12);
    }

    #[test]
    fn test_from_duration() {
        let s = TimingSample::from_duration(Duration::from_millis(1500), 1);
        assert_eq!(s.elapsed_secs(), 1.5);
        assert_eq!(s.secs_per_iteration(), Some(1.5));
    }

    #[test]
    fn test_zero_iterations() {
        assert_eq!(TimingSample::new(1.0, 0).secs_per_iteration(), None);
    }

    #[test]
    fn test_negative_elapsed_preserved() {
        let s = TimingSample::from_millis(-2.0, 1);
        assert_eq!(s.elapsed_secs(), -0.002);
    }
}
