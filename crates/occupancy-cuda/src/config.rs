//! Command line configuration.

use clap::Parser;
use occupancy_core::{GemmWorkload, MatrixDims, SmMode, WorkloadError};

use crate::runner::DEFAULT_ITERATIONS;

/// Benchmark a tiled matrix multiply with one grid, one block per SM, and two
/// blocks per SM.
#[derive(Debug, Clone, Parser)]
#[command(name = "sm-occupancy-bench", version)]
pub struct GpuArgs {
    /// CUDA device ordinal.
    #[arg(long, default_value_t = 0)]
    pub device: usize,

    /// Width of matrix A.
    #[arg(long = "wA", default_value_t = 320)]
    pub wa: usize,

    /// Height of matrix A.
    #[arg(long = "hA", default_value_t = 320)]
    pub ha: usize,

    /// Width of matrix B.
    #[arg(long = "wB", default_value_t = 640)]
    pub wb: usize,

    /// Height of matrix B.
    #[arg(long = "hB", default_value_t = 320)]
    pub hb: usize,

    /// Timed iterations per mode.
    #[arg(long, default_value_t = DEFAULT_ITERATIONS)]
    pub iterations: u32,

    /// Record SM id and cycle counters per block in the verification pass.
    #[arg(long)]
    pub trace: bool,

    /// Modes to run, comma separated.
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "baseline,one-per-sm,two-per-sm"
    )]
    pub modes: Vec<SmMode>,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl GpuArgs {
    pub fn dims_a(&self) -> MatrixDims {
        MatrixDims::new(self.wa, self.ha)
    }

    pub fn dims_b(&self) -> MatrixDims {
        MatrixDims::new(self.wb, self.hb)
    }

    /// The requested multiply, rejected when `wA != hB` or a matrix is empty.
    pub fn workload(&self) -> Result<GemmWorkload, WorkloadError> {
        GemmWorkload::new(self.dims_a(), self.dims_b())
    }
}

/// Rewrite single-dash long options (`-wA=320`, `-device=1`, `-help`) to the
/// double-dash form, and `-?` to `--help`. The program name is left alone.
pub fn normalize_legacy_args<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut out: Vec<String> = args.next().into_iter().collect();
    for arg in args {
        if arg == "-?" {
            out.push("--help".to_string());
            continue;
        }
        let legacy = arg.len() > 2
            && arg.starts_with('-')
            && arg[1..].starts_with(|c: char| c.is_ascii_alphabetic());
        if legacy {
            out.push(format!("-{arg}"));
        } else {
            out.push(arg);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults() {
        let args = GpuArgs::parse_from(["sm-occupancy-bench"]);
        assert_eq!(args.device, 0);
        assert_eq!(args.iterations, 300);
        assert!(!args.trace);
        assert_eq!(args.modes, SmMode::ALL.to_vec());
        assert_eq!(args.workload().unwrap(), GemmWorkload::default());
    }

    #[test]
    fn test_legacy_flags() {
        let raw = argv(&["sm-occupancy-bench", "-device=1", "-wA=64", "-hB=64", "-hA=16"]);
        let args = GpuArgs::parse_from(normalize_legacy_args(raw));
        assert_eq!(args.device, 1);
        assert_eq!(args.dims_a(), MatrixDims::new(64, 16));
        assert_eq!(args.dims_b(), MatrixDims::new(640, 64));
        let workload = args.workload().unwrap();
        assert_eq!(workload.c(), MatrixDims::new(640, 16));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(
            normalize_legacy_args(argv(&["-prog", "-?", "-help", "--trace", "-x", "-12"])),
            argv(&["-prog", "--help", "--help", "--trace", "-x", "-12"])
        );
    }

    #[test]
    fn test_dimension_mismatch() {
        let args = GpuArgs::parse_from(["sm-occupancy-bench", "--wA=100", "--hB=200"]);
        assert_eq!(
            args.workload().unwrap_err(),
            WorkloadError::DimensionMismatch { wa: 100, hb: 200 }
        );
    }

    #[test]
    fn test_modes_subset() {
        let args = GpuArgs::parse_from(["sm-occupancy-bench", "--modes", "two-per-sm,baseline"]);
        assert_eq!(args.modes, vec![SmMode::TwoPerSm, SmMode::Baseline]);
        assert!(GpuArgs::try_parse_from(["sm-occupancy-bench", "--modes", "three-per-sm"]).is_err());
    }
}
