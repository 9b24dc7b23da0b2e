//! Command line configuration.

use std::time::Duration;

use clap::{Parser, ValueEnum};
use occupancy_core::{LogicalMapping, PlacementStrategy, DEFAULT_N_WORK};

/// Which placement strategies to measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyChoice {
    Physical,
    Logical,
    Both,
}

/// Compare throughput of a fixed loop on physical cores versus hardware threads.
#[derive(Debug, Clone, Parser)]
#[command(name = "hyperthreading-bench", version)]
pub struct CpuArgs {
    /// Loop iterations per worker.
    #[arg(long, default_value_t = DEFAULT_N_WORK)]
    pub n_work: u64,

    /// Placement strategies to run.
    #[arg(long, value_enum, default_value_t = StrategyChoice::Both)]
    pub strategy: StrategyChoice,

    /// Worker-to-thread mapping of the logical strategy (compat or interleaved).
    #[arg(long, default_value = "compat")]
    pub logical_mapping: LogicalMapping,

    /// Give up on a parallel region after this many seconds.
    #[arg(long)]
    pub join_timeout_secs: Option<f64>,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl CpuArgs {
    /// Strategies in the order they run.
    pub fn strategies(&self) -> Vec<PlacementStrategy> {
        let logical = PlacementStrategy::Logical(self.logical_mapping);
        match self.strategy {
            StrategyChoice::Physical => vec![PlacementStrategy::Physical],
            StrategyChoice::Logical => vec![logical],
            StrategyChoice::Both => vec![PlacementStrategy::Physical, logical],
        }
    }

    /// Bounded join, if requested. Negative or non-finite values are rejected.
    pub fn join_timeout(&self) -> Result<Option<Duration>, String> {
        self.join_timeout_secs
            .map(|secs| {
                Duration::try_from_secs_f64(secs)
                    .map_err(|_| format!("invalid --join-timeout-secs value: {secs}"))
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = CpuArgs::parse_from(["hyperthreading-bench"]);
        assert_eq!(args.n_work, 1_000_000_000);
        assert_eq!(args.strategy, StrategyChoice::Both);
        assert_eq!(args.logical_mapping, LogicalMapping::Compat);
        assert_eq!(
            args.strategies(),
            vec![
                PlacementStrategy::Physical,
                PlacementStrategy::Logical(LogicalMapping::Compat)
            ]
        );
        assert_eq!(args.join_timeout(), Ok(None));
    }

    #[test]
    fn test_overrides() {
        let args = CpuArgs::parse_from([
            "hyperthreading-bench",
            "--n-work",
            "1000",
            "--strategy",
            "logical",
            "--logical-mapping",
            "interleaved",
            "--join-timeout-secs",
            "2.5",
        ]);
        assert_eq!(args.n_work, 1000);
        assert_eq!(
            args.strategies(),
            vec![PlacementStrategy::Logical(LogicalMapping::Interleaved)]
        );
        assert_eq!(args.join_timeout(), Ok(Some(Duration::from_millis(2500))));
    }

    #[test]
    fn test_bad_mapping_rejected() {
        assert!(CpuArgs::try_parse_from(["hyperthreading-bench", "--logical-mapping", "x"]).is_err());
    }

    #[test]
    fn test_negative_timeout_rejected() {
        let args = CpuArgs::parse_from(["hyperthreading-bench", "--join-timeout-secs=-1"]);
        assert!(args.join_timeout().is_err());
    }
}
