//! Physical versus hyperthreaded core throughput.
//!
//! ```bash
//! hyperthreading-bench
//! hyperthreading-bench --strategy logical --logical-mapping interleaved
//! RUST_LOG=debug hyperthreading-bench --n-work 100000000 --join-timeout-secs 60
//! ```

use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use occupancy_core::{AccumulateWorkload, Topology};
use occupancy_cpu::{CoreAffinityBinder, CpuArgs, HwlocTopology, ParallelRegion};
use tracing::warn;

/// `file:line` of the call site, attached to fatal errors.
macro_rules! here {
    () => {
        concat!(file!(), ":", line!())
    };
}

fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &CpuArgs) -> Result<()> {
    let workload = AccumulateWorkload::new(args.n_work).context(here!())?;
    let join_timeout = args.join_timeout().map_err(|e| anyhow!("{}: {e}", here!()))?;

    let topology = HwlocTopology::init().with_context(|| format!("{}: topology init", here!()))?;
    println!("Number of physical cores: {}", topology.physical_unit_count());
    println!("Number of logical cores: {}", topology.logical_unit_count());

    let region = ParallelRegion::new(CoreAffinityBinder).with_join_timeout(join_timeout);
    let mut summary = Vec::new();
    for strategy in args.strategies() {
        let outcome = region
            .run(&topology, strategy, workload)
            .with_context(|| format!("{}: {} placement", here!(), strategy.name()))?;
        if !outcome.checksums_match(&workload) {
            warn!(strategy = strategy.name(), "worker accumulators disagree with the closed form");
        }
        let throughput = outcome
            .throughput()
            .with_context(|| format!("{}: {} throughput", here!(), strategy.name()))?;

        println!(
            "{}: units= {} t= {:.6} s total_ops= {} gops= {:.3}",
            strategy.name(),
            outcome.units,
            outcome.sample.elapsed_secs(),
            outcome.total_ops,
            throughput.giga_ops_per_sec
        );
        summary.push((strategy.name(), outcome.sample.elapsed_secs(), throughput));
    }

    if let [(_, t_phys, phys), (_, t_logical, logical)] = summary.as_slice() {
        println!("t_phys: {t_phys} t_logical: {t_logical}");
        println!(
            "gops_phys: {} gops_logical: {}",
            phys.giga_ops_per_sec, logical.giga_ops_per_sec
        );
    }

    topology.teardown();
    Ok(())
}

fn main() -> ExitCode {
    let args = CpuArgs::parse();
    init_tracing(&args.log_level);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
