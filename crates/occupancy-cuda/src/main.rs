//! Tiled matrix multiply timed per SM placement mode.
//!
//! ```bash
//! sm-occupancy-bench
//! sm-occupancy-bench -device=1 -wA=640 -hB=640
//! sm-occupancy-bench --trace --modes one-per-sm,two-per-sm > run.log
//! sm-timeline run.log
//! ```

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use occupancy_core::{VerifyReport, RELATIVE_TOLERANCE};
use occupancy_cuda::{normalize_legacy_args, CudaContext, GpuArgs, ModeOutcome, SmBenchmark};
use tracing::error;

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

/// Print the outcome of one mode and return whether it passed.
fn report(outcome: &ModeOutcome) -> bool {
    let mode = outcome.mode.name();
    for record in &outcome.trace {
        println!("{}", record.to_line(mode));
    }

    let measured = match outcome.throughput() {
        Ok(t) => {
            println!(
                "Performance= {:.2} GFlop/s, Time= {:.3} msec, Size= {:.0} Ops, WorkgroupSize= {} threads/block",
                t.giga_ops_per_sec,
                t.msecs_per_iteration(),
                t.ops_per_iteration,
                outcome.shape.threads_per_block()
            );
            true
        }
        Err(fault) => {
            error!(mode, %fault, "measurement fault");
            eprintln!("{}: {mode}: {fault}", here!());
            false
        }
    };

    let mut combined = VerifyReport::default();
    for unit in &outcome.unit_reports {
        combined.merge(unit.clone());
    }
    for m in &combined.mismatches {
        println!(
            "Error! Matrix[{:05}]={:.8}, ref={:.8} error term is > {:E}",
            m.index, m.value, m.expected, RELATIVE_TOLERANCE
        );
    }

    let passed = measured && combined.passed();
    println!("Result = {}", if passed { "PASS" } else { "FAIL" });
    passed
}

fn run(args: &GpuArgs) -> Result<bool> {
    println!("[Matrix Multiply Using CUDA] - Starting...");

    // Checked before any device work.
    let workload = args
        .workload()
        .with_context(|| format!("{}: invalid matrix dimensions", here!()))?;

    let ctx = CudaContext::new_on_device(args.device)
        .with_context(|| format!("{}: device {} init", here!(), args.device))?;
    println!(
        "GPU Device {}: \"{}\" with {} SMs",
        ctx.ordinal(),
        ctx.device_name(),
        ctx.sm_count()
    );
    let (a, b) = (workload.a(), workload.b());
    println!(
        "MatrixA({},{}), MatrixB({},{})",
        a.width, a.height, b.width, b.height
    );

    let bench = SmBenchmark::new(&ctx, workload, args.iterations, args.trace)
        .with_context(|| format!("{}: host buffers", here!()))?;

    let mut all_passed = true;
    for &mode in &args.modes {
        println!(
            "Running {mode}: {} kernel(s) per iteration, {} iterations",
            mode.concurrency(ctx.sm_count()),
            args.iterations
        );
        let outcome = bench
            .run_mode(mode)
            .with_context(|| format!("{}: {mode} mode", here!()))?;
        all_passed &= report(&outcome);
    }

    drop(bench);
    ctx.teardown();
    Ok(all_passed)
}

fn main() -> ExitCode {
    let args = GpuArgs::parse_from(normalize_legacy_args(std::env::args()));
    init_tracing(&args.log_level);

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
