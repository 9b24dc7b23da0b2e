//! Summarize per-SM trace lines captured from `sm-occupancy-bench --trace`.
//!
//! Cycle counts are rebased so that every mode starts at cycle 0.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use occupancy_core::Timeline;

/// Group traced blocks by mode and SM.
#[derive(Debug, Parser)]
#[command(name = "sm-timeline", version)]
struct Args {
    /// Captured stdout of a traced benchmark run.
    log: PathBuf,
}

fn run(args: &Args) -> Result<()> {
    let text = std::fs::read_to_string(&args.log)
        .with_context(|| format!("reading {}", args.log.display()))?;
    let timeline = Timeline::from_lines(text.lines());
    if timeline.is_empty() {
        bail!("no trace lines in {}", args.log.display());
    }

    for mode in timeline.modes() {
        let Some(per_sm) = timeline.spans(mode) else {
            continue;
        };
        let blocks: usize = per_sm.values().map(Vec::len).sum();
        println!(
            "{mode}: {} SMs, {blocks} blocks, makespan {} cycles",
            per_sm.len(),
            timeline.makespan(mode).unwrap_or(0)
        );
        for (sm, spans) in per_sm {
            for span in spans {
                println!("  sm {sm:>3}: {:>12} .. {:>12}", span.start, span.end);
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
