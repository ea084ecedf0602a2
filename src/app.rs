//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - runs a simulated measurement or loads a saved series
//! - fits the first-order model
//! - prints the report
//! - writes optional exports

use clap::Parser;
use log::warn;

use crate::cli::{AdaptiveArgs, Cli, Command, FitArgs, PulseArgs};
use crate::error::AppError;

pub mod pipeline;

use pipeline::RunOutput;

/// Entry point for the `hc` binary.
pub fn run() -> Result<(), AppError> {
    // Missing `.env` is fine; variables may come from the shell.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Command::Pulse(args) => handle_pulse(args),
        Command::Adaptive(args) => handle_adaptive(args),
        Command::Fit(args) => handle_fit(args),
    }
}

fn handle_pulse(args: PulseArgs) -> Result<(), AppError> {
    let run = pipeline::run_pulse(
        &args.sim.model_source(),
        &args.sim.simulation_config(),
        &args.pulse_config(),
        &args.export.to_config(),
    )?;
    print_run(&run);
    Ok(())
}

fn handle_adaptive(args: AdaptiveArgs) -> Result<(), AppError> {
    let run = pipeline::run_adaptive(
        &args.sim.model_source(),
        &args.sim.simulation_config(),
        &args.adaptive_config(),
        &args.export.to_config(),
    )?;
    print_run(&run);
    Ok(())
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let run = pipeline::run_fit(&args.input, args.export_model.as_deref())?;
    print_run(&run);
    Ok(())
}

fn print_run(run: &RunOutput) {
    if !run.fit.model.is_physical() {
        warn!(
            "fitted model is not physical: C={:.4e}, K={:.4e}",
            run.fit.model.heat_capacity(),
            run.fit.model.thermal_conductivity()
        );
    }
    println!(
        "{}",
        crate::report::format_run_summary(&run.series, &run.fit, run.reference.as_ref())
    );
    if !run.phases.is_empty() {
        println!("{}", crate::report::format_phases(&run.phases));
    }
}
