//! Command-line parsing for the heat capacity tool.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! measurement and fitting code. Every option can also be set through an
//! `HC_*` environment variable (or a `.env` file).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{Discretization, ExportConfig, ModelSource};
use crate::instrument::SimulationConfig;
use crate::measure::{AdaptiveConfig, DEFAULT_DERIV_THRESHOLD, DEFAULT_POLYORDER, PulseConfig};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "hc", version, about = "Heat capacity measurement and first-order model fitting")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a simulated baseline-then-pulse measurement and fit it.
    Pulse(PulseArgs),
    /// Run a simulated adaptive-step measurement and fit it.
    ///
    /// The pulse phase is held until the smoothed derivative of
    /// temperature/power settles below the threshold.
    Adaptive(AdaptiveArgs),
    /// Fit a previously exported series CSV.
    Fit(FitArgs),
}

/// Simulated sample and heater.
#[derive(Debug, Args, Clone)]
pub struct SimArgs {
    /// Heat capacity of the simulated sample (J/K).
    #[arg(long, env = "HC_HEAT_CAPACITY", default_value_t = 0.005)]
    pub heat_capacity: f64,

    /// Thermal conductivity of the simulated sample (W/K).
    #[arg(long, env = "HC_THERMAL_CONDUCTIVITY", default_value_t = 0.002)]
    pub thermal_conductivity: f64,

    /// Simulate a model JSON written by `--export-model` instead of C/K.
    #[arg(long, env = "HC_MODEL", value_name = "JSON")]
    pub model: Option<PathBuf>,

    /// Heater resistance (ohm).
    #[arg(long, env = "HC_HEATER_RESISTANCE", default_value_t = 1e3)]
    pub resistance: f64,

    /// Standard deviation of the temperature noise.
    #[arg(long, env = "HC_NOISE", default_value_t = 0.0)]
    pub noise: f64,

    /// Noise RNG seed.
    #[arg(long, env = "HC_SEED", default_value_t = 42)]
    pub seed: u64,

    /// Temperature before the first tick.
    #[arg(long, env = "HC_INITIAL_TEMPERATURE", default_value_t = 0.0)]
    pub initial_temperature: f64,

    /// How the model is discretized for simulation.
    #[arg(long, env = "HC_DISCRETIZATION", value_enum, default_value_t = Discretization::Zoh)]
    pub discretization: Discretization,

    /// Tick duration (seconds).
    #[arg(short = 't', long, env = "HC_SAMPLING_TIME", default_value_t = 0.1)]
    pub sampling_time: f64,
}

impl SimArgs {
    pub fn model_source(&self) -> ModelSource {
        match &self.model {
            Some(path) => ModelSource::File(path.clone()),
            None => ModelSource::Ck {
                heat_capacity: self.heat_capacity,
                thermal_conductivity: self.thermal_conductivity,
            },
        }
    }

    pub fn simulation_config(&self) -> SimulationConfig {
        SimulationConfig {
            heater_resistance: self.resistance,
            noise_scale: self.noise,
            sampling_time: self.sampling_time,
            initial_temperature: self.initial_temperature,
            discretization: self.discretization,
            seed: self.seed,
        }
    }
}

/// Optional outputs.
#[derive(Debug, Args, Clone, Default)]
pub struct ExportArgs {
    /// Export the raw series to CSV.
    #[arg(long, env = "HC_EXPORT", value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Export the fitted model to JSON.
    #[arg(long = "export-model", env = "HC_EXPORT_MODEL", value_name = "JSON")]
    pub export_model: Option<PathBuf>,
}

impl ExportArgs {
    pub fn to_config(&self) -> ExportConfig {
        ExportConfig {
            series: self.export.clone(),
            model: self.export_model.clone(),
        }
    }
}

/// Options for a fixed pulse run.
#[derive(Debug, Args, Clone)]
pub struct PulseArgs {
    #[command(flatten)]
    pub sim: SimArgs,

    /// Ticks at 0 A before the pulse.
    #[arg(long, env = "HC_BASELINE_TICKS", default_value_t = 60)]
    pub baseline_ticks: usize,

    /// Ticks at the pulse current.
    #[arg(long, env = "HC_PULSE_TICKS", default_value_t = 60)]
    pub pulse_ticks: usize,

    /// Pulse current (A).
    #[arg(long, env = "HC_CURRENT", default_value_t = 1.0)]
    pub current: f64,

    #[command(flatten)]
    pub export: ExportArgs,
}

impl PulseArgs {
    pub fn pulse_config(&self) -> PulseConfig {
        PulseConfig {
            baseline_ticks: self.baseline_ticks,
            pulse_ticks: self.pulse_ticks,
            current: self.current,
            sampling_time: self.sim.sampling_time,
        }
    }
}

/// Options for an adaptive-step run.
#[derive(Debug, Args, Clone)]
pub struct AdaptiveArgs {
    #[command(flatten)]
    pub sim: SimArgs,

    /// Current during baseline and decay (A).
    #[arg(long, env = "HC_MIN_CURRENT", default_value_t = 0.0)]
    pub min_current: f64,

    /// Current during the pulse (A).
    #[arg(long, env = "HC_MAX_CURRENT", default_value_t = 1.0)]
    pub max_current: f64,

    /// Baseline duration and minimum pulse duration (seconds).
    #[arg(long, env = "HC_DURATION", default_value_t = 6.0)]
    pub duration: f64,

    /// Largest |d(T/P)/dt| at which the pulse may end.
    #[arg(long, env = "HC_DERIV_THRESHOLD", default_value_t = DEFAULT_DERIV_THRESHOLD)]
    pub deriv_threshold: f64,

    /// Derivative filter window (samples, odd). Defaults to duration/sampling/5.
    #[arg(long, env = "HC_WINDOW")]
    pub window: Option<usize>,

    /// Derivative filter polynomial order.
    #[arg(long, env = "HC_POLYORDER", default_value_t = DEFAULT_POLYORDER)]
    pub polyorder: usize,

    #[command(flatten)]
    pub export: ExportArgs,
}

impl AdaptiveArgs {
    pub fn adaptive_config(&self) -> AdaptiveConfig {
        AdaptiveConfig {
            deriv_threshold: self.deriv_threshold,
            window: self.window,
            polyorder: self.polyorder,
            ..AdaptiveConfig::new(self.min_current, self.max_current, self.duration, self.sim.sampling_time)
        }
    }
}

/// Options for fitting a saved series.
#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// Series CSV with `timestamp,power,temperature` columns.
    #[arg(short = 'i', long, value_name = "CSV")]
    pub input: PathBuf,

    /// Export the fitted model to JSON.
    #[arg(long = "export-model", env = "HC_EXPORT_MODEL", value_name = "JSON")]
    pub export_model: Option<PathBuf>,
}
