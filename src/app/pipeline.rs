//! Shared run pipeline used by every subcommand.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! model -> simulation -> measurement -> fit -> exports
//!
//! The CLI then only has to print the returned [`RunOutput`].

use std::path::Path;

use log::info;

use crate::domain::{ExportConfig, ModelSource, PhaseSpan, RawSeries};
use crate::error::AppError;
use crate::fit::{ModelFit, fit_series};
use crate::instrument::{Simulation, SimulationConfig};
use crate::io::{load_model, read_series_csv, write_model_json, write_series_csv};
use crate::measure::{AdaptiveConfig, AdaptiveMeasurement, PulseConfig, PulseMeasurement};
use crate::models::FirstOrder;

/// All computed outputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub series: RawSeries,
    /// Smoothed derivative trace (adaptive runs only).
    pub derivative: Option<Vec<f64>>,
    /// Phase log (adaptive runs only).
    pub phases: Vec<PhaseSpan>,
    pub fit: ModelFit,
    /// Model the series was simulated from, when known.
    pub reference: Option<FirstOrder>,
}

/// Resolve the model a simulation should run.
pub fn resolve_model(source: &ModelSource) -> Result<FirstOrder, AppError> {
    match source {
        ModelSource::Ck {
            heat_capacity,
            thermal_conductivity,
        } => FirstOrder::from_ck(*heat_capacity, *thermal_conductivity),
        ModelSource::File(path) => load_model(path),
    }
}

/// Simulate a fixed pulse run and fit it.
pub fn run_pulse(
    source: &ModelSource,
    sim: &SimulationConfig,
    pulse: &PulseConfig,
    export: &ExportConfig,
) -> Result<RunOutput, AppError> {
    let model = resolve_model(source)?;
    let sequence = pulse.sequence()?;
    let simulation = Simulation::new(model, &aligned(sim, pulse.sampling_time))?;

    info!("simulating pulse run: C={:.4e}, K={:.4e}", model.heat_capacity(), model.thermal_conductivity());
    let mut measurement = PulseMeasurement::new(simulation, sequence, pulse.sampling_time)?;
    let series = measurement.start()?;

    finish(series, None, Vec::new(), Some(model), export)
}

/// Simulate an adaptive-step run and fit it.
pub fn run_adaptive(
    source: &ModelSource,
    sim: &SimulationConfig,
    adaptive: &AdaptiveConfig,
    export: &ExportConfig,
) -> Result<RunOutput, AppError> {
    let model = resolve_model(source)?;
    let simulation = Simulation::new(model, &aligned(sim, adaptive.sampling_time))?;

    info!(
        "simulating adaptive run: C={:.4e}, K={:.4e}",
        model.heat_capacity(),
        model.thermal_conductivity()
    );
    let mut measurement = AdaptiveMeasurement::new(simulation, adaptive.clone())?;
    let run = measurement.start_verbose()?;

    finish(run.series, Some(run.derivative), run.phases, Some(model), export)
}

/// Fit a saved series CSV.
pub fn run_fit(input: &Path, export_model: Option<&Path>) -> Result<RunOutput, AppError> {
    let series = read_series_csv(input)?;
    let export = ExportConfig {
        series: None,
        model: export_model.map(Path::to_path_buf),
    };
    finish(series, None, Vec::new(), None, &export)
}

/// The simulation steps once per tick, so it must use the tick duration.
fn aligned(sim: &SimulationConfig, sampling_time: f64) -> SimulationConfig {
    SimulationConfig {
        sampling_time,
        ..sim.clone()
    }
}

fn finish(
    series: RawSeries,
    derivative: Option<Vec<f64>>,
    phases: Vec<PhaseSpan>,
    reference: Option<FirstOrder>,
    export: &ExportConfig,
) -> Result<RunOutput, AppError> {
    // Export before fitting so a failed fit still leaves the data behind.
    if let Some(path) = &export.series {
        write_series_csv(path, &series, derivative.as_deref())?;
        info!("wrote series to {}", path.display());
    }

    let fit = fit_series(&series)?;

    if let Some(path) = &export.model {
        write_model_json(path, &fit.model, Some(fit.quality.clone()))?;
        info!("wrote model to {}", path.display());
    }

    Ok(RunOutput {
        series,
        derivative,
        phases,
        fit,
        reference,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Discretization;
    use crate::error::ErrorKind;

    fn quiet_sim() -> SimulationConfig {
        SimulationConfig {
            noise_scale: 0.0,
            discretization: Discretization::Bilinear,
            ..SimulationConfig::default()
        }
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("hc-pipeline-{}-{name}", std::process::id()))
    }

    fn short_pulse() -> PulseConfig {
        PulseConfig {
            baseline_ticks: 10,
            pulse_ticks: 20,
            current: 0.1,
            sampling_time: 0.01,
        }
    }

    #[test]
    fn pulse_run_exports_and_refits() {
        let source = ModelSource::Ck {
            heat_capacity: 0.001,
            thermal_conductivity: 0.01,
        };
        let series_path = temp_path("series.csv");
        let model_path = temp_path("model.json");
        let export = ExportConfig {
            series: Some(series_path.clone()),
            model: Some(model_path.clone()),
        };

        let run = run_pulse(&source, &quiet_sim(), &short_pulse(), &export).unwrap();
        assert_eq!(run.series.len(), 30);
        assert!(run.phases.is_empty());
        assert!(run.fit.model.is_physical());

        let refit = run_fit(&series_path, None).unwrap();
        assert_eq!(refit.series.len(), 30);
        assert!(refit.reference.is_none());
        let rel = (refit.fit.model.heat_capacity() - run.fit.model.heat_capacity()).abs()
            / run.fit.model.heat_capacity();
        assert!(rel < 1e-2, "refit drifted by {rel}");

        // The exported model can drive the next simulation.
        let reloaded = resolve_model(&ModelSource::File(model_path.clone())).unwrap();
        assert!((reloaded.heat_capacity() - run.fit.model.heat_capacity()).abs() < 1e-12);

        let _ = std::fs::remove_file(series_path);
        let _ = std::fs::remove_file(model_path);
    }

    #[test]
    fn adaptive_run_keeps_phase_log() {
        let source = ModelSource::Ck {
            heat_capacity: 0.001,
            thermal_conductivity: 0.01,
        };
        let adaptive = AdaptiveConfig::new(0.0, 0.1, 0.1, 0.01);
        let run = run_adaptive(&source, &quiet_sim(), &adaptive, &ExportConfig::default()).unwrap();

        let derivative = run.derivative.as_ref().unwrap();
        assert_eq!(derivative.len(), run.series.len());
        assert_eq!(run.phases.len(), 3);
        assert_eq!(run.phases.iter().map(|p| p.samples).sum::<usize>(), run.series.len());
    }

    #[test]
    fn missing_model_file_is_an_io_error() {
        let err = resolve_model(&ModelSource::File(temp_path("missing.json"))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn invalid_pulse_is_rejected_before_running() {
        let source = ModelSource::Ck {
            heat_capacity: 0.001,
            thermal_conductivity: 0.01,
        };
        let pulse = PulseConfig {
            sampling_time: -1.0,
            ..short_pulse()
        };
        let err = run_pulse(&source, &quiet_sim(), &pulse, &ExportConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
    }
}
