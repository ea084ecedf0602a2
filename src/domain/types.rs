//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - produced tick by tick during acquisition
//! - handed to the fitter as parallel slices
//! - exported to CSV/JSON and reloaded later

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// One acquisition tick: when it was taken, the heater power and the
/// platform temperature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    /// Heater power in watts (`current * voltage`).
    pub power: f64,
    pub temperature: f64,
}

/// Samples of one measurement run, stored as three parallel columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSeries {
    timestamps: Vec<f64>,
    powers: Vec<f64>,
    temperatures: Vec<f64>,
}

impl RawSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            timestamps: Vec::with_capacity(capacity),
            powers: Vec::with_capacity(capacity),
            temperatures: Vec::with_capacity(capacity),
        }
    }

    /// Build a series from columns, which must have equal length.
    pub fn from_parts(
        timestamps: Vec<f64>,
        powers: Vec<f64>,
        temperatures: Vec<f64>,
    ) -> Result<Self, AppError> {
        if timestamps.len() != powers.len() || timestamps.len() != temperatures.len() {
            return Err(AppError::precondition(format!(
                "Series columns differ in length: timestamps={}, powers={}, temperatures={}.",
                timestamps.len(),
                powers.len(),
                temperatures.len()
            )));
        }
        Ok(Self {
            timestamps,
            powers,
            temperatures,
        })
    }

    pub fn push(&mut self, sample: Sample) {
        self.timestamps.push(sample.timestamp);
        self.powers.push(sample.power);
        self.temperatures.push(sample.temperature);
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Sample> {
        Some(Sample {
            timestamp: *self.timestamps.get(index)?,
            power: *self.powers.get(index)?,
            temperature: *self.temperatures.get(index)?,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = Sample> + '_ {
        (0..self.len()).filter_map(|i| self.get(i))
    }

    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    pub fn powers(&self) -> &[f64] {
        &self.powers
    }

    pub fn temperatures(&self) -> &[f64] {
        &self.temperatures
    }

    /// Split into `(timestamps, powers, temperatures)`.
    pub fn into_parts(self) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        (self.timestamps, self.powers, self.temperatures)
    }
}

/// Summary stats about a raw series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesStats {
    pub n_samples: usize,
    pub duration: f64,
    pub mean_interval: f64,
    pub power_min: f64,
    pub power_max: f64,
    pub temperature_min: f64,
    pub temperature_max: f64,
}

impl SeriesStats {
    /// `None` for an empty series.
    pub fn compute(series: &RawSeries) -> Option<Self> {
        let first = series.get(0)?;
        let last = series.get(series.len() - 1)?;
        let duration = last.timestamp - first.timestamp;
        let mean_interval = if series.len() > 1 {
            duration / (series.len() - 1) as f64
        } else {
            0.0
        };
        let (power_min, power_max) = min_max(series.powers());
        let (temperature_min, temperature_max) = min_max(series.temperatures());
        Some(Self {
            n_samples: series.len(),
            duration,
            mean_interval,
            power_min,
            power_max,
            temperature_min,
            temperature_max,
        })
    }
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

/// Continuous-to-discrete conversion used when simulating a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Discretization {
    /// Zero-order hold: the input is held constant over each step.
    Zoh,
    /// Bilinear (Tustin) transform: the input is averaged over each step.
    Bilinear,
}

/// Adaptive measurement phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Baseline,
    Pulse,
    Decay,
}

impl Phase {
    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            Phase::Baseline => "baseline",
            Phase::Pulse => "pulse",
            Phase::Decay => "decay",
        }
    }
}

/// Where one adaptive phase sits in the raw series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseSpan {
    pub phase: Phase,
    /// Index of the first sample taken in this phase.
    pub first_index: usize,
    pub samples: usize,
    /// Wall-clock seconds from the first tick of the phase to the first tick
    /// of the next one.
    pub elapsed: f64,
}

/// Fit quality diagnostics for the derivative regression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitQuality {
    /// Root-mean-square residual of `dy/dt` (temperature units per second).
    pub rmse: f64,
    pub n: usize,
    /// Time span covered by the fitted samples, in seconds.
    pub span: f64,
}

/// A saved model file (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFile {
    pub tool: String,
    pub generated: DateTime<Utc>,
    pub num: [f64; 2],
    pub den: [f64; 2],
    pub heat_capacity: f64,
    pub thermal_conductivity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fit_quality: Option<FitQuality>,
}

/// Where the simulated sample's model comes from.
#[derive(Debug, Clone)]
pub enum ModelSource {
    /// Heat capacity and thermal conductivity given directly.
    Ck {
        heat_capacity: f64,
        thermal_conductivity: f64,
    },
    /// A model JSON written by a previous fit.
    File(PathBuf),
}

/// Optional outputs of a run.
#[derive(Debug, Clone, Default)]
pub struct ExportConfig {
    pub series: Option<PathBuf>,
    pub model: Option<PathBuf>,
}
