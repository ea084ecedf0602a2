//! Fixed-sequence measurement: one predefined current per tick.

use std::time::Instant;

use log::info;
use serde::{Deserialize, Serialize};

use crate::domain::RawSeries;
use crate::error::AppError;
use crate::instrument::Rig;
use crate::measure::engine::{AcquisitionPolicy, Measurement};

/// Replays an excitation sequence, one setpoint per tick.
#[derive(Debug, Clone)]
pub struct PulseSequence {
    setpoints: Vec<f64>,
    next: usize,
}

impl PulseSequence {
    pub fn new(setpoints: Vec<f64>) -> Result<Self, AppError> {
        if let Some(bad) = setpoints.iter().find(|v| !v.is_finite()) {
            return Err(AppError::precondition(format!(
                "Excitation sequence contains a non-finite current ({bad})."
            )));
        }
        Ok(Self { setpoints, next: 0 })
    }

    /// `baseline` ticks at 0 A followed by `pulse` ticks at `current`.
    pub fn step(baseline: usize, pulse: usize, current: f64) -> Result<Self, AppError> {
        let mut setpoints = vec![0.0; baseline];
        setpoints.extend(std::iter::repeat_n(current, pulse));
        Self::new(setpoints)
    }

    pub fn setpoints(&self) -> &[f64] {
        &self.setpoints
    }
}

impl AcquisitionPolicy for PulseSequence {
    fn next_setpoint(&mut self, _now: Instant) -> Option<f64> {
        let current = self.setpoints.get(self.next).copied()?;
        self.next += 1;
        Some(current)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.setpoints.len())
    }
}

/// A baseline-then-pulse step excitation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseConfig {
    /// Ticks at 0 A before the pulse.
    pub baseline_ticks: usize,
    /// Ticks at `current` after the baseline.
    pub pulse_ticks: usize,
    /// Pulse current in amperes.
    pub current: f64,
    /// Tick duration in seconds.
    pub sampling_time: f64,
}

impl PulseConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.sampling_time.is_finite() && self.sampling_time > 0.0) {
            return Err(AppError::precondition(format!(
                "Sampling time must be finite and > 0, got {}.",
                self.sampling_time
            )));
        }
        if !self.current.is_finite() {
            return Err(AppError::precondition("Pulse current must be finite."));
        }
        Ok(())
    }

    pub fn sequence(&self) -> Result<PulseSequence, AppError> {
        self.validate()?;
        PulseSequence::step(self.baseline_ticks, self.pulse_ticks, self.current)
    }

    /// Planned duration of the run in seconds.
    pub fn duration(&self) -> f64 {
        (self.baseline_ticks + self.pulse_ticks) as f64 * self.sampling_time
    }
}

/// A heat capacity measurement using a predefined pulse sequence.
#[derive(Debug)]
pub struct PulseMeasurement<R> {
    engine: Measurement<R>,
    pulse: PulseSequence,
}

impl<R: Rig> PulseMeasurement<R> {
    pub fn new(rig: R, pulse: PulseSequence, sampling_time: f64) -> Result<Self, AppError> {
        Ok(Self {
            engine: Measurement::new(rig, sampling_time)?,
            pulse,
        })
    }

    /// Apply the whole sequence and return the recorded series.
    ///
    /// Each call replays the sequence from the start.
    pub fn start(&mut self) -> Result<RawSeries, AppError> {
        info!(
            "pulse measurement: {} ticks at {:.4}s",
            self.pulse.setpoints.len(),
            self.engine.sampling_time()
        );
        let mut policy = self.pulse.clone();
        self.engine.run(&mut policy)
    }

    pub fn rig(&self) -> &R {
        self.engine.rig()
    }

    pub fn into_rig(self) -> R {
        self.engine.into_rig()
    }
}
