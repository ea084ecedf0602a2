//! Adaptive three-phase measurement.
//!
//! The run goes through three phases, all sampled at the same rate:
//!
//! - **baseline**: `min_current` for `duration` seconds
//! - **pulse**: `max_current` until `duration` has elapsed *and* the smoothed
//!   derivative of the signal is within `deriv_threshold`
//! - **decay**: `min_current` for as long as the pulse actually lasted
//!
//! The signal is `temperature / power`, or the raw temperature on ticks where
//! the power is exactly zero. Its derivative is estimated with a trailing
//! Savitzky–Golay filter evaluated at the newest sample.

use std::collections::VecDeque;
use std::time::Instant;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::domain::{Phase, PhaseSpan, RawSeries, Sample};
use crate::error::AppError;
use crate::instrument::Rig;
use crate::math::{ceil_odd, derivative_weights};
use crate::measure::engine::{AcquisitionPolicy, Measurement};

pub const DEFAULT_DERIV_THRESHOLD: f64 = 1.0;
pub const DEFAULT_POLYORDER: usize = 2;

/// Adaptive measurement settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptiveConfig {
    /// Heater current during baseline and decay, in amperes.
    pub min_current: f64,
    /// Heater current during the pulse, in amperes.
    pub max_current: f64,
    /// Baseline duration and minimum pulse duration, in seconds.
    pub duration: f64,
    pub sampling_time: f64,
    /// Largest `|d signal/dt|` at which the pulse may end.
    pub deriv_threshold: f64,
    /// Filter window in samples; odd. Derived from `duration` when unset.
    pub window: Option<usize>,
    pub polyorder: usize,
}

impl AdaptiveConfig {
    pub fn new(min_current: f64, max_current: f64, duration: f64, sampling_time: f64) -> Self {
        Self {
            min_current,
            max_current,
            duration,
            sampling_time,
            deriv_threshold: DEFAULT_DERIV_THRESHOLD,
            window: None,
            polyorder: DEFAULT_POLYORDER,
        }
    }

    /// Filter window actually used.
    ///
    /// Defaults to a fifth of the samples in one `duration`, rounded up to
    /// the next odd count and kept above the polynomial order.
    pub fn window_len(&self) -> usize {
        self.window.unwrap_or_else(|| {
            let per_duration = (self.duration / self.sampling_time / 5.0).ceil();
            let samples = if per_duration.is_finite() && per_duration > 0.0 {
                per_duration as usize
            } else {
                0
            };
            ceil_odd(samples.max(self.polyorder + 2))
        })
    }

    pub fn validate(&self) -> Result<(), AppError> {
        for (name, value) in [("min_current", self.min_current), ("max_current", self.max_current)] {
            if !value.is_finite() {
                return Err(AppError::precondition(format!("{name} must be finite, got {value}.")));
            }
        }
        if !(self.duration.is_finite() && self.duration > 0.0) {
            return Err(AppError::precondition(format!(
                "Phase duration must be finite and > 0, got {}.",
                self.duration
            )));
        }
        if !(self.sampling_time.is_finite() && self.sampling_time > 0.0) {
            return Err(AppError::precondition(format!(
                "Sampling time must be finite and > 0, got {}.",
                self.sampling_time
            )));
        }
        if !(self.deriv_threshold.is_finite() && self.deriv_threshold >= 0.0) {
            return Err(AppError::precondition(format!(
                "Derivative threshold must be finite and >= 0, got {}.",
                self.deriv_threshold
            )));
        }
        let window = self.window_len();
        if window % 2 == 0 {
            return Err(AppError::precondition(format!("Filter window must be odd, got {window}.")));
        }
        if self.polyorder == 0 || self.polyorder >= window {
            return Err(AppError::precondition(format!(
                "Polynomial order must be in 1..{window}, got {}.",
                self.polyorder
            )));
        }
        Ok(())
    }
}

/// Trailing smoothing differentiator with its derivative history.
///
/// The weights assume evenly spaced samples; the step used to scale them is
/// the mean spacing of the buffered timestamps, so ticks that run long do not
/// inflate the estimate.
#[derive(Debug, Clone)]
pub struct DerivativeFilter {
    /// Nominal spacing, used until two distinct timestamps are buffered.
    dt: f64,
    window: usize,
    polyorder: usize,
    /// Weights for a full window.
    weights: Vec<f64>,
    buffer: VecDeque<(f64, f64)>,
    trace: Vec<f64>,
}

impl DerivativeFilter {
    pub fn new(window: usize, polyorder: usize, dt: f64) -> Result<Self, AppError> {
        if window < 2 {
            return Err(AppError::precondition(format!(
                "Filter window must be at least 2 samples, got {window}."
            )));
        }
        if !(dt.is_finite() && dt > 0.0) {
            return Err(AppError::precondition(format!(
                "Filter step must be finite and > 0, got {dt}."
            )));
        }
        Ok(Self {
            dt,
            window,
            polyorder,
            weights: derivative_weights(window, polyorder)?,
            buffer: VecDeque::with_capacity(window),
            trace: Vec::new(),
        })
    }

    /// Add a sample taken at `timestamp` and return the derivative estimate
    /// at it.
    pub fn push(&mut self, timestamp: f64, value: f64) -> Result<f64, AppError> {
        if self.buffer.len() == self.window {
            self.buffer.pop_front();
        }
        self.buffer.push_back((timestamp, value));

        let len = self.buffer.len();
        let derivative = match len {
            1 => 0.0,
            n if n == self.window => self.apply(&self.weights),
            // Until the window fills, fit the samples available with a reduced order.
            n => self.apply(&derivative_weights(n, self.polyorder.min(n - 1))?),
        };
        self.trace.push(derivative);
        Ok(derivative)
    }

    fn apply(&self, weights: &[f64]) -> f64 {
        let sum: f64 = weights.iter().zip(self.buffer.iter()).map(|(w, (_, y))| w * y).sum();
        sum / self.spacing()
    }

    fn spacing(&self) -> f64 {
        let (Some((first, _)), Some((last, _))) = (self.buffer.front(), self.buffer.back()) else {
            return self.dt;
        };
        let mean = (last - first) / (self.buffer.len() - 1) as f64;
        if mean.is_finite() && mean > 0.0 { mean } else { self.dt }
    }

    /// Most recent estimate (0 before the first sample).
    pub fn latest(&self) -> f64 {
        self.trace.last().copied().unwrap_or(0.0)
    }

    pub fn trace(&self) -> &[f64] {
        &self.trace
    }

    pub fn into_trace(self) -> Vec<f64> {
        self.trace
    }
}

/// Signal whose derivative drives the stopping rule.
pub fn stability_signal(sample: &Sample) -> f64 {
    if sample.power == 0.0 {
        sample.temperature
    } else {
        sample.temperature / sample.power
    }
}

/// Baseline / pulse / decay state machine.
#[derive(Debug, Clone)]
pub struct AdaptiveStep {
    config: AdaptiveConfig,
    filter: DerivativeFilter,
    phase: Phase,
    phase_start: Option<Instant>,
    pulse_elapsed: f64,
    spans: Vec<PhaseSpan>,
    samples: usize,
    done: bool,
}

impl AdaptiveStep {
    pub fn new(config: AdaptiveConfig) -> Result<Self, AppError> {
        config.validate()?;
        let filter = DerivativeFilter::new(config.window_len(), config.polyorder, config.sampling_time)?;
        Ok(Self {
            config,
            filter,
            phase: Phase::Baseline,
            phase_start: None,
            pulse_elapsed: 0.0,
            spans: Vec::new(),
            samples: 0,
            done: false,
        })
    }

    fn setpoint(&self) -> f64 {
        match self.phase {
            Phase::Pulse => self.config.max_current,
            Phase::Baseline | Phase::Decay => self.config.min_current,
        }
    }

    fn close_span(&mut self, elapsed: f64) {
        if let Some(span) = self.spans.last_mut() {
            span.elapsed = elapsed;
        }
        debug!("{} phase finished after {elapsed:.3}s", self.phase.display_name());
    }

    fn open_span(&mut self, phase: Phase, now: Instant) {
        self.phase = phase;
        self.phase_start = Some(now);
        self.spans.push(PhaseSpan {
            phase,
            first_index: self.samples,
            samples: 0,
            elapsed: 0.0,
        });
        info!("entering {} phase", phase.display_name());
    }
}

impl AcquisitionPolicy for AdaptiveStep {
    fn next_setpoint(&mut self, now: Instant) -> Option<f64> {
        if self.done {
            return None;
        }
        let Some(start) = self.phase_start else {
            self.open_span(Phase::Baseline, now);
            return Some(self.setpoint());
        };
        let elapsed = now.duration_since(start).as_secs_f64();

        match self.phase {
            Phase::Baseline => {
                if elapsed >= self.config.duration {
                    self.close_span(elapsed);
                    self.open_span(Phase::Pulse, now);
                }
            }
            Phase::Pulse => {
                let derivative = self.filter.latest();
                if elapsed >= self.config.duration && derivative.abs() <= self.config.deriv_threshold {
                    self.pulse_elapsed = elapsed;
                    self.close_span(elapsed);
                    self.open_span(Phase::Decay, now);
                }
            }
            Phase::Decay => {
                if elapsed >= self.pulse_elapsed {
                    self.close_span(elapsed);
                    self.done = true;
                    return None;
                }
            }
        }
        Some(self.setpoint())
    }

    fn observe(&mut self, sample: &Sample) -> Result<(), AppError> {
        self.filter.push(sample.timestamp, stability_signal(sample))?;
        self.samples += 1;
        if let Some(span) = self.spans.last_mut() {
            span.samples += 1;
        }
        Ok(())
    }
}

/// Everything an adaptive run produced.
#[derive(Debug, Clone)]
pub struct AdaptiveRun {
    pub series: RawSeries,
    /// Smoothed derivative at each sample.
    pub derivative: Vec<f64>,
    pub phases: Vec<PhaseSpan>,
}

/// A heat capacity measurement with an adaptive pulse length.
#[derive(Debug)]
pub struct AdaptiveMeasurement<R> {
    engine: Measurement<R>,
    config: AdaptiveConfig,
}

impl<R: Rig> AdaptiveMeasurement<R> {
    pub fn new(rig: R, config: AdaptiveConfig) -> Result<Self, AppError> {
        config.validate()?;
        Ok(Self {
            engine: Measurement::new(rig, config.sampling_time)?,
            config,
        })
    }

    pub fn config(&self) -> &AdaptiveConfig {
        &self.config
    }

    /// Run all three phases and return the concatenated series.
    pub fn start(&mut self) -> Result<RawSeries, AppError> {
        Ok(self.start_verbose()?.series)
    }

    /// Like [`start`](Self::start), also returning the derivative trace and
    /// the phase layout.
    pub fn start_verbose(&mut self) -> Result<AdaptiveRun, AppError> {
        info!(
            "adaptive measurement: {}..{} A, duration {:.3}s, window {}",
            self.config.min_current,
            self.config.max_current,
            self.config.duration,
            self.config.window_len()
        );
        let mut policy = AdaptiveStep::new(self.config.clone())?;
        let series = self.engine.run(&mut policy)?;
        let phases = policy.spans.clone();
        Ok(AdaptiveRun {
            series,
            derivative: policy.filter.into_trace(),
            phases,
        })
    }

    pub fn rig(&self) -> &R {
        self.engine.rig()
    }

    pub fn into_rig(self) -> R {
        self.engine.into_rig()
    }
}
