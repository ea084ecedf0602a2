//! The acquisition loop shared by every measurement strategy.
//!
//! One tick of the loop is:
//!
//! 1. ask the policy for the next current setpoint (or stop)
//! 2. inside a scheduler tick: apply the setpoint, then measure
//! 3. hand the sample back to the policy and append it to the series
//!
//! Policies decide *what* to apply and when to stop; the engine owns the
//! timing and the instruments.

use std::time::Instant;

use log::{info, warn};

use crate::domain::{RawSeries, Sample};
use crate::error::AppError;
use crate::instrument::{Rig, measure};
use crate::timing::try_tick;

/// Decides the excitation for each tick.
pub trait AcquisitionPolicy {
    /// Setpoint (amperes) for the tick starting at `now`, or `None` to finish.
    fn next_setpoint(&mut self, now: Instant) -> Option<f64>;

    /// Called with every recorded sample, in order. An error aborts the run.
    fn observe(&mut self, _sample: &Sample) -> Result<(), AppError> {
        Ok(())
    }

    /// Expected number of samples, when known up front.
    fn size_hint(&self) -> Option<usize> {
        None
    }
}

/// Drives a [`Rig`] at a fixed sampling time.
#[derive(Debug)]
pub struct Measurement<R> {
    rig: R,
    sampling_time: f64,
}

impl<R: Rig> Measurement<R> {
    pub fn new(rig: R, sampling_time: f64) -> Result<Self, AppError> {
        if !(sampling_time.is_finite() && sampling_time > 0.0) {
            return Err(AppError::precondition(format!(
                "Sampling time must be finite and > 0, got {sampling_time}."
            )));
        }
        Ok(Self { rig, sampling_time })
    }

    pub fn sampling_time(&self) -> f64 {
        self.sampling_time
    }

    pub fn rig(&self) -> &R {
        &self.rig
    }

    pub fn into_rig(self) -> R {
        self.rig
    }

    /// Run `policy` to completion.
    ///
    /// The first instrument failure aborts the run. Samples collected up to
    /// that point are dropped; the error says how many there were.
    pub fn run<P: AcquisitionPolicy + ?Sized>(&mut self, policy: &mut P) -> Result<RawSeries, AppError> {
        let mut series = RawSeries::with_capacity(policy.size_hint().unwrap_or(0));
        let rig = &mut self.rig;

        while let Some(current) = policy.next_setpoint(Instant::now()) {
            let tick = try_tick(self.sampling_time, || {
                rig.current_source().set_current(current)?;
                measure(&mut *rig)
            });
            let sample = match tick {
                Ok(sample) => sample,
                Err(err) => {
                    warn!("measurement aborted after {} samples: {err}", series.len());
                    return Err(err.context(format!("aborted after {} samples", series.len())));
                }
            };
            series.push(sample);
            if let Err(err) = policy.observe(&sample) {
                warn!("measurement aborted after {} samples: {err}", series.len());
                return Err(err.context(format!("aborted after {} samples", series.len())));
            }
        }

        info!("measurement finished with {} samples", series.len());
        Ok(series)
    }
}
