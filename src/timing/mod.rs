//! Sampling scheduler.
//!
//! Every acquisition tick runs through [`run_tick`] or [`try_tick`]: the body
//! executes immediately and the call then polls until `step` seconds have
//! passed since the body started. Polling with a sleep of 1 % of the step
//! bounds the overshoot much better than a single sleep for the remainder.
//!
//! A body that overruns the step is not an error; the tick just runs long and
//! the drift is not caught up.

use std::time::{Duration, Instant};

use chrono::Utc;
use log::debug;

use crate::error::AppError;

/// Fraction of the step slept between elapsed-time checks.
const POLL_FRACTION: f64 = 0.01;

/// Run `body` as one tick of `step` seconds.
pub fn run_tick<T>(step: f64, body: impl FnOnce() -> T) -> Result<T, AppError> {
    let step = validate_step(step)?;
    let start = Instant::now();
    let out = body();
    wait_out(start, step);
    Ok(out)
}

/// Like [`run_tick`], for fallible bodies. A failed body returns at once,
/// without waiting out the rest of the tick.
pub fn try_tick<T>(
    step: f64,
    body: impl FnOnce() -> Result<T, AppError>,
) -> Result<T, AppError> {
    let step = validate_step(step)?;
    let start = Instant::now();
    let out = body()?;
    wait_out(start, step);
    Ok(out)
}

/// Wall-clock time as seconds since the Unix epoch.
pub fn now_seconds() -> f64 {
    Utc::now().timestamp_micros() as f64 * 1e-6
}

fn validate_step(step: f64) -> Result<Duration, AppError> {
    if !(step.is_finite() && step > 0.0) {
        return Err(AppError::precondition(format!(
            "Sampling step must be finite and > 0, got {step}."
        )));
    }
    Ok(Duration::from_secs_f64(step))
}

fn wait_out(start: Instant, step: Duration) {
    let busy = start.elapsed();
    if busy > step {
        debug!(
            "tick overran: body took {:.4}s of a {:.4}s step",
            busy.as_secs_f64(),
            step.as_secs_f64()
        );
        return;
    }
    let poll = step.mul_f64(POLL_FRACTION);
    while start.elapsed() < step {
        std::thread::sleep(poll);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn tick_lasts_at_least_one_step() {
        let step = 0.05;
        let start = Instant::now();
        let value = run_tick(step, || 7).unwrap();
        assert_eq!(value, 7);
        assert!(start.elapsed().as_secs_f64() >= step);
    }

    #[test]
    fn tick_covers_body_time() {
        let step = 0.04;
        let start = Instant::now();
        run_tick(step, || std::thread::sleep(Duration::from_millis(25))).unwrap();
        let elapsed = start.elapsed().as_secs_f64();
        assert!(elapsed >= step);
        // Overshoot stays well below a full extra step.
        assert!(elapsed < 2.0 * step, "tick took {elapsed}s");
    }

    #[test]
    fn overrunning_body_is_not_padded() {
        let step = 0.01;
        let start = Instant::now();
        run_tick(step, || std::thread::sleep(Duration::from_millis(30))).unwrap();
        let elapsed = start.elapsed().as_secs_f64();
        assert!(elapsed >= 0.03);
        assert!(elapsed < 0.03 + 5.0 * step, "tick took {elapsed}s");
    }

    #[test]
    fn non_positive_step_is_rejected_before_body_runs() {
        for step in [0.0, -0.1, f64::NAN, f64::INFINITY] {
            let mut ran = false;
            let err = run_tick(step, || ran = true).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Precondition);
            assert!(!ran);
        }
    }

    #[test]
    fn failed_body_skips_the_wait() {
        let start = Instant::now();
        let err = try_tick::<()>(1.0, || Err(AppError::instrument("unplugged"))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Instrument);
        assert!(start.elapsed().as_secs_f64() < 0.5);
    }

    #[test]
    fn now_is_epoch_seconds() {
        let now = now_seconds();
        // 2020-01-01 as a sanity floor.
        assert!(now > 1_577_836_800.0);
    }
}
