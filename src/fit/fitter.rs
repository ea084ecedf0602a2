//! First-order model fitting.
//!
//! Given timestamps `t`, temperatures `y` and heater power `u` we:
//!
//! 1. interpolate `y(t)` and `u(t)` with exact cubic splines
//! 2. resample both on a uniform grid with as many points as the input
//! 3. differentiate the temperature spline on that grid
//! 4. solve `dy/dt ≈ r0 * y + r1 * u` by least squares
//!
//! Comparing with `C * dy/dt + K * y = u` gives `r1 = 1/C` and `r0 = -K/C`,
//! i.e. `num = [0, r1]` and `den = [1, -r0]`.
//!
//! Resampling on a uniform grid removes the timing jitter of the acquisition
//! loop from the regression weights.

use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::domain::{FitQuality, RawSeries};
use crate::error::AppError;
use crate::math::{CubicSpline, MIN_SPLINE_POINTS, linspace, solve_least_squares};
use crate::models::FirstOrder;

/// Fitted model plus regression diagnostics.
#[derive(Debug, Clone)]
pub struct ModelFit {
    pub model: FirstOrder,
    pub quality: FitQuality,
}

impl FirstOrder {
    /// Fit a first-order heat capacity model.
    ///
    /// `t` are timestamps in seconds, `y` temperatures and `u` heater powers.
    pub fn fit(t: &[f64], y: &[f64], u: &[f64]) -> Result<Self, AppError> {
        Ok(fit_first_order(t, y, u)?.model)
    }
}

/// Fit a model to a recorded series.
pub fn fit_series(series: &RawSeries) -> Result<ModelFit, AppError> {
    fit_first_order(series.timestamps(), series.temperatures(), series.powers())
}

/// Fit a first-order model and report the regression quality.
pub fn fit_first_order(t: &[f64], y: &[f64], u: &[f64]) -> Result<ModelFit, AppError> {
    if t.len() != y.len() || t.len() != u.len() {
        return Err(AppError::precondition(format!(
            "Fit inputs differ in length: t={}, y={}, u={}.",
            t.len(),
            y.len(),
            u.len()
        )));
    }
    let n = t.len();
    if n < MIN_SPLINE_POINTS {
        return Err(AppError::fit(format!(
            "At least {MIN_SPLINE_POINTS} samples are needed to fit, got {n}."
        )));
    }
    if t.iter().chain(y).chain(u).any(|v| !v.is_finite()) {
        return Err(AppError::fit("Fit input contains non-finite values."));
    }

    // Work relative to the first timestamp; epoch seconds waste precision.
    let t0 = t[0];
    let t_rel: Vec<f64> = t.iter().map(|v| v - t0).collect();

    let y_spline = CubicSpline::not_a_knot(&t_rel, y)?;
    let u_spline = CubicSpline::not_a_knot(&t_rel, u)?;

    let (lo, hi) = y_spline.bounds();
    let grid = linspace(lo, hi, n);
    let yi: Vec<f64> = grid.iter().map(|&g| y_spline.eval(g)).collect();
    let ui: Vec<f64> = grid.iter().map(|&g| u_spline.eval(g)).collect();
    let dyi: Vec<f64> = grid.iter().map(|&g| y_spline.derivative(g)).collect();

    let design = DMatrix::from_fn(n, 2, |i, j| if j == 0 { yi[i] } else { ui[i] });
    let target = DVector::from_column_slice(&dyi);
    let beta = solve_least_squares(&design, &target)?;
    let (r0, r1) = (beta[0], beta[1]);

    let model = FirstOrder::new(&[0.0, r1], &[1.0, -r0])
        .map_err(|e| AppError::fit(format!("Fitted coefficients are invalid: {e}")))?;

    let sse: f64 = (0..n)
        .map(|i| {
            let r = dyi[i] - (r0 * yi[i] + r1 * ui[i]);
            r * r
        })
        .sum();
    let quality = FitQuality {
        rmse: (sse / n as f64).sqrt(),
        n,
        span: hi - lo,
    };

    debug!(
        "fit: C={:.6e} K={:.6e} rmse={:.3e} over {} samples",
        model.heat_capacity(),
        model.thermal_conductivity(),
        quality.rmse,
        n
    );

    Ok(ModelFit { model, quality })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Discretization;
    use crate::error::ErrorKind;
    use crate::instrument::{CurrentSource, Simulation, SimulationConfig, Thermometer};

    /// Drive a noise-free simulation with `currents`, one read per step.
    fn simulate(
        model: FirstOrder,
        currents: &[f64],
        sampling_time: f64,
        discretization: Discretization,
    ) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let config = SimulationConfig {
            heater_resistance: 1e3,
            noise_scale: 0.0,
            sampling_time,
            initial_temperature: 0.0,
            discretization,
            seed: 0,
        };
        let mut sim = Simulation::new(model, &config).unwrap();
        let mut t = Vec::new();
        let mut u = Vec::new();
        let mut y = Vec::new();
        for (i, &current) in currents.iter().enumerate() {
            sim.set_current(current).unwrap();
            t.push(1.7e9 + i as f64 * sampling_time);
            u.push(1e3 * current * current);
            y.push(sim.temperature().unwrap());
        }
        (t, y, u)
    }

    fn rel_err(actual: f64, expected: f64) -> f64 {
        (actual - expected).abs() / expected.abs()
    }

    #[test]
    fn recovers_model_from_step_response() {
        let truth = FirstOrder::from_ck(0.005, 0.002).unwrap();
        let mut currents = vec![0.0; 60];
        currents.extend(vec![1.0; 60]);
        let (t, y, u) = simulate(truth, &currents, 0.1, Discretization::Bilinear);

        let fit = fit_first_order(&t, &y, &u).unwrap();
        assert!(rel_err(fit.model.heat_capacity(), 0.005) < 0.05);
        assert!(rel_err(fit.model.thermal_conductivity(), 0.002) < 0.05);
        assert!(fit.model.is_physical());
        assert_eq!(fit.quality.n, 120);
        assert!((fit.quality.span - 11.9).abs() < 1e-6);
    }

    #[test]
    fn recovers_model_from_zoh_step_response() {
        let truth = FirstOrder::from_ck(0.005, 0.002).unwrap();
        let mut currents = vec![0.0; 60];
        currents.extend(vec![1.0; 60]);
        let (t, y, u) = simulate(truth, &currents, 0.1, Discretization::Zoh);

        let fit = fit_first_order(&t, &y, &u).unwrap();
        assert!(rel_err(fit.model.heat_capacity(), 0.005) < 0.05);
        assert!(rel_err(fit.model.thermal_conductivity(), 0.002) < 0.05);
        assert!(fit.model.is_physical());
    }

    #[test]
    fn smooth_excitation_is_fitted_tightly() {
        let truth = FirstOrder::from_ck(0.005, 0.002).unwrap();
        let currents: Vec<f64> = (0..200)
            .map(|i| 0.5 * (1.0 + (0.05 * i as f64).sin()))
            .collect();
        let (t, y, u) = simulate(truth, &currents, 0.1, Discretization::Bilinear);

        let model = FirstOrder::fit(&t, &y, &u).unwrap();
        assert!(rel_err(model.heat_capacity(), 0.005) < 0.01);
        assert!(rel_err(model.thermal_conductivity(), 0.002) < 0.01);
    }

    #[test]
    fn uneven_timestamps_are_resampled() {
        let truth = FirstOrder::from_ck(0.005, 0.002).unwrap();
        let currents: Vec<f64> = (0..200)
            .map(|i| 0.5 * (1.0 + (0.05 * i as f64).sin()))
            .collect();
        let (mut t, y, u) = simulate(truth, &currents, 0.1, Discretization::Bilinear);
        // Small deterministic jitter, as produced by ticks running a little long.
        for (i, ti) in t.iter_mut().enumerate() {
            *ti += 0.002 * ((i * 7) % 5) as f64 / 5.0;
        }

        let model = FirstOrder::fit(&t, &y, &u).unwrap();
        assert!(rel_err(model.heat_capacity(), 0.005) < 0.03);
        assert!(rel_err(model.thermal_conductivity(), 0.002) < 0.03);
    }

    #[test]
    fn zero_power_entries_are_fine() {
        let truth = FirstOrder::from_ck(0.01, 0.05).unwrap();
        let currents: Vec<f64> = (0..80).map(|i| if (i / 20) % 2 == 1 { 0.1 } else { 0.0 }).collect();
        let (t, y, u) = simulate(truth, &currents, 0.05, Discretization::Bilinear);
        assert!(u.contains(&0.0));
        let model = FirstOrder::fit(&t, &y, &u).unwrap();
        assert!(model.heat_capacity().is_finite());
        assert!(model.thermal_conductivity().is_finite());
    }

    #[test]
    fn mismatched_lengths_are_a_precondition_violation() {
        let err = fit_first_order(&[0.0, 1.0, 2.0, 3.0], &[0.0; 4], &[0.0; 3]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
    }

    #[test]
    fn too_few_points_fail_the_fit() {
        let err = fit_first_order(&[0.0, 1.0, 2.0], &[0.0, 1.0, 2.0], &[1.0; 3]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fit);
    }

    #[test]
    fn non_finite_input_fails_the_fit() {
        let t = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y = [0.0, 1.0, f64::NAN, 3.0, 4.0];
        let err = fit_first_order(&t, &y, &[1.0; 5]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fit);
    }

    #[test]
    fn constant_signals_are_singular() {
        let t: Vec<f64> = (0..20).map(|i| i as f64 * 0.1).collect();
        let err = fit_first_order(&t, &[3.0; 20], &[2.0; 20]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fit);
    }

    #[test]
    fn repeated_timestamps_fail_the_fit() {
        let t = [0.0, 1.0, 1.0, 2.0, 3.0];
        let err = fit_first_order(&t, &[0.0, 1.0, 2.0, 3.0, 4.0], &[1.0; 5]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fit);
    }

    #[test]
    fn fit_series_uses_columns() {
        let truth = FirstOrder::from_ck(0.005, 0.002).unwrap();
        let currents: Vec<f64> = (0..100).map(|i| 0.5 * (1.0 + (0.05 * i as f64).sin())).collect();
        let (t, y, u) = simulate(truth, &currents, 0.1, Discretization::Bilinear);
        let series = RawSeries::from_parts(t, u, y).unwrap();
        let fit = fit_series(&series).unwrap();
        assert!(rel_err(fit.model.heat_capacity(), 0.005) < 0.02);
    }
}
