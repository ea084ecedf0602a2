//! Savitzky–Golay smoothing differentiator.
//!
//! A polynomial of order `p` is least-squares fitted to the last `n` samples
//! and differentiated at the newest sample. The fit is linear in the data, so
//! the derivative is a fixed dot product with precomputed weights.

use nalgebra::DMatrix;

use crate::error::AppError;

/// Weights `w` such that `Σ w_j · y_j / dt` is the first derivative at the
/// last of `len` equally spaced samples (oldest first).
pub fn derivative_weights(len: usize, polyorder: usize) -> Result<Vec<f64>, AppError> {
    if len < 2 {
        return Err(AppError::precondition(format!(
            "Derivative window needs at least 2 samples, got {len}."
        )));
    }
    if polyorder == 0 || polyorder >= len {
        return Err(AppError::precondition(format!(
            "Polynomial order must be in 1..{len}, got {polyorder}."
        )));
    }

    // Positions scaled to [-1, 0], newest sample at 0. Unscaled powers make
    // the normal matrix singular to working precision for long windows.
    let offset = (len - 1) as f64;
    let vander = DMatrix::from_fn(len, polyorder + 1, |i, k| {
        ((i as f64 - offset) / offset).powi(k as i32)
    });
    let gram = vander.transpose() * &vander;
    let inverse = gram
        .try_inverse()
        .ok_or_else(|| AppError::fit("Savitzky-Golay normal matrix is singular."))?;
    let projector = inverse * vander.transpose();

    // Slope per scaled unit back to slope per sample.
    Ok(projector.row(1).iter().map(|w| w / offset).collect())
}

/// Next odd integer `>= value`.
pub fn ceil_odd(value: usize) -> usize {
    if value % 2 == 0 { value + 1 } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn apply(weights: &[f64], samples: &[f64], dt: f64) -> f64 {
        weights.iter().zip(samples).map(|(w, y)| w * y).sum::<f64>() / dt
    }

    #[test]
    fn weights_differentiate_quadratics_exactly() {
        let dt = 0.1;
        let samples: Vec<f64> = (0..7).map(|i| {
            let t = i as f64 * dt;
            3.0 * t * t - 2.0 * t + 5.0
        }).collect();
        let weights = derivative_weights(7, 2).unwrap();
        // d/dt at t = 0.6: 6t - 2
        assert_relative_eq!(apply(&weights, &samples, dt), 1.6, epsilon = 1e-9);
    }

    #[test]
    fn constant_signal_has_zero_derivative() {
        let weights = derivative_weights(5, 2).unwrap();
        assert!(apply(&weights, &[4.0; 5], 0.5).abs() < 1e-12);
    }

    #[test]
    fn linear_order_over_two_samples_is_a_difference() {
        let weights = derivative_weights(2, 1).unwrap();
        assert_relative_eq!(weights[0], -1.0, epsilon = 1e-12);
        assert_relative_eq!(weights[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn long_windows_stay_accurate() {
        let dt = 0.01;
        let samples: Vec<f64> = (0..6001).map(|i| 2.0 * i as f64 * dt + 20.0).collect();
        let weights = derivative_weights(6001, 2).unwrap();
        assert_relative_eq!(apply(&weights, &samples, dt), 2.0, epsilon = 1e-8);
        assert!(weights.iter().sum::<f64>().abs() < 1e-10);
    }

    #[test]
    fn invalid_orders_are_rejected() {
        assert!(derivative_weights(3, 3).is_err());
        assert!(derivative_weights(1, 1).is_err());
        assert!(derivative_weights(5, 0).is_err());
    }

    #[test]
    fn ceil_odd_rounds_up_evens() {
        assert_eq!(ceil_odd(4), 5);
        assert_eq!(ceil_odd(5), 5);
        assert_eq!(ceil_odd(0), 1);
    }
}
