//! Exact-interpolating cubic splines.
//!
//! The spline passes through every sample (no smoothing) and uses not-a-knot
//! end conditions: the third derivative is continuous across the second and
//! the second-to-last knot. This is the classic interpolating cubic spline a
//! zero-smoothing spline fit reduces to.
//!
//! Construction solves a tridiagonal system for the knot slopes; evaluation is
//! a piecewise cubic Hermite form, which gives the first derivative for free.

use crate::error::AppError;

/// Minimum number of knots for a cubic (degree + 1).
pub const MIN_SPLINE_POINTS: usize = 4;

/// A cubic interpolating spline over strictly increasing abscissae.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    slopes: Vec<f64>,
}

impl CubicSpline {
    /// Build a not-a-knot interpolating spline through `(x, y)`.
    pub fn not_a_knot(x: &[f64], y: &[f64]) -> Result<Self, AppError> {
        if x.len() != y.len() {
            return Err(AppError::precondition(format!(
                "Spline abscissae ({}) and ordinates ({}) differ in length.",
                x.len(),
                y.len()
            )));
        }
        let n = x.len();
        if n < MIN_SPLINE_POINTS {
            return Err(AppError::fit(format!(
                "A cubic spline needs at least {MIN_SPLINE_POINTS} points, got {n}."
            )));
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(AppError::fit("Spline input contains non-finite values."));
        }
        if x.windows(2).any(|w| w[1] <= w[0]) {
            return Err(AppError::fit("Spline abscissae must be strictly increasing."));
        }

        let dx: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
        let secant: Vec<f64> = (0..n - 1).map(|i| (y[i + 1] - y[i]) / dx[i]).collect();

        // sub[i] couples row i to i-1, sup[i] couples row i to i+1.
        let mut sub = vec![0.0; n - 1];
        let mut diag = vec![0.0; n];
        let mut sup = vec![0.0; n - 1];
        let mut rhs = vec![0.0; n];

        for i in 1..n - 1 {
            sub[i - 1] = dx[i];
            diag[i] = 2.0 * (dx[i - 1] + dx[i]);
            sup[i] = dx[i - 1];
            rhs[i] = 3.0 * (dx[i] * secant[i - 1] + dx[i - 1] * secant[i]);
        }

        let d = x[2] - x[0];
        diag[0] = dx[1];
        sup[0] = d;
        rhs[0] = ((dx[0] + 2.0 * d) * dx[1] * secant[0] + dx[0] * dx[0] * secant[1]) / d;

        let d = x[n - 1] - x[n - 3];
        diag[n - 1] = dx[n - 3];
        sub[n - 2] = d;
        rhs[n - 1] = (dx[n - 2] * dx[n - 2] * secant[n - 3]
            + (2.0 * d + dx[n - 2]) * dx[n - 3] * secant[n - 2])
            / d;

        let slopes = solve_tridiagonal(sub, diag, sup, rhs)?;
        if slopes.iter().any(|s| !s.is_finite()) {
            return Err(AppError::fit("Spline construction produced non-finite slopes."));
        }

        Ok(Self {
            x: x.to_vec(),
            y: y.to_vec(),
            slopes,
        })
    }

    /// Domain covered by the knots.
    pub fn bounds(&self) -> (f64, f64) {
        (self.x[0], self.x[self.x.len() - 1])
    }

    /// Evaluate the spline. Points outside the knots extrapolate the end pieces.
    pub fn eval(&self, t: f64) -> f64 {
        let (i, z, c2, c3) = self.piece(t);
        self.y[i] + z * (self.slopes[i] + z * (c2 + z * c3))
    }

    /// Evaluate the first derivative.
    pub fn derivative(&self, t: f64) -> f64 {
        let (i, z, c2, c3) = self.piece(t);
        self.slopes[i] + z * (2.0 * c2 + 3.0 * z * c3)
    }

    /// Locate the piece containing `t` and return its local coordinates.
    fn piece(&self, t: f64) -> (usize, f64, f64, f64) {
        let last = self.x.len() - 2;
        let i = self.x.partition_point(|&knot| knot <= t).saturating_sub(1).min(last);
        let h = self.x[i + 1] - self.x[i];
        let secant = (self.y[i + 1] - self.y[i]) / h;
        let (s0, s1) = (self.slopes[i], self.slopes[i + 1]);
        let c2 = (3.0 * secant - 2.0 * s0 - s1) / h;
        let c3 = (s0 + s1 - 2.0 * secant) / (h * h);
        (i, t - self.x[i], c2, c3)
    }
}

/// `steps` evenly spaced points between `min` and `max` (inclusive).
pub fn linspace(min: f64, max: f64, steps: usize) -> Vec<f64> {
    match steps {
        0 => Vec::new(),
        1 => vec![min],
        _ => {
            let step = (max - min) / (steps as f64 - 1.0);
            (0..steps)
                .map(|i| if i + 1 == steps { max } else { min + step * i as f64 })
                .collect()
        }
    }
}

/// Solve a tridiagonal system with partial pivoting (row interchanges), so
/// the not-a-knot end rows, which are not diagonally dominant, stay stable.
fn solve_tridiagonal(
    mut sub: Vec<f64>,
    mut diag: Vec<f64>,
    mut sup: Vec<f64>,
    mut rhs: Vec<f64>,
) -> Result<Vec<f64>, AppError> {
    let n = diag.len();
    // Second superdiagonal created by interchanges.
    let mut sup2 = vec![0.0; n.saturating_sub(2)];
    let singular = || AppError::fit("Spline system is singular.");

    for i in 0..n - 1 {
        if diag[i].abs() >= sub[i].abs() {
            if diag[i] == 0.0 {
                return Err(singular());
            }
            let fact = sub[i] / diag[i];
            diag[i + 1] -= fact * sup[i];
            rhs[i + 1] -= fact * rhs[i];
        } else {
            let fact = diag[i] / sub[i];
            diag[i] = sub[i];
            let temp = diag[i + 1];
            diag[i + 1] = sup[i] - fact * temp;
            if i + 1 < n - 1 {
                sup2[i] = sup[i + 1];
                sup[i + 1] = -fact * sup2[i];
            }
            sup[i] = temp;
            let temp = rhs[i];
            rhs[i] = rhs[i + 1];
            rhs[i + 1] = temp - fact * rhs[i + 1];
        }
        sub[i] = 0.0;
    }
    if diag[n - 1] == 0.0 {
        return Err(singular());
    }

    rhs[n - 1] /= diag[n - 1];
    if n > 1 {
        rhs[n - 2] = (rhs[n - 2] - sup[n - 2] * rhs[n - 1]) / diag[n - 2];
    }
    for i in (0..n.saturating_sub(2)).rev() {
        rhs[i] = (rhs[i] - sup[i] * rhs[i + 1] - sup2[i] * rhs[i + 2]) / diag[i];
    }
    Ok(rhs)
}
