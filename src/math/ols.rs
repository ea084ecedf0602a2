//! Ordinary least squares solver.
//!
//! The fitter solves a tall two-column problem
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2
//! ```
//!
//! where the columns (temperature and heater power) can differ by many orders
//! of magnitude. We therefore:
//! - scale every column to unit norm before factorizing, so the rank test
//!   compares shapes rather than units
//! - solve through SVD, which handles tall matrices and exposes the singular
//!   values for the conditioning check
//! - undo the column scaling on the returned coefficients

use nalgebra::{DMatrix, DVector};

use crate::error::AppError;

/// Smallest accepted ratio between the smallest and largest singular value of
/// the column-normalized design matrix.
pub const MIN_RCOND: f64 = 1e-10;

/// Solve a least squares problem using SVD.
///
/// Fails with a fit error when a column is identically zero, when the
/// normalized design matrix is (near) rank deficient, or when the solution is
/// not finite.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Result<DVector<f64>, AppError> {
    if x.nrows() != y.len() {
        return Err(AppError::precondition(format!(
            "Design matrix has {} rows but target has {} entries.",
            x.nrows(),
            y.len()
        )));
    }
    if x.nrows() < x.ncols() {
        return Err(AppError::fit(format!(
            "Underdetermined least squares problem ({} rows, {} columns).",
            x.nrows(),
            x.ncols()
        )));
    }

    let mut scaled = x.clone();
    let mut scales = Vec::with_capacity(x.ncols());
    for (j, mut column) in scaled.column_iter_mut().enumerate() {
        let norm = column.norm();
        if !norm.is_finite() || norm == 0.0 {
            return Err(AppError::fit(format!(
                "Regression column {j} is zero or non-finite; the system is singular."
            )));
        }
        column /= norm;
        scales.push(norm);
    }

    let svd = scaled.svd(true, true);
    let max_sv = svd.singular_values.max();
    let min_sv = svd.singular_values.min();
    if !(max_sv.is_finite() && min_sv / max_sv > MIN_RCOND) {
        return Err(AppError::fit(format!(
            "Regression is singular or near-singular (rcond={:.3e}).",
            min_sv / max_sv
        )));
    }

    let beta = svd
        .solve(y, MIN_RCOND * max_sv)
        .map_err(|e| AppError::fit(format!("Least squares solve failed: {e}")))?;

    let beta = DVector::from_iterator(
        beta.len(),
        beta.iter().zip(scales.iter()).map(|(b, s)| b / s),
    );
    if beta.iter().all(|v| v.is_finite()) {
        Ok(beta)
    } else {
        Err(AppError::fit("Least squares produced non-finite coefficients."))
    }
}
