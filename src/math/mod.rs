//! Numerical building blocks: least squares, interpolating splines and the
//! Savitzky–Golay differentiator.

pub mod ols;
pub mod savgol;
pub mod spline;

pub use ols::*;
pub use savgol::*;
pub use spline::*;
