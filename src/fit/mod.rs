//! Model fitting.
//!
//! Turns a recorded series into a [`crate::models::FirstOrder`] model:
//!
//! - cubic-spline interpolation and uniform resampling
//! - derivative regression solved by least squares
//! - fit quality diagnostics

pub mod fitter;

pub use fitter::*;
