//! First-order thermal model.
//!
//! The model is a small immutable value type so that the fitter, the
//! simulation backend and the exporters can share it freely.

pub mod model;

pub use model::*;
