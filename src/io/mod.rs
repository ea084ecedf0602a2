//! Input/output helpers.
//!
//! - raw series CSV read/write (`series`)
//! - model JSON read/write (`model`)

pub mod model;
pub mod series;

pub use model::*;
pub use series::*;
