//! Domain types used throughout the crate.
//!
//! This module defines:
//!
//! - acquisition records (`Sample`, `RawSeries`, `SeriesStats`)
//! - adaptive run bookkeeping (`Phase`, `PhaseSpan`)
//! - simulation and export settings (`Discretization`, `ModelSource`, `ExportConfig`)
//! - fit outputs (`FitQuality`, `ModelFile`)

pub mod types;

pub use types::*;
