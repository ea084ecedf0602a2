//! Reporting utilities: formatted terminal output for runs and fits.

pub mod format;

pub use format::*;
