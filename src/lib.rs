//! `heat-capacity` library crate.
//!
//! The binary (`hc`) is a thin wrapper around this library so that:
//!
//! - measurement and fitting logic is testable without spawning processes
//! - real instrument drivers can plug into the same measurement engine
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod fit;
pub mod instrument;
pub mod io;
pub mod math;
pub mod measure;
pub mod models;
pub mod report;
pub mod timing;
