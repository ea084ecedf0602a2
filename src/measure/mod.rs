//! Heat capacity measurements.
//!
//! - `engine`: the tick loop, parameterized by an acquisition policy
//! - `pulse`: replay a fixed excitation sequence
//! - `adaptive`: baseline / pulse / decay with a derivative stopping rule

pub mod adaptive;
pub mod engine;
pub mod pulse;

pub use adaptive::*;
pub use engine::*;
pub use pulse::*;
