//! Instrument capability interfaces.
//!
//! A heat capacity run needs three roles: a current source driving the
//! heater, a power meter reading the heater voltage and a thermometer on the
//! sample platform. Each role is a narrow trait; the measurement code only
//! ever talks to these traits.
//!
//! Every call is a live query. Implementations must not cache readings, and a
//! new current setpoint has to be in effect before the next dependent read.
//!
//! ```ignore
//! struct K6221 { bus: Gpib }
//!
//! impl CurrentSource for K6221 {
//!     fn current(&mut self) -> Result<f64, AppError> {
//!         self.bus.query_f64("SOUR:CURR?").map_err(|e| AppError::instrument(e.to_string()))
//!     }
//!     fn set_current(&mut self, amperes: f64) -> Result<(), AppError> {
//!         self.bus.write(&format!("SOUR:CURR {amperes}")).map_err(|e| AppError::instrument(e.to_string()))
//!     }
//! }
//! ```

use crate::domain::Sample;
use crate::error::AppError;
use crate::timing::now_seconds;

pub mod simulation;

pub use simulation::*;

/// Heater current source.
pub trait CurrentSource {
    /// Current setpoint in amperes, as reported by the instrument.
    fn current(&mut self) -> Result<f64, AppError>;

    /// Apply a new setpoint in amperes.
    fn set_current(&mut self, amperes: f64) -> Result<(), AppError>;
}

/// Heater voltage meter.
pub trait Powermeter {
    /// Voltage drop over the heater in volts.
    fn voltage(&mut self) -> Result<f64, AppError>;
}

/// Sample platform thermometer.
pub trait Thermometer {
    fn temperature(&mut self) -> Result<f64, AppError>;
}

/// The set of instruments one measurement drives.
///
/// Access is sequential, so a single device may fill several roles (the
/// simulation fills all three).
pub trait Rig {
    fn current_source(&mut self) -> &mut dyn CurrentSource;
    fn powermeter(&mut self) -> &mut dyn Powermeter;
    fn thermometer(&mut self) -> &mut dyn Thermometer;
}

/// Three separate instruments bundled into a [`Rig`].
#[derive(Debug)]
pub struct Instruments<C, P, T> {
    pub current_source: C,
    pub powermeter: P,
    pub thermometer: T,
}

impl<C, P, T> Instruments<C, P, T> {
    pub fn new(current_source: C, powermeter: P, thermometer: T) -> Self {
        Self {
            current_source,
            powermeter,
            thermometer,
        }
    }
}

impl<C, P, T> Rig for Instruments<C, P, T>
where
    C: CurrentSource,
    P: Powermeter,
    T: Thermometer,
{
    fn current_source(&mut self) -> &mut dyn CurrentSource {
        &mut self.current_source
    }

    fn powermeter(&mut self) -> &mut dyn Powermeter {
        &mut self.powermeter
    }

    fn thermometer(&mut self) -> &mut dyn Thermometer {
        &mut self.thermometer
    }
}

/// Read current, voltage and temperature once and combine them into a sample.
///
/// The timestamp is taken before the first read.
pub fn measure<R: Rig + ?Sized>(rig: &mut R) -> Result<Sample, AppError> {
    let timestamp = now_seconds();
    let current = rig.current_source().current()?;
    let voltage = rig.powermeter().voltage()?;
    let temperature = rig.thermometer().temperature()?;
    Ok(Sample {
        timestamp,
        power: current * voltage,
        temperature,
    })
}
