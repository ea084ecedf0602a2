//! Simulated heater and thermometer.
//!
//! Use [`Simulation`] when no real experiment is available. It plays all three
//! instrument roles:
//!
//! - the current setpoint is stored as-is and read back unchanged
//! - `voltage = heater_resistance * current`
//! - every temperature read advances a discretized copy of the model by one
//!   sampling step, driven by `power = voltage * current`, and adds Gaussian
//!   noise with standard deviation `noise_scale`
//!
//! Repeated temperature reads are therefore not idempotent, just like a
//! physical sensor read between two ticks.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

use crate::domain::Discretization;
use crate::error::AppError;
use crate::instrument::{CurrentSource, Powermeter, Rig, Thermometer};
use crate::models::{DiscreteFirstOrder, FirstOrder};

/// Simulation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Heater resistance in ohm.
    pub heater_resistance: f64,
    /// Standard deviation of the additive temperature noise.
    pub noise_scale: f64,
    /// Step of the discretized model in seconds; should match the
    /// measurement sampling time.
    pub sampling_time: f64,
    /// Model output before the first read.
    pub initial_temperature: f64,
    pub discretization: Discretization,
    /// Noise RNG seed.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            heater_resistance: 1e3,
            noise_scale: 0.0,
            sampling_time: 0.1,
            initial_temperature: 0.0,
            discretization: Discretization::Zoh,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ModelState {
    output: f64,
    input: f64,
}

/// Simulated current source, power meter and thermometer.
#[derive(Debug)]
pub struct Simulation {
    model: FirstOrder,
    discrete: DiscreteFirstOrder,
    heater_resistance: f64,
    initial_temperature: f64,
    current: f64,
    state: Option<ModelState>,
    noise: Normal<f64>,
    rng: StdRng,
}

impl Simulation {
    pub fn new(model: FirstOrder, config: &SimulationConfig) -> Result<Self, AppError> {
        if !(config.heater_resistance.is_finite() && config.heater_resistance > 0.0) {
            return Err(AppError::precondition(format!(
                "Heater resistance must be finite and > 0, got {}.",
                config.heater_resistance
            )));
        }
        if !config.initial_temperature.is_finite() {
            return Err(AppError::precondition("Initial temperature must be finite."));
        }
        let noise = Normal::new(0.0, config.noise_scale).map_err(|e| {
            AppError::precondition(format!("Invalid noise scale {}: {e}", config.noise_scale))
        })?;
        let discrete = model.discretize(config.sampling_time, config.discretization)?;

        Ok(Self {
            model,
            discrete,
            heater_resistance: config.heater_resistance,
            initial_temperature: config.initial_temperature,
            current: 0.0,
            state: None,
            noise,
            rng: StdRng::seed_from_u64(config.seed),
        })
    }

    pub fn model(&self) -> &FirstOrder {
        &self.model
    }

    /// Noise-free model output after the last read.
    pub fn model_output(&self) -> f64 {
        self.state.map_or(self.initial_temperature, |s| s.output)
    }

    fn power(&self) -> f64 {
        self.heater_resistance * self.current * self.current
    }
}

impl CurrentSource for Simulation {
    fn current(&mut self) -> Result<f64, AppError> {
        Ok(self.current)
    }

    fn set_current(&mut self, amperes: f64) -> Result<(), AppError> {
        if !amperes.is_finite() {
            return Err(AppError::instrument(format!("Rejected non-finite setpoint {amperes}.")));
        }
        self.current = amperes;
        Ok(())
    }
}

impl Powermeter for Simulation {
    fn voltage(&mut self) -> Result<f64, AppError> {
        Ok(self.heater_resistance * self.current)
    }
}

impl Thermometer for Simulation {
    fn temperature(&mut self) -> Result<f64, AppError> {
        let input = self.power();
        // The first read holds the current power as the previous input.
        let previous = self.state.unwrap_or(ModelState {
            output: self.initial_temperature,
            input,
        });
        let output = self.discrete.step(previous.output, previous.input, input);
        self.state = Some(ModelState { output, input });

        Ok(output + self.noise.sample(&mut self.rng))
    }
}

impl Rig for Simulation {
    fn current_source(&mut self) -> &mut dyn CurrentSource {
        self
    }

    fn powermeter(&mut self) -> &mut dyn Powermeter {
        self
    }

    fn thermometer(&mut self) -> &mut dyn Thermometer {
        self
    }
}
