//! First-order heat capacity model.
//!
//! The differential equation is
//!
//! ```text
//! C * dy/dt + K * y = u
//! ```
//!
//! with `C` the heat capacity, `K` the thermal conductivity, `y` the
//! temperature and `u` the heater power. It is the special case of the linear
//! first-order system
//!
//! ```text
//! a0 * dy/dt + a1 * y = b0 * du/dt + b1 * u
//! ```
//!
//! with transfer function `G(s) = (b0 s + b1) / (a0 s + a1)`. The polynomials
//! are normalized to `a0 = 1` on construction, so `num[1] = 1/C` and
//! `den[1] = K/C`.

use crate::domain::Discretization;
use crate::error::AppError;

/// Normalized first-order transfer function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FirstOrder {
    num: [f64; 2],
    den: [f64; 2],
}

impl FirstOrder {
    /// Build from numerator `b` and denominator `a` coefficients, highest
    /// power first.
    ///
    /// `b` may have one or two entries (a single entry is the constant term);
    /// `a` must have exactly two with `a[0] != 0`. Both are divided by `a[0]`.
    pub fn new(b: &[f64], a: &[f64]) -> Result<Self, AppError> {
        let num = match *b {
            [b1] => [0.0, b1],
            [b0, b1] => [b0, b1],
            _ => {
                return Err(AppError::precondition(format!(
                    "First-order numerator needs 1 or 2 coefficients, got {}.",
                    b.len()
                )));
            }
        };
        let [a0, a1] = *a else {
            return Err(AppError::precondition(format!(
                "First-order denominator needs exactly 2 coefficients, got {}.",
                a.len()
            )));
        };
        if num.iter().chain([a0, a1].iter()).any(|v| !v.is_finite()) {
            return Err(AppError::precondition("Model coefficients must be finite."));
        }
        if a0 == 0.0 {
            return Err(AppError::precondition(
                "Leading denominator coefficient must be non-zero.",
            ));
        }

        Ok(Self {
            num: [num[0] / a0, num[1] / a0],
            den: [1.0, a1 / a0],
        })
    }

    /// Build from heat capacity and thermal conductivity.
    pub fn from_ck(heat_capacity: f64, thermal_conductivity: f64) -> Result<Self, AppError> {
        if !(heat_capacity.is_finite() && heat_capacity != 0.0) {
            return Err(AppError::precondition(format!(
                "Heat capacity must be finite and non-zero, got {heat_capacity}."
            )));
        }
        if !thermal_conductivity.is_finite() {
            return Err(AppError::precondition(format!(
                "Thermal conductivity must be finite, got {thermal_conductivity}."
            )));
        }
        Self::new(
            &[0.0, 1.0 / heat_capacity],
            &[1.0, thermal_conductivity / heat_capacity],
        )
    }

    pub fn num(&self) -> [f64; 2] {
        self.num
    }

    pub fn den(&self) -> [f64; 2] {
        self.den
    }

    pub fn heat_capacity(&self) -> f64 {
        1.0 / self.num[1]
    }

    pub fn thermal_conductivity(&self) -> f64 {
        self.den[1] / self.num[1]
    }

    /// Thermal relaxation time `C/K` in seconds.
    pub fn time_constant(&self) -> f64 {
        1.0 / self.den[1]
    }

    /// True when both `C` and `K` are finite and positive.
    pub fn is_physical(&self) -> bool {
        let c = self.heat_capacity();
        let k = self.thermal_conductivity();
        c.is_finite() && k.is_finite() && c > 0.0 && k > 0.0
    }

    /// Convert to a difference equation at the given sampling time.
    pub fn discretize(
        &self,
        sampling_time: f64,
        method: Discretization,
    ) -> Result<DiscreteFirstOrder, AppError> {
        if !(sampling_time.is_finite() && sampling_time > 0.0) {
            return Err(AppError::precondition(format!(
                "Sampling time must be finite and > 0, got {sampling_time}."
            )));
        }
        let [b0, b1] = self.num;
        let a1 = self.den[1];
        let dt = sampling_time;

        let (pole, gain_now, gain_prev) = match method {
            Discretization::Zoh => {
                // G = b0 + g / (s + a1) with g = b1 - b0 * a1.
                let g = b1 - b0 * a1;
                let pole = (-a1 * dt).exp();
                // (1 - e^{-a1 dt}) / a1, continuous at a1 = 0.
                let hold = if a1 == 0.0 { dt } else { -(-a1 * dt).exp_m1() / a1 };
                (pole, b0, g * hold - b0 * pole)
            }
            Discretization::Bilinear => {
                let c = 2.0 / dt;
                let norm = c + a1;
                if norm == 0.0 {
                    return Err(AppError::precondition(
                        "Bilinear transform is singular for this sampling time.",
                    ));
                }
                ((c - a1) / norm, (b0 * c + b1) / norm, (b1 - b0 * c) / norm)
            }
        };

        Ok(DiscreteFirstOrder {
            pole,
            gain_now,
            gain_prev,
            sampling_time,
        })
    }
}

/// Difference equation `y[n] = pole * y[n-1] + gain_now * u[n] + gain_prev * u[n-1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiscreteFirstOrder {
    pub pole: f64,
    pub gain_now: f64,
    pub gain_prev: f64,
    pub sampling_time: f64,
}

impl DiscreteFirstOrder {
    /// Advance one step from output `y_prev` given the previous and current input.
    pub fn step(&self, y_prev: f64, u_prev: f64, u_now: f64) -> f64 {
        self.pole * y_prev + self.gain_now * u_now + self.gain_prev * u_prev
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn from_ck_round_trips() {
        let (c, k) = (0.005, 0.002);
        let model = FirstOrder::from_ck(c, k).unwrap();
        assert_relative_eq!(model.heat_capacity(), c, max_relative = 1e-12);
        assert_relative_eq!(model.thermal_conductivity(), k, max_relative = 1e-12);
        assert_relative_eq!(model.time_constant(), 2.5, max_relative = 1e-12);
        assert!(model.is_physical());
    }

    #[test]
    fn new_normalizes_leading_denominator() {
        let model = FirstOrder::new(&[0.0, 400.0], &[2.0, 0.8]).unwrap();
        assert_eq!(model.den(), [1.0, 0.4]);
        assert_eq!(model.num(), [0.0, 200.0]);
        assert_relative_eq!(model.heat_capacity(), 0.005);
        assert_relative_eq!(model.thermal_conductivity(), 0.002);
    }

    #[test]
    fn single_numerator_coefficient_is_the_constant_term() {
        let model = FirstOrder::new(&[200.0], &[1.0, 0.4]).unwrap();
        assert_eq!(model.num(), [0.0, 200.0]);
    }

    #[test]
    fn invalid_coefficients_are_rejected() {
        assert!(FirstOrder::new(&[0.0, 1.0], &[0.0, 1.0]).is_err());
        assert!(FirstOrder::new(&[0.0, 1.0], &[1.0]).is_err());
        assert!(FirstOrder::new(&[1.0, 2.0, 3.0], &[1.0, 1.0]).is_err());
        assert!(FirstOrder::new(&[f64::NAN, 1.0], &[1.0, 1.0]).is_err());
        assert!(FirstOrder::from_ck(0.0, 1.0).is_err());
    }

    #[test]
    fn negative_conductivity_is_not_physical() {
        let model = FirstOrder::new(&[0.0, 200.0], &[1.0, -0.4]).unwrap();
        assert!(!model.is_physical());
    }

    #[test]
    fn discretizations_share_the_dc_gain() {
        let model = FirstOrder::from_ck(0.005, 0.002).unwrap();
        for method in [Discretization::Zoh, Discretization::Bilinear] {
            let discrete = model.discretize(0.1, method).unwrap();
            // Steady state temperature rise is u / K.
            let dc_gain = (discrete.gain_now + discrete.gain_prev) / (1.0 - discrete.pole);
            assert_relative_eq!(dc_gain, 500.0, max_relative = 1e-9);
        }
    }

    #[test]
    fn zoh_matches_exact_step_response() {
        let model = FirstOrder::from_ck(0.005, 0.002).unwrap();
        let discrete = model.discretize(0.1, Discretization::Zoh).unwrap();

        let mut y = 0.0;
        for _ in 0..10 {
            y = discrete.step(y, 1.0, 1.0);
        }
        // y(t) = (u/K) * (1 - exp(-t K/C)) at t = 1 s.
        let exact = 500.0 * (1.0 - (-1.0_f64 / 2.5).exp());
        assert_relative_eq!(y, exact, max_relative = 1e-12);
    }

    #[test]
    fn zoh_integrator_is_continuous() {
        let model = FirstOrder::new(&[0.0, 2.0], &[1.0, 0.0]).unwrap();
        let discrete = model.discretize(0.5, Discretization::Zoh).unwrap();
        assert_eq!(discrete.pole, 1.0);
        assert_relative_eq!(discrete.gain_prev, 1.0);
    }

    #[test]
    fn non_positive_sampling_time_is_rejected() {
        let model = FirstOrder::from_ck(1.0, 1.0).unwrap();
        assert!(model.discretize(0.0, Discretization::Zoh).is_err());
        assert!(model.discretize(-1.0, Discretization::Bilinear).is_err());
    }

    proptest! {
        #[test]
        fn construction_normalizes_and_exposes_ck(
            b1 in prop_oneof![-1e3..-1e-3f64, 1e-3..1e3f64],
            a0 in prop_oneof![-1e3..-1e-3f64, 1e-3..1e3f64],
            a1 in -1e3..1e3f64,
        ) {
            let model = FirstOrder::new(&[0.0, b1], &[a0, a1]).unwrap();
            prop_assert_eq!(model.den()[0], 1.0);
            prop_assert_eq!(model.heat_capacity(), 1.0 / model.num()[1]);
            prop_assert_eq!(model.thermal_conductivity(), model.den()[1] / model.num()[1]);
        }

        #[test]
        fn from_ck_round_trips_for_any_positive_pair(c in 1e-6..1e3f64, k in 1e-6..1e3f64) {
            let model = FirstOrder::from_ck(c, k).unwrap();
            prop_assert!((model.heat_capacity() - c).abs() <= 1e-9 * c);
            prop_assert!((model.thermal_conductivity() - k).abs() <= 1e-9 * k);
        }
    }
}
