//! Spin dynamics: rate decay, axis precession and the spin-derived lift
//! coefficient.
//!
//! ## Decay
//!
//! Spin decays exponentially, `dω/dt = -k·ω`, with
//!
//! ```text
//! k = k_ball · speed · temperature · humidity · density
//!
//! speed       = 0.5 + 0.5·|v| / 44.7
//! temperature = exp(0.01·(T - 20))
//! humidity    = 1 - 0.1·(h - 0.5)
//! density     = (ρ / ρ_std)^1
//! ```
//!
//! Every factor is 1 at 44.7 m/s, 20°C, 50% RH and standard pressure, so
//! `k_ball` alone sets the reference loss (0.0834/s gives ~8% after 1 s and
//! ~34% after 5 s). Altitude enters through the station pressure, which
//! lowers the density. Because the factor is an exponential the rate is
//! never negative and never grows.
//!
//! ## Precession
//!
//! The axis drifts toward the vertical: its angle `θ` to `±Y` shrinks as
//! `dθ/dt = -p·θ`, turning within the plane of the axis and `±Y`. Steps of
//! any length compose exactly, and the axis stays unit length.

use serde::{Deserialize, Serialize};

use crate::environment::{standard_air_density, Environment};
use crate::error::SimulationError;
use crate::table::CIRCULATION_BY_RPM;
use crate::types::{constants, BallProperties, SpinState, Vec3};

/// Angle to the vertical below which the axis counts as settled (rad)
const SETTLED_ANGLE: f64 = 1e-12;

/// Spin decay and precession parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpinModel {
    /// Speed at which the speed factor is 1 (m/s)
    pub reference_speed: f64,
    /// Exponential temperature sensitivity (1/°C)
    pub temperature_sensitivity: f64,
    /// Linear humidity sensitivity (per unit humidity)
    pub humidity_sensitivity: f64,
    /// Exponent on the density ratio `ρ / ρ_std`
    pub density_exponent: f64,
    /// Precession rate per unit Magnus coefficient (1/s)
    pub precession_gain: f64,
}

impl Default for SpinModel {
    fn default() -> Self {
        Self {
            reference_speed: constants::REFERENCE_SPEED,
            temperature_sensitivity: 0.01,
            humidity_sensitivity: 0.1,
            density_exponent: 1.0,
            precession_gain: 0.1,
        }
    }
}

impl SpinModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spin decay constant `k` (1/s) for the given conditions.
    pub fn decay_rate(&self, props: &BallProperties, env: &Environment, speed: f64) -> f64 {
        let speed_factor = 0.5 + 0.5 * speed.abs() / self.reference_speed;
        let temperature_factor = (self.temperature_sensitivity
            * (env.temperature_c - constants::STANDARD_TEMPERATURE))
            .exp();
        let humidity_factor =
            (1.0 - self.humidity_sensitivity * (env.humidity - constants::STANDARD_HUMIDITY))
                .max(0.0);
        let density_factor =
            (env.air_density() / standard_air_density()).powf(self.density_exponent);

        props.spin_decay_rate * speed_factor * temperature_factor * humidity_factor * density_factor
    }

    /// Axis precession rate (1/s)
    pub fn precession_rate(&self, props: &BallProperties) -> f64 {
        self.precession_gain * props.magnus_coefficient
    }

    /// Advances spin by `dt` seconds at the given ball velocity.
    ///
    /// Fails only when the axis has no direction.
    pub fn evolve(
        &self,
        spin: &SpinState,
        props: &BallProperties,
        env: &Environment,
        velocity: Vec3,
        dt: f64,
    ) -> Result<SpinState, SimulationError> {
        let axis = spin
            .axis
            .try_normalized()
            .ok_or(SimulationError::DegenerateSpinAxis)?;

        let k = self.decay_rate(props, env, velocity.magnitude());
        let rate_rpm = (spin.rate_rpm * (-k * dt).exp()).max(0.0);

        let target = precession_target(axis);
        let cos_angle = axis.dot(&target).clamp(-1.0, 1.0);
        let angle = cos_angle.acos();
        let axis = match (axis - target * cos_angle).try_normalized() {
            Some(sideways) if angle > SETTLED_ANGLE => {
                let remaining = angle * (-self.precession_rate(props) * dt).exp();
                target * remaining.cos() + sideways * remaining.sin()
            }
            _ => axis,
        };

        Ok(SpinState { rate_rpm, axis })
    }

    /// Time derivatives of the spin rate (rpm/s) and the axis (1/s).
    ///
    /// Integrating these reproduces [`evolve`](Self::evolve) at constant
    /// velocity. A degenerate axis has a zero derivative.
    pub fn derivative(
        &self,
        spin: &SpinState,
        props: &BallProperties,
        env: &Environment,
        velocity: Vec3,
    ) -> (f64, Vec3) {
        let rate = -self.decay_rate(props, env, velocity.magnitude()) * spin.rate_rpm;

        let Some(axis) = spin.axis.try_normalized() else {
            return (rate, Vec3::ZERO);
        };
        let target = precession_target(axis);
        let cos_angle = axis.dot(&target).clamp(-1.0, 1.0);
        let angle = cos_angle.acos();
        let sin_angle = angle.sin();
        if angle <= SETTLED_ANGLE || sin_angle <= SETTLED_ANGLE {
            return (rate, Vec3::ZERO);
        }

        // d(axis)/dt = p·θ·(target - axis·cos θ) / sin θ
        let turn = (target - axis * cos_angle) * (self.precession_rate(props) * angle / sin_angle);
        (rate, turn)
    }

    /// Spin rate after `elapsed` seconds at constant velocity.
    pub fn rate_after(
        &self,
        spin: &SpinState,
        props: &BallProperties,
        env: &Environment,
        speed: f64,
        elapsed: f64,
    ) -> f64 {
        (spin.rate_rpm * (-self.decay_rate(props, env, speed) * elapsed).exp()).max(0.0)
    }
}

/// The vertical the axis precesses toward: `+Y`, or `-Y` for an axis
/// already pointing down.
fn precession_target(axis: Vec3) -> Vec3 {
    if axis.y < 0.0 {
        -Vec3::UP
    } else {
        Vec3::UP
    }
}

/// Circulation strength for a spin rate (rpm).
pub fn circulation_strength(rate_rpm: f64) -> f64 {
    CIRCULATION_BY_RPM.lookup(rate_rpm)
}

/// Lift coefficient from the ball's base lift coefficient and its spin.
///
/// A ball without spin carries no circulation and gets zero lift.
pub fn lift_coefficient(rate_rpm: f64, base_lift: f64) -> f64 {
    if rate_rpm <= 0.0 {
        0.0
    } else {
        base_lift * circulation_strength(rate_rpm)
    }
}
