//! Closed-form distance adjustment for callers that do not need a full
//! trajectory.
//!
//! Each effect is a fractional change in carry relative to the standard
//! environment. Thinner air carries further:
//!
//! ```text
//! density     = 0.5 · (1 − ρ / ρ_std)
//! total       = density
//! adjusted    = target · (1 + total)
//! ```
//!
//! Elevation reaches the ball only through the thinner air, and the station
//! pressure already carries it into `ρ`. The altitude, temperature and
//! humidity effects are the density term with only station pressure,
//! temperature or humidity moved off standard. They break `density` down
//! for display and are not added to the total.

use serde::{Deserialize, Serialize};

use crate::environment::{air_density, standard_air_density, Environment};
use crate::error::{ensure_finite, SimulationError};
use crate::types::constants;

/// Carry sensitivity to relative density change
const DENSITY_SENSITIVITY: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalEffects {
    pub density_effect: f64,
    /// Share of the density effect due to station pressure alone
    pub altitude_effect: f64,
    pub temperature_effect: f64,
    pub humidity_effect: f64,
    pub total_effect: f64,
    /// Target distance scaled by the total effect (same unit as the target)
    pub adjusted_yardage: f64,
}

fn density_term(density: f64, reference: f64) -> f64 {
    DENSITY_SENSITIVITY * (1.0 - density / reference)
}

/// Aggregate adjustment of `target_distance` for `env`.
pub fn environmental_effects(
    env: &Environment,
    target_distance: f64,
) -> Result<EnvironmentalEffects, SimulationError> {
    ensure_finite("target_distance", target_distance)?;
    if target_distance <= 0.0 {
        return Err(SimulationError::invalid(
            "target_distance",
            format!("must be positive, got {target_distance}"),
        ));
    }
    env.validate()?;

    let reference = standard_air_density();
    let density_effect = density_term(env.air_density(), reference);
    let temperature_effect = density_term(
        air_density(
            env.temperature_c,
            constants::SEA_LEVEL_PRESSURE,
            constants::STANDARD_HUMIDITY,
        ),
        reference,
    );
    let humidity_effect = density_term(
        air_density(
            constants::STANDARD_TEMPERATURE,
            constants::SEA_LEVEL_PRESSURE,
            env.humidity,
        ),
        reference,
    );
    let altitude_effect = density_term(
        air_density(
            constants::STANDARD_TEMPERATURE,
            env.pressure_pa,
            constants::STANDARD_HUMIDITY,
        ),
        reference,
    );
    let total_effect = density_effect;

    Ok(EnvironmentalEffects {
        density_effect,
        altitude_effect,
        temperature_effect,
        humidity_effect,
        total_effect,
        adjusted_yardage: target_distance * (1.0 + total_effect),
    })
}
