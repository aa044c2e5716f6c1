//! Validated simulation requests.

use serde::{Deserialize, Serialize};

use crate::environment::Environment;
use crate::error::{ensure_finite, SimulationError};
use crate::types::{BallProperties, BallState};

/// Relative tolerance when checking the state's mass against the ball's
const MASS_TOLERANCE: f64 = 1e-9;

/// Everything one trajectory depends on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryRequest {
    /// Target carry (m)
    pub target_distance: f64,
    pub environment: Environment,
    pub properties: BallProperties,
    pub initial_state: BallState,
}

impl TrajectoryRequest {
    pub fn new(
        target_distance: f64,
        environment: Environment,
        properties: BallProperties,
        initial_state: BallState,
    ) -> Self {
        Self {
            target_distance,
            environment,
            properties,
            initial_state,
        }
    }

    /// Checks every field before the request reaches the simulator.
    pub fn validate(&self) -> Result<(), SimulationError> {
        ensure_finite("target_distance", self.target_distance)?;
        if self.target_distance <= 0.0 {
            return Err(SimulationError::invalid(
                "target_distance",
                format!("must be positive, got {}", self.target_distance),
            ));
        }
        self.environment.validate()?;
        self.properties.validate()?;
        self.initial_state.validate()?;

        let (state_mass, ball_mass) = (self.initial_state.mass, self.properties.mass);
        if (state_mass - ball_mass).abs() > MASS_TOLERANCE * ball_mass {
            return Err(SimulationError::invalid(
                "initial_state.mass",
                format!("{state_mass} kg does not match the ball's {ball_mass} kg"),
            ));
        }
        Ok(())
    }

    /// Canonical text of the whole request, used as the cache key.
    ///
    /// Field order is fixed by the struct layout, so equal requests give
    /// equal keys.
    pub fn cache_key(&self) -> Option<String> {
        match serde_yaml::to_string(self) {
            Ok(key) => Some(key),
            Err(err) => {
                log::warn!("request could not be serialized for caching: {err}");
                None
            }
        }
    }
}
