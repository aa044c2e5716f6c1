//! Engine and integrator configuration.
//!
//! Everything here deserializes from YAML with per-field defaults, so a
//! preset only needs the keys it changes:
//!
//! ```yaml
//! integrator:
//!   mode: adaptive
//!   dt: 0.02
//! cache_ttl_secs: 300
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SimulationError;
use crate::forces::AerodynamicModel;
use crate::integrator::AdaptiveRk4;
use crate::spin::SpinModel;

/// Integration method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationMode {
    /// Classic RK4 at a constant `dt`
    Fixed,
    /// RK4 with step-doubling error control
    Adaptive,
}

/// Stepping and termination settings for one trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegratorConfig {
    pub mode: IntegrationMode,

    /// Time step, or the initial step for adaptive mode (s)
    pub dt: f64,

    /// Adaptive-mode error budget on position (m) and velocity (m/s) over
    /// `max_time`. Each step gets the share `tolerance · dt / max_time`.
    pub tolerance: f64,

    /// Floor for adaptive halving (s)
    pub min_dt: f64,

    /// Step budget
    pub max_steps: usize,

    /// Simulated-time budget (s)
    pub max_time: f64,

    /// Stop once the horizontal distance reaches the request's target
    pub stop_at_target_distance: bool,

    /// Turn precision warnings into `SimulationError::NonConvergence`
    pub fail_on_precision_loss: bool,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            mode: IntegrationMode::Adaptive,
            dt: 0.01,
            tolerance: 1e-4,
            min_dt: 1e-5,
            max_steps: 100_000,
            max_time: 30.0,
            stop_at_target_distance: true,
            fail_on_precision_loss: false,
        }
    }
}

impl IntegratorConfig {
    /// Fixed-step RK4 at `dt`.
    pub fn fixed(dt: f64) -> Self {
        Self {
            mode: IntegrationMode::Fixed,
            dt,
            ..Self::default()
        }
    }

    /// Adaptive RK4 starting from `dt`.
    pub fn adaptive(dt: f64, tolerance: f64) -> Self {
        Self {
            mode: IntegrationMode::Adaptive,
            dt,
            tolerance,
            ..Self::default()
        }
    }

    /// Tight tolerance for validation runs
    pub fn high_precision() -> Self {
        Self {
            dt: 0.005,
            tolerance: 1e-7,
            min_dt: 1e-7,
            ..Self::default()
        }
    }

    /// Coarse fixed stepping for interactive use
    pub fn fast() -> Self {
        Self {
            mode: IntegrationMode::Fixed,
            dt: 0.02,
            ..Self::default()
        }
    }

    pub fn stepper(&self) -> AdaptiveRk4 {
        AdaptiveRk4::new(self.tolerance, self.min_dt, self.max_time)
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        let positive = [
            ("integrator.dt", self.dt),
            ("integrator.min_dt", self.min_dt),
            ("integrator.max_time", self.max_time),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(SimulationError::invalid(
                    field,
                    format!("must be positive and finite, got {value}"),
                ));
            }
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(SimulationError::invalid(
                "integrator.tolerance",
                format!("must be non-negative and finite, got {}", self.tolerance),
            ));
        }
        if self.min_dt > self.dt {
            return Err(SimulationError::invalid(
                "integrator.min_dt",
                format!("must not exceed dt ({} > {})", self.min_dt, self.dt),
            ));
        }
        if self.max_steps == 0 {
            return Err(SimulationError::invalid("integrator.max_steps", "must be at least 1"));
        }
        Ok(())
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub integrator: IntegratorConfig,
    pub aerodynamics: AerodynamicModel,
    pub spin: SpinModel,
    /// Result cache time-to-live (s)
    pub cache_ttl_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            integrator: IntegratorConfig::default(),
            aerodynamics: AerodynamicModel::default(),
            spin: SpinModel::default(),
            cache_ttl_secs: 15 * 60,
        }
    }
}

impl EngineConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        self.integrator.validate()?;
        let aero = &self.aerodynamics;
        for (field, value) in [
            ("aerodynamics.air_viscosity", aero.air_viscosity),
            ("aerodynamics.ball_diameter", aero.ball_diameter),
            ("spin.reference_speed", self.spin.reference_speed),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(SimulationError::invalid(
                    field,
                    format!("must be positive and finite, got {value}"),
                ));
            }
        }
        // Zero switches an effect off; a negative value would reverse it
        for (field, value) in [
            ("spin.temperature_sensitivity", self.spin.temperature_sensitivity),
            ("spin.humidity_sensitivity", self.spin.humidity_sensitivity),
            ("spin.density_exponent", self.spin.density_exponent),
            ("spin.precession_gain", self.spin.precession_gain),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(SimulationError::invalid(
                    field,
                    format!("must be non-negative and finite, got {value}"),
                ));
            }
        }
        Ok(())
    }
}
