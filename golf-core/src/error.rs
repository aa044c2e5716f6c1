//! Error types for simulation and preset loading.

use thiserror::Error;

/// Errors raised by the simulation core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    /// Input rejected before the simulation starts.
    #[error("invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    /// A spin axis with no direction was about to be normalized.
    #[error("spin axis has zero length")]
    DegenerateSpinAxis,

    /// Adaptive stepping hit the minimum step without meeting the tolerance,
    /// and the configuration asked for this to be an error.
    #[error(
        "adaptive step did not reach tolerance {tolerance:e} at t={time:.4}s (dt={dt:e}, error={error:e})"
    )]
    NonConvergence {
        time: f64,
        dt: f64,
        error: f64,
        tolerance: f64,
    },
}

impl SimulationError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }
}

/// Rejects NaN and infinities.
pub(crate) fn ensure_finite(field: &'static str, value: f64) -> Result<f64, SimulationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SimulationError::invalid(
            field,
            format!("must be finite, got {value}"),
        ))
    }
}

/// Ensures `value` is finite and within `[min, max]`.
pub(crate) fn ensure_range(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<f64, SimulationError> {
    ensure_finite(field, value)?;
    if value < min || value > max {
        return Err(SimulationError::invalid(
            field,
            format!("must be within [{min}, {max}], got {value}"),
        ));
    }
    Ok(value)
}

/// Error type for preset loading operations.
#[derive(Debug, Error)]
pub enum PresetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("preset not found: {0}")]
    NotFound(String),

    #[error("preset {name} is invalid: {source}")]
    Invalid {
        name: String,
        #[source]
        source: SimulationError,
    },
}
