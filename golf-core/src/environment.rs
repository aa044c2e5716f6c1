//! Atmospheric conditions and air density.
//!
//! Density uses the partial-pressure form for moist air,
//! `ρ = p_d / (R_d·T) + p_v / (R_v·T)`, with the Buck equation for
//! saturation vapour pressure.

use serde::{Deserialize, Serialize};

use crate::error::{ensure_range, SimulationError};
use crate::types::{constants, Vec3};

/// Specific gas constant for dry air (J/(kg·K))
const R_DRY: f64 = 287.05;
/// Specific gas constant for water vapour (J/(kg·K))
const R_VAPOR: f64 = 461.495;
const KELVIN_OFFSET: f64 = 273.15;

/// Troposphere lapse rate (K/m)
const LAPSE_RATE: f64 = 0.0065;
/// Exponent g·M / (R·L) of the barometric formula
const BAROMETRIC_EXPONENT: f64 = 5.255_88;

/// Ambient conditions for one simulation.
///
/// Wind is horizontal: its `y` component must be zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    /// Air temperature (°C)
    pub temperature_c: f64,
    /// Station pressure (Pa)
    pub pressure_pa: f64,
    /// Relative humidity (0-1)
    pub humidity: f64,
    /// Elevation above sea level (m)
    pub altitude_m: f64,
    /// Wind velocity (m/s)
    #[serde(default)]
    pub wind: Vec3,
}

impl Environment {
    /// 20°C, 101 325 Pa, 50% humidity, sea level, still air.
    pub fn standard() -> Self {
        Self {
            temperature_c: constants::STANDARD_TEMPERATURE,
            pressure_pa: constants::SEA_LEVEL_PRESSURE,
            humidity: constants::STANDARD_HUMIDITY,
            altitude_m: 0.0,
            wind: Vec3::ZERO,
        }
    }

    /// Standard atmosphere at an elevation.
    ///
    /// Temperature drops with the tropospheric lapse rate from the 20°C
    /// reference and pressure follows the barometric formula.
    pub fn at_altitude(altitude_m: f64) -> Self {
        let base_k = constants::STANDARD_TEMPERATURE + KELVIN_OFFSET;
        let temp_k = base_k - LAPSE_RATE * altitude_m;
        let pressure_pa = constants::SEA_LEVEL_PRESSURE * (temp_k / base_k).powf(BAROMETRIC_EXPONENT);

        Self {
            temperature_c: temp_k - KELVIN_OFFSET,
            pressure_pa,
            altitude_m,
            ..Self::standard()
        }
    }

    /// Returns a copy with the given wind; the vertical component is dropped.
    pub fn with_wind(self, wind: Vec3) -> Self {
        Self {
            wind: wind.horizontal(),
            ..self
        }
    }

    /// Air density (kg/m³)
    pub fn air_density(&self) -> f64 {
        air_density(self.temperature_c, self.pressure_pa, self.humidity)
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        ensure_range("environment.temperature_c", self.temperature_c, -60.0, 60.0)?;
        ensure_range("environment.pressure_pa", self.pressure_pa, 30_000.0, 120_000.0)?;
        ensure_range("environment.humidity", self.humidity, 0.0, 1.0)?;
        ensure_range("environment.altitude_m", self.altitude_m, -500.0, 9_000.0)?;
        if !self.wind.is_finite() {
            return Err(SimulationError::invalid("environment.wind", "must be finite"));
        }
        if self.wind.y != 0.0 {
            return Err(SimulationError::invalid(
                "environment.wind",
                format!("vertical component must be zero, got {}", self.wind.y),
            ));
        }
        Ok(())
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::standard()
    }
}

/// Saturation vapour pressure over water (Pa), Buck (1981).
pub fn saturation_vapor_pressure(temperature_c: f64) -> f64 {
    let t = temperature_c;
    611.21 * ((18.678 - t / 234.5) * (t / (257.14 + t))).exp()
}

/// Moist-air density (kg/m³) from temperature (°C), pressure (Pa) and
/// relative humidity (0-1).
pub fn air_density(temperature_c: f64, pressure_pa: f64, humidity: f64) -> f64 {
    let temp_k = temperature_c + KELVIN_OFFSET;
    let vapor = humidity.clamp(0.0, 1.0) * saturation_vapor_pressure(temperature_c);
    let dry = (pressure_pa - vapor).max(0.0);
    dry / (R_DRY * temp_k) + vapor / (R_VAPOR * temp_k)
}

/// Density of the standard environment (kg/m³).
pub fn standard_air_density() -> f64 {
    Environment::standard().air_density()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_standard_density() {
        // 20°C, 1 atm, 50% RH is just under 1.2 kg/m³
        assert_abs_diff_eq!(standard_air_density(), 1.199, epsilon = 2e-3);
    }

    #[test]
    fn test_dry_air_density() {
        // 15°C dry air at 1 atm: 1.225 kg/m³
        assert_abs_diff_eq!(air_density(15.0, 101_325.0, 0.0), 1.225, epsilon = 1e-3);
    }

    #[test]
    fn test_humid_air_is_lighter() {
        let dry = air_density(30.0, 101_325.0, 0.0);
        let humid = air_density(30.0, 101_325.0, 1.0);
        assert!(humid < dry);
    }

    #[test]
    fn test_density_falls_with_temperature() {
        let cold = air_density(0.0, 101_325.0, 0.5);
        let hot = air_density(35.0, 101_325.0, 0.5);
        assert!(hot < cold);
    }

    #[test]
    fn test_saturation_vapor_pressure() {
        // ~2339 Pa at 20°C
        assert_abs_diff_eq!(saturation_vapor_pressure(20.0), 2339.0, epsilon = 5.0);
    }

    #[test]
    fn test_at_altitude() {
        let denver = Environment::at_altitude(1609.0);
        assert!(denver.pressure_pa < 86_000.0 && denver.pressure_pa > 82_000.0);
        assert!(denver.temperature_c < constants::STANDARD_TEMPERATURE);
        assert!(denver.air_density() < standard_air_density());
        assert!(denver.validate().is_ok());

        let sea_level = Environment::at_altitude(0.0);
        assert_abs_diff_eq!(sea_level.pressure_pa, constants::SEA_LEVEL_PRESSURE, epsilon = 1e-6);
    }

    #[test]
    fn test_validation_rejects_humidity_out_of_range() {
        let env = Environment {
            humidity: 1.2,
            ..Environment::standard()
        };
        assert!(matches!(
            env.validate(),
            Err(SimulationError::InvalidInput { field: "environment.humidity", .. })
        ));
    }

    #[test]
    fn test_validation_rejects_vertical_wind() {
        let env = Environment {
            wind: Vec3::new(3.0, 1.0, 0.0),
            ..Environment::standard()
        };
        assert!(env.validate().is_err());

        let env = Environment::standard().with_wind(Vec3::new(3.0, 1.0, 0.0));
        assert!(env.validate().is_ok());
        assert_eq!(env.wind.y, 0.0);
    }
}
