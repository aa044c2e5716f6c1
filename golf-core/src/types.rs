//! Core types for the flight simulation.
//!
//! All units are SI except spin rate:
//! - Position: meters (m)
//! - Velocity: meters per second (m/s)
//! - Spin rate: revolutions per minute (rpm)
//! - Mass: kilograms (kg)
//! - Force: Newtons (N)

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use crate::error::{ensure_finite, SimulationError};

// =============================================================================
// Vec3 - 3D Vector
// =============================================================================

/// A 3D vector used for positions, velocities, spin axes, and forces.
///
/// Coordinate system:
/// - X: horizontal, down the target line
/// - Y: vertical (positive upward)
/// - Z: horizontal, to the right of the target line
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const UP: Vec3 = Vec3 {
        x: 0.0,
        y: 1.0,
        z: 0.0,
    };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Squared magnitude (avoids sqrt for comparisons)
    pub fn magnitude_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    /// Magnitude (length) of the vector
    pub fn magnitude(&self) -> f64 {
        self.magnitude_squared().sqrt()
    }

    /// Returns a unit vector in the same direction, or zero if magnitude is zero
    pub fn normalized(&self) -> Self {
        self.try_normalized().unwrap_or(Self::ZERO)
    }

    /// Unit vector in the same direction, `None` for a (near) zero vector.
    pub fn try_normalized(&self) -> Option<Self> {
        let mag = self.magnitude();
        if mag < constants::EPSILON || !mag.is_finite() {
            None
        } else {
            Some(*self / mag)
        }
    }

    /// Dot product
    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Cross product
    pub fn cross(&self, other: &Self) -> Self {
        Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    /// Linear interpolation between two vectors
    pub fn lerp(&self, other: &Self, t: f64) -> Self {
        *self + (*other - *self) * t
    }

    /// Projection onto the ground plane (y = 0)
    pub fn horizontal(&self) -> Self {
        Self::new(self.x, 0.0, self.z)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

// Operator overloads for Vec3
impl Add for Vec3 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.y += other.y;
        self.z += other.z;
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

impl SubAssign for Vec3 {
    fn sub_assign(&mut self, other: Self) {
        self.x -= other.x;
        self.y -= other.y;
        self.z -= other.z;
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;
    fn mul(self, scalar: f64) -> Self {
        Self {
            x: self.x * scalar,
            y: self.y * scalar,
            z: self.z * scalar,
        }
    }
}

impl Div<f64> for Vec3 {
    type Output = Self;
    fn div(self, scalar: f64) -> Self {
        Self {
            x: self.x / scalar,
            y: self.y / scalar,
            z: self.z / scalar,
        }
    }
}

impl Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}

impl Default for Vec3 {
    fn default() -> Self {
        Self::ZERO
    }
}

// =============================================================================
// Spin State
// =============================================================================

/// Spin of the ball: a rate in rpm about a unit axis.
///
/// The axis follows the right-hand rule. For a ball heading down +X,
/// pure backspin is an axis of +Z, which makes `axis × velocity` point up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpinState {
    pub rate_rpm: f64,
    pub axis: Vec3,
}

impl SpinState {
    /// Builds a spin state, normalizing the axis.
    ///
    /// A zero-length axis has no direction and is rejected.
    pub fn new(rate_rpm: f64, axis: Vec3) -> Result<Self, SimulationError> {
        let axis = axis
            .try_normalized()
            .ok_or(SimulationError::DegenerateSpinAxis)?;
        Ok(Self { rate_rpm, axis })
    }

    /// Spin rate in rad/s.
    pub fn rad_per_sec(&self) -> f64 {
        self.rate_rpm * constants::RPM_TO_RAD_PER_SEC
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        ensure_finite("spin.rate_rpm", self.rate_rpm)?;
        if self.rate_rpm < 0.0 {
            return Err(SimulationError::invalid(
                "spin.rate_rpm",
                format!("must be non-negative, got {}", self.rate_rpm),
            ));
        }
        if !self.axis.is_finite() {
            return Err(SimulationError::invalid("spin.axis", "must be finite"));
        }
        if self.axis.try_normalized().is_none() {
            return Err(SimulationError::DegenerateSpinAxis);
        }
        Ok(())
    }
}

// =============================================================================
// Ball State
// =============================================================================

/// Complete state of the ball at a given instant.
///
/// Each integration step produces a new value; states are never
/// updated in place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallState {
    pub position: Vec3,
    pub velocity: Vec3,
    pub spin: SpinState,
    pub mass: f64,
    pub time: f64,
}

impl BallState {
    pub fn new(position: Vec3, velocity: Vec3, spin: SpinState, mass: f64) -> Self {
        Self {
            position,
            velocity,
            spin,
            mass,
            time: 0.0,
        }
    }

    /// Builds a launch state from the numbers a launch monitor reports.
    ///
    /// Angles are in degrees. Azimuth rotates the heading from +X toward +Z.
    /// Zero tilt gives pure backspin; positive tilt leans the axis toward +Y.
    pub fn from_launch(
        position: Vec3,
        ball_speed: f64,
        launch_angle_deg: f64,
        azimuth_deg: f64,
        spin_rpm: f64,
        spin_axis_tilt_deg: f64,
        mass: f64,
    ) -> Result<Self, SimulationError> {
        let launch = launch_angle_deg.to_radians();
        let azimuth = azimuth_deg.to_radians();
        let tilt = spin_axis_tilt_deg.to_radians();

        let heading = Vec3::new(azimuth.cos(), 0.0, azimuth.sin());
        let velocity = (heading * launch.cos() + Vec3::UP * launch.sin()) * ball_speed;

        let backspin_axis = heading.cross(&Vec3::UP);
        let axis = backspin_axis * tilt.cos() + Vec3::UP * tilt.sin();

        let state = Self::new(position, velocity, SpinState::new(spin_rpm, axis)?, mass);
        state.validate()?;
        Ok(state)
    }

    /// Speed (m/s)
    pub fn speed(&self) -> f64 {
        self.velocity.magnitude()
    }

    pub fn sample(&self) -> Sample {
        Sample {
            position: self.position,
            velocity: self.velocity,
            time: self.time,
        }
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        if !self.position.is_finite() {
            return Err(SimulationError::invalid("state.position", "must be finite"));
        }
        if !self.velocity.is_finite() {
            return Err(SimulationError::invalid("state.velocity", "must be finite"));
        }
        ensure_finite("state.mass", self.mass)?;
        if self.mass <= 0.0 {
            return Err(SimulationError::invalid(
                "state.mass",
                format!("must be positive, got {}", self.mass),
            ));
        }
        ensure_finite("state.time", self.time)?;
        self.spin.validate()
    }
}

/// One accepted point of a trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub position: Vec3,
    pub velocity: Vec3,
    pub time: f64,
}

// =============================================================================
// Ball Properties
// =============================================================================

/// Dimple pattern class of the cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceTexture {
    Smooth,
    Textured,
    Rough,
}

impl SurfaceTexture {
    /// (drag, lift) multipliers
    pub fn multipliers(&self) -> (f64, f64) {
        match self {
            Self::Smooth => (1.20, 0.80),
            Self::Textured => (1.00, 1.00),
            Self::Rough => (1.10, 1.05),
        }
    }
}

/// Cover geometry that modifies drag and lift.
///
/// The reference cover (75% coverage, 0.25 mm deep dimples, textured)
/// leaves both coefficients unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceEffects {
    /// Fraction of the cover occupied by dimples (0-1)
    pub dimple_coverage: f64,
    /// Dimple depth in millimeters
    pub dimple_depth_mm: f64,
    pub texture: SurfaceTexture,
}

impl SurfaceEffects {
    const REFERENCE_COVERAGE: f64 = 0.75;
    const REFERENCE_DEPTH_MM: f64 = 0.25;

    /// (drag, lift) multipliers combining coverage, depth and texture.
    pub fn multipliers(&self) -> (f64, f64) {
        let coverage = self.dimple_coverage - Self::REFERENCE_COVERAGE;
        let depth = (self.dimple_depth_mm - Self::REFERENCE_DEPTH_MM) / Self::REFERENCE_DEPTH_MM;
        let (texture_drag, texture_lift) = self.texture.multipliers();

        let drag = (1.0 - 0.25 * coverage) * (1.0 + 0.05 * depth * depth) * texture_drag;
        let lift = ((1.0 + 0.2 * coverage) * (1.0 - 0.05 * depth * depth)).max(0.0) * texture_lift;
        (drag, lift)
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        ensure_finite("surface.dimple_coverage", self.dimple_coverage)?;
        ensure_finite("surface.dimple_depth_mm", self.dimple_depth_mm)?;
        if !(0.0..=1.0).contains(&self.dimple_coverage) {
            return Err(SimulationError::invalid(
                "surface.dimple_coverage",
                format!("must be within [0, 1], got {}", self.dimple_coverage),
            ));
        }
        if !(0.0..=1.0).contains(&self.dimple_depth_mm) {
            return Err(SimulationError::invalid(
                "surface.dimple_depth_mm",
                format!("must be within [0, 1] mm, got {}", self.dimple_depth_mm),
            ));
        }
        Ok(())
    }
}

impl Default for SurfaceEffects {
    fn default() -> Self {
        Self {
            dimple_coverage: Self::REFERENCE_COVERAGE,
            dimple_depth_mm: Self::REFERENCE_DEPTH_MM,
            texture: SurfaceTexture::Textured,
        }
    }
}

/// Physical properties of a ball.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallProperties {
    pub name: String,
    pub mass: f64,
    pub radius: f64,
    /// Base drag coefficient; scales the Reynolds table relative to
    /// [`constants::REFERENCE_DRAG_COEFFICIENT`]
    pub drag_coefficient: f64,
    /// Base lift coefficient, multiplied by the spin circulation strength
    pub lift_coefficient: f64,
    /// Coupling of spin to gyroscopic precession of the axis
    pub magnus_coefficient: f64,
    /// Spin decay constant (1/s) under reference conditions
    pub spin_decay_rate: f64,
    #[serde(default)]
    pub surface: Option<SurfaceEffects>,
}

impl BallProperties {
    /// USGA-conforming ball: 45.93 g, 42.67 mm diameter.
    pub fn regulation() -> Self {
        Self {
            name: "Regulation".to_string(),
            mass: 0.04593,
            radius: 0.021335,
            drag_coefficient: constants::REFERENCE_DRAG_COEFFICIENT,
            lift_coefficient: 0.21,
            magnus_coefficient: 0.25,
            spin_decay_rate: constants::REFERENCE_SPIN_DECAY,
            surface: None,
        }
    }

    /// Cross-sectional area (m²)
    pub fn area(&self) -> f64 {
        std::f64::consts::PI * self.radius * self.radius
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        for (field, value) in [
            ("properties.mass", self.mass),
            ("properties.radius", self.radius),
        ] {
            ensure_finite(field, value)?;
            if value <= 0.0 {
                return Err(SimulationError::invalid(
                    field,
                    format!("must be positive, got {value}"),
                ));
            }
        }
        for (field, value) in [
            ("properties.drag_coefficient", self.drag_coefficient),
            ("properties.lift_coefficient", self.lift_coefficient),
            ("properties.magnus_coefficient", self.magnus_coefficient),
            ("properties.spin_decay_rate", self.spin_decay_rate),
        ] {
            ensure_finite(field, value)?;
            if value < 0.0 {
                return Err(SimulationError::invalid(
                    field,
                    format!("must be non-negative, got {value}"),
                ));
            }
        }
        if let Some(surface) = &self.surface {
            surface.validate()?;
        }
        Ok(())
    }
}

impl Default for BallProperties {
    fn default() -> Self {
        Self::regulation()
    }
}

// =============================================================================
// Forces
// =============================================================================

/// Forces acting on the ball at one instant (N).
///
/// `magnus` is the same vector as `lift`: the lift on a golf ball is the
/// Magnus force. [`Forces::total`] counts it once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Forces {
    pub drag: Vec3,
    pub lift: Vec3,
    pub magnus: Vec3,
    pub gravity: Vec3,
}

impl Forces {
    pub fn total(&self) -> Vec3 {
        self.drag + self.lift + self.gravity
    }
}

// =============================================================================
// Physical Constants
// =============================================================================

/// Physical constants used in the simulation.
pub mod constants {
    /// Gravitational acceleration (m/s²)
    pub const GRAVITY: f64 = 9.81;

    /// Dynamic viscosity of dry air near 20°C (Pa·s)
    pub const AIR_VISCOSITY: f64 = 1.81e-5;

    /// Regulation ball diameter (m)
    pub const REGULATION_DIAMETER: f64 = 0.04267;

    /// Drag coefficient the Reynolds table is calibrated for
    pub const REFERENCE_DRAG_COEFFICIENT: f64 = 0.225;

    /// Spin decay constant giving ~8% loss after 1 s at reference conditions (1/s)
    pub const REFERENCE_SPIN_DECAY: f64 = 0.0834;

    /// Reference ball speed for spin decay (m/s, ~100 mph)
    pub const REFERENCE_SPEED: f64 = 44.7;

    /// Standard sea-level pressure (Pa)
    pub const SEA_LEVEL_PRESSURE: f64 = 101_325.0;

    /// Standard temperature (°C)
    pub const STANDARD_TEMPERATURE: f64 = 20.0;

    /// Standard relative humidity (fraction)
    pub const STANDARD_HUMIDITY: f64 = 0.5;

    pub const RPM_TO_RAD_PER_SEC: f64 = std::f64::consts::PI / 30.0;

    /// Small value for floating-point comparisons
    pub const EPSILON: f64 = 1e-10;
}

// =============================================================================
// Tests
// =============================================================================
