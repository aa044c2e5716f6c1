//! Aerodynamic forces acting on the ball.
//!
//! This module implements the `ForceModel` trait for golf ball flight:
//!
//! - **Gravity**: `(0, -g·m, 0)`
//! - **Drag**: opposes the air-relative velocity, `½·ρ·A·Cd·v²`
//! - **Lift (Magnus)**: along `spin_axis × velocity`, `½·ρ·A·Cl·v²`
//!
//! ## Coefficients
//!
//! ```text
//! Re = ρ·v·D / μ
//! Cd = table(Re) · (Cd_ball / 0.225) · (1 + 0.1·vortex(v)) · surface_drag
//! Cl = Cl_ball · circulation(rpm) · surface_lift
//! ```
//!
//! Backspin on a ball heading down +X is an axis of +Z, and
//! `+Z × +X = +Y`, so backspin holds the ball up.
//!
//! ## Regimes
//!
//! The coefficient tables are piecewise constant, so the force field jumps
//! wherever the Reynolds number or spin rate crosses a band threshold. A
//! [`Regime`] names the bands in effect; steppers hold it fixed for a step
//! and end the step where the ball enters a different band.

use serde::{Deserialize, Serialize};

use crate::environment::Environment;
use crate::spin::SpinModel;
use crate::table::{CIRCULATION_BY_RPM, DRAG_BY_REYNOLDS, VORTEX_BY_SPEED};
use crate::types::{constants, BallProperties, BallState, Forces, Vec3};

/// Ball, air and spin dynamics for one simulation, with the air density
/// computed once.
#[derive(Debug, Clone, Copy)]
pub struct FlightConditions<'a> {
    pub properties: &'a BallProperties,
    pub environment: &'a Environment,
    pub air_density: f64,
    pub spin_model: SpinModel,
}

impl<'a> FlightConditions<'a> {
    pub fn new(properties: &'a BallProperties, environment: &'a Environment) -> Self {
        Self {
            properties,
            environment,
            air_density: environment.air_density(),
            spin_model: SpinModel::default(),
        }
    }

    pub fn with_spin_model(self, spin_model: SpinModel) -> Self {
        Self { spin_model, ..self }
    }
}

/// Coefficient bands in effect, as indices into the lookup tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Regime {
    pub reynolds: usize,
    pub vortex: usize,
    pub circulation: usize,
}

/// Trait for computing the forces on the ball.
///
/// Implementations must be shareable across threads so batches can run
/// in parallel.
pub trait ForceModel: Send + Sync {
    /// Coefficient bands at `state`. Models without banded coefficients
    /// keep the default, which never changes.
    fn regime(&self, _state: &BallState, _conditions: &FlightConditions<'_>) -> Regime {
        Regime::default()
    }

    /// Forces with the coefficient bands held at `regime`.
    fn forces_in(
        &self,
        state: &BallState,
        conditions: &FlightConditions<'_>,
        regime: Regime,
    ) -> Forces;

    /// Forces for the current state.
    fn forces(&self, state: &BallState, conditions: &FlightConditions<'_>) -> Forces {
        self.forces_in(state, conditions, self.regime(state, conditions))
    }

    /// Linear acceleration (m/s²) with the bands held at `regime`
    fn acceleration_in(
        &self,
        state: &BallState,
        conditions: &FlightConditions<'_>,
        regime: Regime,
    ) -> Vec3 {
        self.forces_in(state, conditions, regime).total() / state.mass
    }

    /// Linear acceleration (m/s²)
    fn acceleration(&self, state: &BallState, conditions: &FlightConditions<'_>) -> Vec3 {
        self.acceleration_in(state, conditions, self.regime(state, conditions))
    }
}

/// Complete force model for golf ball flight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AerodynamicModel {
    /// Dynamic viscosity of air (Pa·s)
    pub air_viscosity: f64,

    /// Diameter used for the Reynolds number (m)
    pub ball_diameter: f64,

    /// Enable/disable individual forces (useful for testing)
    pub enable_gravity: bool,
    pub enable_drag: bool,
    pub enable_lift: bool,
}

impl Default for AerodynamicModel {
    fn default() -> Self {
        Self {
            air_viscosity: constants::AIR_VISCOSITY,
            ball_diameter: constants::REGULATION_DIAMETER,
            enable_gravity: true,
            enable_drag: true,
            enable_lift: true,
        }
    }
}

impl AerodynamicModel {
    /// Create a new force model with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a force model with only gravity (for testing).
    pub fn gravity_only() -> Self {
        Self {
            enable_drag: false,
            enable_lift: false,
            ..Self::default()
        }
    }

    pub fn reynolds_number(&self, air_density: f64, speed: f64) -> f64 {
        air_density * speed * self.ball_diameter / self.air_viscosity
    }

    /// Multiplier applied to the drag coefficient for vortex shedding.
    pub fn vortex_multiplier(speed: f64) -> f64 {
        1.0 + 0.1 * VORTEX_BY_SPEED.lookup(speed)
    }

    /// Bands for an air-relative speed and spin rate. Disabled forces stay
    /// in band 0 so they never split a step.
    pub fn regime_at(&self, air_density: f64, speed: f64, rate_rpm: f64) -> Regime {
        let mut regime = Regime::default();
        if self.enable_drag {
            regime.reynolds = DRAG_BY_REYNOLDS.band(self.reynolds_number(air_density, speed));
            regime.vortex = VORTEX_BY_SPEED.band(speed);
        }
        if self.enable_lift {
            regime.circulation = CIRCULATION_BY_RPM.band(rate_rpm);
        }
        regime
    }

    /// Effective drag coefficient at the given air-relative speed.
    pub fn drag_coefficient(&self, props: &BallProperties, air_density: f64, speed: f64) -> f64 {
        let re = self.reynolds_number(air_density, speed);
        let regime = Regime {
            reynolds: DRAG_BY_REYNOLDS.band(re),
            vortex: VORTEX_BY_SPEED.band(speed),
            circulation: 0,
        };
        Self::banded_drag_coefficient(props, regime)
    }

    fn banded_drag_coefficient(props: &BallProperties, regime: Regime) -> f64 {
        let ball_scale = props.drag_coefficient / constants::REFERENCE_DRAG_COEFFICIENT;
        let vortex = 1.0 + 0.1 * VORTEX_BY_SPEED.value(regime.vortex);
        let surface = props.surface.map_or(1.0, |s| s.multipliers().0);

        DRAG_BY_REYNOLDS.value(regime.reynolds) * ball_scale * vortex * surface
    }

    /// Effective lift coefficient for the current spin rate.
    pub fn lift_coefficient(&self, props: &BallProperties, rate_rpm: f64) -> f64 {
        if rate_rpm <= 0.0 {
            return 0.0;
        }
        Self::banded_lift_coefficient(props, CIRCULATION_BY_RPM.band(rate_rpm))
    }

    fn banded_lift_coefficient(props: &BallProperties, circulation: usize) -> f64 {
        let surface = props.surface.map_or(1.0, |s| s.multipliers().1);
        props.lift_coefficient * CIRCULATION_BY_RPM.value(circulation) * surface
    }

    /// Drag force: `-0.5 * ρ * Cd * A * |v|² * v̂`
    fn drag_force(
        &self,
        air_velocity: Vec3,
        conditions: &FlightConditions<'_>,
        regime: Regime,
    ) -> Vec3 {
        let speed_sq = air_velocity.magnitude_squared();
        if speed_sq < constants::EPSILON {
            return Vec3::ZERO;
        }

        let props = conditions.properties;
        let cd = Self::banded_drag_coefficient(props, regime);
        let magnitude = 0.5 * conditions.air_density * props.area() * cd * speed_sq;

        air_velocity.normalized() * (-magnitude)
    }

    /// Lift force: `0.5 * ρ * Cl * A * |v|² * (ω̂ × v̂)`
    fn lift_force(
        &self,
        state: &BallState,
        air_velocity: Vec3,
        conditions: &FlightConditions<'_>,
        regime: Regime,
    ) -> Vec3 {
        let speed_sq = air_velocity.magnitude_squared();
        if speed_sq < constants::EPSILON || state.spin.rate_rpm <= 0.0 {
            return Vec3::ZERO;
        }

        // Axis parallel to the airflow (pure rifle spin) produces no lift
        let Some(direction) = state.spin.axis.cross(&air_velocity).try_normalized() else {
            return Vec3::ZERO;
        };

        let props = conditions.properties;
        let cl = Self::banded_lift_coefficient(props, regime.circulation);
        let magnitude = 0.5 * conditions.air_density * props.area() * cl * speed_sq;

        direction * magnitude
    }
}

impl ForceModel for AerodynamicModel {
    fn regime(&self, state: &BallState, conditions: &FlightConditions<'_>) -> Regime {
        let air_speed = (state.velocity - conditions.environment.wind).magnitude();
        self.regime_at(conditions.air_density, air_speed, state.spin.rate_rpm)
    }

    fn forces_in(
        &self,
        state: &BallState,
        conditions: &FlightConditions<'_>,
        regime: Regime,
    ) -> Forces {
        let air_velocity = state.velocity - conditions.environment.wind;

        let drag = if self.enable_drag {
            self.drag_force(air_velocity, conditions, regime)
        } else {
            Vec3::ZERO
        };

        let lift = if self.enable_lift {
            self.lift_force(state, air_velocity, conditions, regime)
        } else {
            Vec3::ZERO
        };

        let gravity = if self.enable_gravity {
            Vec3::new(0.0, -constants::GRAVITY * state.mass, 0.0)
        } else {
            Vec3::ZERO
        };

        Forces {
            drag,
            lift,
            magnus: lift,
            gravity,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SpinState, SurfaceEffects, SurfaceTexture};
    use approx::assert_abs_diff_eq;

    fn ball(velocity: Vec3, rpm: f64, axis: Vec3) -> BallState {
        let props = BallProperties::regulation();
        BallState::new(
            Vec3::ZERO,
            velocity,
            SpinState::new(rpm, axis).unwrap(),
            props.mass,
        )
    }

    fn backspin_ball(speed: f64) -> BallState {
        ball(Vec3::new(speed, 0.0, 0.0), 3000.0, Vec3::new(0.0, 0.0, 1.0))
    }

    #[test]
    fn test_gravity_only() {
        let forces = AerodynamicModel::gravity_only();
        let props = BallProperties::regulation();
        let env = Environment::standard();
        let conditions = FlightConditions::new(&props, &env);

        let acc = forces.acceleration(&backspin_ball(40.0), &conditions);

        assert_abs_diff_eq!(acc.x, 0.0, epsilon = constants::EPSILON);
        assert_abs_diff_eq!(acc.y, -constants::GRAVITY, epsilon = constants::EPSILON);
        assert_abs_diff_eq!(acc.z, 0.0, epsilon = constants::EPSILON);
    }

    #[test]
    fn test_gravity_scales_with_mass() {
        let forces = AerodynamicModel::new();
        let props = BallProperties::regulation();
        let env = Environment::standard();
        let conditions = FlightConditions::new(&props, &env);

        let f = forces.forces(&backspin_ball(40.0), &conditions);
        assert_abs_diff_eq!(f.gravity.y, -9.81 * props.mass, epsilon = 1e-12);
    }

    #[test]
    fn test_drag_opposes_motion() {
        let forces = AerodynamicModel {
            enable_gravity: false,
            enable_lift: false,
            ..AerodynamicModel::default()
        };
        let props = BallProperties::regulation();
        let env = Environment::standard();
        let conditions = FlightConditions::new(&props, &env);

        let state = ball(Vec3::new(30.0, 10.0, -5.0), 2500.0, Vec3::new(0.0, 0.0, 1.0));
        let f = forces.forces(&state, &conditions);

        let alignment = f.drag.normalized().dot(&state.velocity.normalized());
        assert_abs_diff_eq!(alignment, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_drag_magnitude_matches_equation() {
        let forces = AerodynamicModel::new();
        let props = BallProperties::regulation();
        let env = Environment::standard();
        let conditions = FlightConditions::new(&props, &env);

        let speed = 44.7;
        let f = forces.forces(&backspin_ball(speed), &conditions);

        // Re ≈ 1.2 * 44.7 * 0.04267 / 1.81e-5 ≈ 126k -> Cd 0.225, vortex 1.1
        let re = forces.reynolds_number(conditions.air_density, speed);
        assert!(re > 120_000.0 && re <= 130_000.0, "Re = {re}");
        let expected = 0.5 * conditions.air_density * props.area() * 0.225 * 1.1 * speed * speed;
        assert_abs_diff_eq!(f.drag.magnitude(), expected, epsilon = 1e-9);
    }

    #[test]
    fn test_drag_increases_with_speed() {
        let forces = AerodynamicModel::new();
        let props = BallProperties::regulation();
        let env = Environment::standard();
        let conditions = FlightConditions::new(&props, &env);

        let slow = forces.forces(&backspin_ball(10.0), &conditions);
        let fast = forces.forces(&backspin_ball(60.0), &conditions);

        // Drag ∝ v² (minus the falling Cd), so 6x speed gives well over 20x drag
        assert!(fast.drag.magnitude() > slow.drag.magnitude() * 20.0);
    }

    #[test]
    fn test_drag_coefficient_falls_with_reynolds() {
        let forces = AerodynamicModel::new();
        let props = BallProperties::regulation();
        let rho = 1.2;

        let speeds = [20.0, 40.0, 45.0, 50.0, 55.0, 60.0, 80.0];
        let cds: Vec<f64> = speeds
            .iter()
            .map(|&v| forces.drag_coefficient(&props, rho, v))
            .collect();
        assert!(cds.windows(2).all(|w| w[1] <= w[0]), "{cds:?}");
        assert_abs_diff_eq!(cds[0], 0.235 * 1.1, epsilon = 1e-12);
        assert_abs_diff_eq!(cds[6], 0.200 * 1.1, epsilon = 1e-12);
    }

    #[test]
    fn test_vortex_multiplier_bands() {
        assert_abs_diff_eq!(AerodynamicModel::vortex_multiplier(50.0), 1.1, epsilon = 1e-12);
        assert_abs_diff_eq!(AerodynamicModel::vortex_multiplier(130.0), 1.075, epsilon = 1e-12);
        assert_abs_diff_eq!(AerodynamicModel::vortex_multiplier(150.0), 1.05, epsilon = 1e-12);
        assert_abs_diff_eq!(AerodynamicModel::vortex_multiplier(200.0), 1.025, epsilon = 1e-12);
    }

    #[test]
    fn test_backspin_lifts() {
        let forces = AerodynamicModel::new();
        let props = BallProperties::regulation();
        let env = Environment::standard();
        let conditions = FlightConditions::new(&props, &env);

        let f = forces.forces(&backspin_ball(44.7), &conditions);
        assert!(f.lift.y > 0.0, "Backspin should lift, got {:?}", f.lift);
        assert_eq!(f.lift, f.magnus);

        let expected = 0.5 * conditions.air_density * props.area() * 0.315 * 44.7 * 44.7;
        assert_abs_diff_eq!(f.lift.magnitude(), expected, epsilon = 1e-9);
    }

    #[test]
    fn test_topspin_dives() {
        let forces = AerodynamicModel::new();
        let props = BallProperties::regulation();
        let env = Environment::standard();
        let conditions = FlightConditions::new(&props, &env);

        let state = ball(Vec3::new(30.0, 0.0, 0.0), 2000.0, Vec3::new(0.0, 0.0, -1.0));
        let f = forces.forces(&state, &conditions);
        assert!(f.lift.y < 0.0);
    }

    #[test]
    fn test_tilted_axis_curves_sideways() {
        let forces = AerodynamicModel::new();
        let props = BallProperties::regulation();
        let env = Environment::standard();
        let conditions = FlightConditions::new(&props, &env);

        // Axis leaning toward +Y: Y × X = -Z
        let state = ball(Vec3::new(40.0, 0.0, 0.0), 3000.0, Vec3::new(0.0, 0.5, 1.0));
        let f = forces.forces(&state, &conditions);
        assert!(f.lift.z < 0.0);
        assert!(f.lift.y > 0.0);
    }

    #[test]
    fn test_zero_velocity_has_no_aero_forces() {
        let forces = AerodynamicModel::new();
        let props = BallProperties::regulation();
        let env = Environment::standard();
        let conditions = FlightConditions::new(&props, &env);

        let f = forces.forces(&ball(Vec3::ZERO, 3000.0, Vec3::new(0.0, 0.0, 1.0)), &conditions);

        assert_eq!(f.drag, Vec3::ZERO);
        assert_eq!(f.lift, Vec3::ZERO);
        assert!(f.total().is_finite());
    }

    #[test]
    fn test_ball_moving_with_wind_has_no_aero_forces() {
        let forces = AerodynamicModel::new();
        let props = BallProperties::regulation();
        let env = Environment::standard().with_wind(Vec3::new(8.0, 0.0, 0.0));
        let conditions = FlightConditions::new(&props, &env);

        let f = forces.forces(&backspin_ball(8.0), &conditions);
        assert_eq!(f.drag, Vec3::ZERO);
        assert_eq!(f.lift, Vec3::ZERO);
    }

    #[test]
    fn test_headwind_increases_drag() {
        let forces = AerodynamicModel::new();
        let props = BallProperties::regulation();
        let calm = Environment::standard();
        let headwind = Environment::standard().with_wind(Vec3::new(-10.0, 0.0, 0.0));

        let state = backspin_ball(30.0);
        let calm_drag = forces.forces(&state, &FlightConditions::new(&props, &calm)).drag;
        let head_drag = forces.forces(&state, &FlightConditions::new(&props, &headwind)).drag;
        assert!(head_drag.magnitude() > calm_drag.magnitude());
    }

    #[test]
    fn test_no_spin_no_lift() {
        let forces = AerodynamicModel::new();
        let props = BallProperties::regulation();
        let env = Environment::standard();
        let conditions = FlightConditions::new(&props, &env);

        let state = ball(Vec3::new(40.0, 5.0, 0.0), 0.0, Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(forces.forces(&state, &conditions).lift, Vec3::ZERO);
    }

    #[test]
    fn test_surface_effects_scale_coefficients() {
        let forces = AerodynamicModel::new();
        let plain = BallProperties::regulation();
        let smooth = BallProperties {
            surface: Some(SurfaceEffects {
                texture: SurfaceTexture::Smooth,
                ..SurfaceEffects::default()
            }),
            ..BallProperties::regulation()
        };

        assert!(
            forces.drag_coefficient(&smooth, 1.2, 40.0) > forces.drag_coefficient(&plain, 1.2, 40.0)
        );
        assert!(forces.lift_coefficient(&smooth, 2800.0) < forces.lift_coefficient(&plain, 2800.0));
    }

    #[test]
    fn test_regime_follows_speed_and_spin() {
        let forces = AerodynamicModel::new();
        let props = BallProperties::regulation();
        let env = Environment::standard();
        let conditions = FlightConditions::new(&props, &env);

        let fast = forces.regime(&ball(Vec3::new(70.0, 0.0, 0.0), 2700.0, Vec3::UP), &conditions);
        let slow = forces.regime(&ball(Vec3::new(35.0, 0.0, 0.0), 1900.0, Vec3::UP), &conditions);
        assert_eq!(fast.reynolds, DRAG_BY_REYNOLDS.bands().len());
        assert_eq!(slow.reynolds, 0);
        assert_eq!(fast.circulation, 2);
        assert_eq!(slow.circulation, 0);

        // Held bands decide the coefficients, not the state
        let state = backspin_ball(35.0);
        let held = forces.forces_in(&state, &conditions, Regime { circulation: 4, ..fast });
        let own = forces.forces(&state, &conditions);
        assert!(held.drag.magnitude() < own.drag.magnitude());
        assert!(held.lift.magnitude() > own.lift.magnitude());

        let still = AerodynamicModel::gravity_only().regime(&backspin_ball(70.0), &conditions);
        assert_eq!(still, Regime::default());
    }

    #[test]
    fn test_thin_air_reduces_forces() {
        let forces = AerodynamicModel::new();
        let props = BallProperties::regulation();
        let sea_level = Environment::standard();
        let mountain = Environment::at_altitude(2500.0);

        let state = backspin_ball(50.0);
        let low = forces.forces(&state, &FlightConditions::new(&props, &sea_level));
        let high = forces.forces(&state, &FlightConditions::new(&props, &mountain));
        assert!(high.lift.magnitude() < low.lift.magnitude());
    }
}
