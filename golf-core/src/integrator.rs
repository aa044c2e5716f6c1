//! Numerical integrators for advancing the ball in time.
//!
//! The integrated state is position, velocity, spin rate and spin axis.
//! Spin follows the [`SpinModel`](crate::spin::SpinModel) derivative inside
//! every stage, so decay and precession are as accurate as the flight path.
//!
//! ## Classic RK4
//!
//! ```text
//! k1 = f(y)
//! k2 = f(y + dt/2·k1)
//! k3 = f(y + dt/2·k2)
//! k4 = f(y + dt·k3)
//! y' = y + dt/6·(k1 + 2·k2 + 2·k3 + k4)
//! ```
//!
//! ## Band crossings
//!
//! The drag and circulation tables jump at their thresholds, and RK4 loses
//! its order across a jump. Every step holds the [`Regime`] of its starting
//! state. When the end state lands in another band, the crossing is located
//! by bisection to within [`EVENT_TIME_TOLERANCE`] and the step ends there.
//!
//! ## Step doubling
//!
//! The adaptive stepper compares one full step with two half steps. The
//! tolerance is a budget for the whole run: a step of length `h` may use
//! `tolerance · h / horizon` of it. Steps that exceed their share are halved
//! and retried. At the minimum step the result is accepted anyway and
//! flagged as not converged.

use crate::forces::{FlightConditions, ForceModel, Regime};
use crate::types::{BallState, SpinState, Vec3};

/// Time resolution for locating band crossings and ground contact (s)
pub const EVENT_TIME_TOLERANCE: f64 = 1e-9;

/// Crossings handled within one fixed step before the rest is taken whole
const MAX_CROSSINGS_PER_STEP: usize = 32;

/// Result of an adaptive integration step.
#[derive(Debug, Clone, Copy)]
pub struct StepResult {
    /// New state after the step
    pub state: BallState,

    /// Step size actually taken
    pub dt_used: f64,

    /// Discrepancy between the full step and the two half steps
    pub error_estimate: f64,

    /// False when the step was forced through at the minimum step size
    pub converged: bool,
}

/// The last state before and the first state after an event.
#[derive(Debug, Clone, Copy)]
pub struct Bracket {
    pub before: BallState,
    pub after: BallState,
}

/// Narrows the step from `start` to `end` down to the event where
/// `crossed` first holds.
///
/// `advance(h)` must integrate from `start` by `h`, and `crossed(end)`
/// must hold. Bisection stops once the bracket is shorter than
/// [`EVENT_TIME_TOLERANCE`].
pub fn locate_event(
    start: &BallState,
    end: BallState,
    advance: impl Fn(f64) -> BallState,
    crossed: impl Fn(&BallState) -> bool,
) -> Bracket {
    let mut lo = 0.0;
    let mut hi = end.time - start.time;
    let mut bracket = Bracket {
        before: *start,
        after: end,
    };

    while hi - lo > EVENT_TIME_TOLERANCE {
        let mid = 0.5 * (lo + hi);
        let state = advance(mid);
        if crossed(&state) {
            hi = mid;
            bracket.after = state;
        } else {
            lo = mid;
            bracket.before = state;
        }
    }
    bracket
}

/// Time derivative of the integrated state
#[derive(Debug, Clone, Copy)]
struct Derivative {
    velocity: Vec3,
    acceleration: Vec3,
    spin_rate: f64,
    axis_rate: Vec3,
}

impl Derivative {
    /// RK4 weighting `(k1 + 2·k2 + 2·k3 + k4) / 6`
    fn blend(k1: &Self, k2: &Self, k3: &Self, k4: &Self) -> Self {
        Self {
            velocity: (k1.velocity + k2.velocity * 2.0 + k3.velocity * 2.0 + k4.velocity) / 6.0,
            acceleration: (k1.acceleration
                + k2.acceleration * 2.0
                + k3.acceleration * 2.0
                + k4.acceleration)
                / 6.0,
            spin_rate: (k1.spin_rate + 2.0 * k2.spin_rate + 2.0 * k3.spin_rate + k4.spin_rate)
                / 6.0,
            axis_rate: (k1.axis_rate + k2.axis_rate * 2.0 + k3.axis_rate * 2.0 + k4.axis_rate)
                / 6.0,
        }
    }
}

/// Fixed-step 4th-order Runge-Kutta integrator.
pub struct Rk4;

impl Rk4 {
    fn derivative<F: ForceModel>(
        state: &BallState,
        conditions: &FlightConditions<'_>,
        forces: &F,
        regime: Regime,
    ) -> Derivative {
        let (spin_rate, axis_rate) = conditions.spin_model.derivative(
            &state.spin,
            conditions.properties,
            conditions.environment,
            state.velocity,
        );
        Derivative {
            velocity: state.velocity,
            acceleration: forces.acceleration_in(state, conditions, regime),
            spin_rate,
            axis_rate,
        }
    }

    /// `state` moved along `slope` for `h` seconds
    fn offset(state: &BallState, slope: &Derivative, h: f64) -> BallState {
        BallState {
            position: state.position + slope.velocity * h,
            velocity: state.velocity + slope.acceleration * h,
            spin: SpinState {
                rate_rpm: state.spin.rate_rpm + slope.spin_rate * h,
                axis: state.spin.axis + slope.axis_rate * h,
            },
            time: state.time + h,
            ..*state
        }
    }

    /// Advance the ball state by one time step with the coefficient bands
    /// held at `regime`.
    ///
    /// # Arguments
    /// * `state` - Current ball state (position, velocity, spin)
    /// * `conditions` - Ball properties, air and spin model
    /// * `forces` - Force model providing accelerations
    /// * `regime` - Coefficient bands to hold for the whole step
    /// * `dt` - Time step in seconds
    ///
    /// # Returns
    /// New ball state after the time step. The spin rate never rises
    /// above its starting value and the axis is renormalized.
    pub fn step_in<F: ForceModel>(
        state: &BallState,
        conditions: &FlightConditions<'_>,
        forces: &F,
        regime: Regime,
        dt: f64,
    ) -> BallState {
        let half = 0.5 * dt;

        // Step 1: Slopes at the start, twice at the midpoint, and at the end
        let k1 = Self::derivative(state, conditions, forces, regime);
        let k2 = Self::derivative(&Self::offset(state, &k1, half), conditions, forces, regime);
        let k3 = Self::derivative(&Self::offset(state, &k2, half), conditions, forces, regime);
        let k4 = Self::derivative(&Self::offset(state, &k3, dt), conditions, forces, regime);

        // Step 2: Advance along the weighted slope
        let next = Self::offset(state, &Derivative::blend(&k1, &k2, &k3, &k4), dt);

        // Step 3: Restore the spin invariants the weighting can nudge
        BallState {
            spin: SpinState {
                rate_rpm: next.spin.rate_rpm.clamp(0.0, state.spin.rate_rpm),
                axis: next.spin.axis.try_normalized().unwrap_or(state.spin.axis),
            },
            ..next
        }
    }

    /// Advance the ball state by one time step in the bands of `state`.
    ///
    /// # Arguments
    /// * `state` - Current ball state (position, velocity, spin)
    /// * `conditions` - Ball properties, air and spin model
    /// * `forces` - Force model providing accelerations
    /// * `dt` - Time step in seconds
    ///
    /// # Returns
    /// New ball state after the time step; mass is carried over.
    pub fn step<F: ForceModel>(
        state: &BallState,
        conditions: &FlightConditions<'_>,
        forces: &F,
        dt: f64,
    ) -> BallState {
        Self::step_in(state, conditions, forces, forces.regime(state, conditions), dt)
    }

    /// Advance by exactly `dt`, splitting the step at every band crossing.
    ///
    /// The returned state sits on the caller's time grid; the split points
    /// are internal.
    pub fn step_across<F: ForceModel>(
        state: &BallState,
        conditions: &FlightConditions<'_>,
        forces: &F,
        dt: f64,
    ) -> BallState {
        let end_time = state.time + dt;
        let mut current = *state;

        for _ in 0..MAX_CROSSINGS_PER_STEP {
            let h = end_time - current.time;
            if h <= 0.0 {
                return current;
            }

            let regime = forces.regime(&current, conditions);
            let next = Self::step_in(&current, conditions, forces, regime, h);
            if forces.regime(&next, conditions) == regime {
                return next;
            }

            let from = current;
            current = locate_event(
                &from,
                next,
                |h| Self::step_in(&from, conditions, forces, regime, h),
                |s| forces.regime(s, conditions) != regime,
            )
            .after;
        }

        let h = end_time - current.time;
        if h <= 0.0 {
            current
        } else {
            Self::step(&current, conditions, forces, h)
        }
    }

    /// Advance the ball state by multiple substeps.
    ///
    /// Total time advanced is `substeps * dt`.
    pub fn step_n<F: ForceModel>(
        state: &BallState,
        conditions: &FlightConditions<'_>,
        forces: &F,
        dt: f64,
        substeps: usize,
    ) -> BallState {
        (0..substeps).fold(*state, |current, _| Self::step(&current, conditions, forces, dt))
    }
}

/// RK4 with step-doubling error control.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveRk4 {
    /// Error budget for a run of length `horizon` (m and m/s)
    pub tolerance: f64,

    /// Smallest step the halving may reach (s)
    pub min_dt: f64,

    /// Time the budget is spread over (s)
    pub horizon: f64,
}

impl AdaptiveRk4 {
    pub fn new(tolerance: f64, min_dt: f64, horizon: f64) -> Self {
        Self {
            tolerance,
            min_dt,
            horizon,
        }
    }

    /// Error allowed for a step of length `h`
    pub fn allowance(&self, h: f64) -> f64 {
        self.tolerance * h / self.horizon
    }

    /// Two RK4 half steps of `h` in the bands of `state`, without error
    /// control. This is the state an accepted step of length `h` returns.
    pub fn refine<F: ForceModel>(
        &self,
        state: &BallState,
        conditions: &FlightConditions<'_>,
        forces: &F,
        h: f64,
    ) -> BallState {
        let regime = forces.regime(state, conditions);
        Self::double_step(state, conditions, forces, regime, h)
    }

    fn double_step<F: ForceModel>(
        state: &BallState,
        conditions: &FlightConditions<'_>,
        forces: &F,
        regime: Regime,
        h: f64,
    ) -> BallState {
        let half = Rk4::step_in(state, conditions, forces, regime, 0.5 * h);
        Rk4::step_in(&half, conditions, forces, regime, 0.5 * h)
    }

    /// Take one error-controlled step of at most `dt`.
    ///
    /// # Arguments
    /// * `state` - Current ball state (position, velocity, spin)
    /// * `conditions` - Ball properties, air and spin model
    /// * `forces` - Force model providing accelerations
    /// * `dt` - Largest step to try, in seconds
    ///
    /// # Returns
    /// The two-half-step state and the step actually taken. The step is
    /// shorter than `dt` when halving was needed or when it ends at a band
    /// crossing. `converged` is false when the minimum step could not meet
    /// the allowance.
    pub fn step<F: ForceModel>(
        &self,
        state: &BallState,
        conditions: &FlightConditions<'_>,
        forces: &F,
        dt: f64,
    ) -> StepResult {
        // Step 1: Hold the bands of the starting state
        let regime = forces.regime(state, conditions);
        let mut h = dt;

        // Step 2: Halve until the full/half discrepancy fits the allowance
        let (double, error, converged) = loop {
            let full = Rk4::step_in(state, conditions, forces, regime, h);
            let double = Self::double_step(state, conditions, forces, regime, h);

            let error = (full.position - double.position)
                .magnitude()
                .max((full.velocity - double.velocity).magnitude());

            if error <= self.allowance(h) {
                break (double, error, true);
            }
            if 0.5 * h < self.min_dt {
                break (double, error, false);
            }
            h *= 0.5;
        };

        // Step 3: End the step where the ball enters another band
        let state_after = if forces.regime(&double, conditions) == regime {
            double
        } else {
            locate_event(
                state,
                double,
                |h| Self::double_step(state, conditions, forces, regime, h),
                |s| forces.regime(s, conditions) != regime,
            )
            .after
        };

        StepResult {
            state: state_after,
            dt_used: state_after.time - state.time,
            error_estimate: error,
            converged,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;
    use crate::forces::AerodynamicModel;
    use crate::spin::SpinModel;
    use crate::types::{BallProperties, Forces};
    use approx::assert_abs_diff_eq;

    /// Simple gravity-only force model for testing
    struct GravityOnly;

    impl ForceModel for GravityOnly {
        fn forces_in(&self, state: &BallState, _: &FlightConditions<'_>, _: Regime) -> Forces {
            Forces {
                drag: Vec3::ZERO,
                lift: Vec3::ZERO,
                magnus: Vec3::ZERO,
                gravity: Vec3::new(0.0, -9.81 * state.mass, 0.0),
            }
        }
    }

    /// Linear spring toward the origin, for an exact reference solution
    struct Spring(f64);

    impl ForceModel for Spring {
        fn forces_in(&self, state: &BallState, _: &FlightConditions<'_>, _: Regime) -> Forces {
            Forces {
                drag: Vec3::ZERO,
                lift: Vec3::ZERO,
                magnus: Vec3::ZERO,
                gravity: state.position * (-self.0 * state.mass),
            }
        }
    }

    /// Constant push along +X that doubles once the ball passes x = 1
    struct Ledge;

    impl ForceModel for Ledge {
        fn regime(&self, state: &BallState, _: &FlightConditions<'_>) -> Regime {
            Regime {
                reynolds: usize::from(state.position.x > 1.0),
                ..Regime::default()
            }
        }

        fn forces_in(&self, state: &BallState, _: &FlightConditions<'_>, regime: Regime) -> Forces {
            let push = if regime.reynolds == 0 { 1.0 } else { 2.0 };
            Forces {
                drag: Vec3::new(push * state.mass, 0.0, 0.0),
                lift: Vec3::ZERO,
                magnus: Vec3::ZERO,
                gravity: Vec3::ZERO,
            }
        }
    }

    fn launch(position: Vec3, velocity: Vec3) -> BallState {
        BallState::new(
            position,
            velocity,
            SpinState::new(2500.0, Vec3::new(0.0, 0.0, 1.0)).unwrap(),
            BallProperties::regulation().mass,
        )
    }

    #[test]
    fn test_free_fall_is_exact() {
        let props = BallProperties::regulation();
        let env = Environment::standard();
        let conditions = FlightConditions::new(&props, &env);

        let initial = launch(Vec3::new(0.0, 10.0, 0.0), Vec3::new(5.0, 0.0, 0.0));
        let state = Rk4::step_n(&initial, &conditions, &GravityOnly, 0.01, 100);

        // Quadratic motion is integrated exactly by RK4
        assert_abs_diff_eq!(state.time, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(state.position.y, 10.0 - 0.5 * 9.81, epsilon = 1e-9);
        assert_abs_diff_eq!(state.position.x, 5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(state.velocity.y, -9.81, epsilon = 1e-9);
    }

    #[test]
    fn test_step_evolves_spin_and_keeps_mass() {
        let props = BallProperties::regulation();
        let env = Environment::standard();
        let conditions = FlightConditions::new(&props, &env);

        let initial = launch(Vec3::ZERO, Vec3::new(40.0, 10.0, 0.0));
        let next = Rk4::step(&initial, &conditions, &AerodynamicModel::new(), 0.01);
        assert!(next.spin.rate_rpm < initial.spin.rate_rpm);
        assert!(next.spin.axis.y > initial.spin.axis.y);
        assert_abs_diff_eq!(next.spin.axis.magnitude(), 1.0, epsilon = 1e-12);
        assert_eq!(next.mass, initial.mass);
        assert_ne!(next.position, initial.position);
    }

    #[test]
    fn test_integrated_spin_matches_closed_form() {
        let props = BallProperties::regulation();
        let env = Environment::standard();
        let model = SpinModel::new();
        let conditions = FlightConditions::new(&props, &env).with_spin_model(model);

        // No forces: the velocity, and so the decay constant, stays put
        let coasting = AerodynamicModel {
            enable_gravity: false,
            enable_drag: false,
            enable_lift: false,
            ..AerodynamicModel::new()
        };
        let initial = BallState::new(
            Vec3::ZERO,
            Vec3::new(44.7, 0.0, 0.0),
            SpinState::new(3000.0, Vec3::new(0.0, 0.3, 1.0)).unwrap(),
            props.mass,
        );
        let integrated = Rk4::step_n(&initial, &conditions, &coasting, 0.05, 100);
        let closed = model
            .evolve(&initial.spin, &props, &env, initial.velocity, 5.0)
            .unwrap();

        assert_abs_diff_eq!(integrated.spin.rate_rpm, closed.rate_rpm, epsilon = 1e-6);
        assert!((integrated.spin.axis - closed.axis).magnitude() < 1e-8);
    }

    #[test]
    fn test_rk4_fourth_order_on_oscillator() {
        let props = BallProperties::regulation();
        let env = Environment::standard();
        let conditions = FlightConditions::new(&props, &env);
        let spring = Spring(1.0);

        let initial = launch(Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO);
        let exact = 1.0_f64.cos();

        let coarse = Rk4::step_n(&initial, &conditions, &spring, 0.1, 10);
        let fine = Rk4::step_n(&initial, &conditions, &spring, 0.05, 20);
        let coarse_err = (coarse.position.x - exact).abs();
        let fine_err = (fine.position.x - exact).abs();

        // Halving dt should cut the error by ~16x
        assert!(coarse_err / fine_err > 12.0, "ratio {}", coarse_err / fine_err);
    }

    #[test]
    fn test_step_across_splits_at_band_crossing() {
        let props = BallProperties::regulation();
        let env = Environment::standard();
        let conditions = FlightConditions::new(&props, &env);

        // x = t²/2 reaches the ledge at t = √2, then accelerates at 2 m/s²
        let initial = launch(Vec3::ZERO, Vec3::ZERO);
        let edge = 2.0_f64.sqrt();
        let exact = |t: f64| 1.0 + edge * (t - edge) + (t - edge).powi(2);

        let state = (0..20).fold(initial, |s, _| {
            Rk4::step_across(&s, &conditions, &Ledge, 0.1)
        });
        assert_abs_diff_eq!(state.time, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(state.position.x, exact(2.0), epsilon = 1e-8);

        // Without the split the jump costs first-order accuracy
        let naive = Rk4::step_n(&initial, &conditions, &Ledge, 0.1, 20);
        assert!((naive.position.x - exact(2.0)).abs() > 1e-4);
    }

    #[test]
    fn test_locate_event_brackets_crossing() {
        let props = BallProperties::regulation();
        let env = Environment::standard();
        let conditions = FlightConditions::new(&props, &env);

        let initial = launch(Vec3::new(0.0, 10.0, 0.0), Vec3::ZERO);
        let end = Rk4::step(&initial, &conditions, &GravityOnly, 2.0);
        let bracket = locate_event(
            &initial,
            end,
            |h| Rk4::step(&initial, &conditions, &GravityOnly, h),
            |s| s.position.y < 0.0,
        );

        let impact = (20.0_f64 / 9.81).sqrt();
        assert!(bracket.before.position.y >= 0.0);
        assert!(bracket.after.position.y < 0.0);
        assert!(bracket.after.time - bracket.before.time <= EVENT_TIME_TOLERANCE);
        assert_abs_diff_eq!(bracket.after.time, impact, epsilon = 1e-8);
    }

    #[test]
    fn test_adaptive_accepts_easy_step() {
        let props = BallProperties::regulation();
        let env = Environment::standard();
        let conditions = FlightConditions::new(&props, &env);

        let stepper = AdaptiveRk4::new(1e-6, 1e-6, 1.0);
        let initial = launch(Vec3::ZERO, Vec3::new(5.0, 5.0, 0.0));
        let result = stepper.step(&initial, &conditions, &GravityOnly, 0.1);

        assert!(result.converged);
        assert_eq!(result.dt_used, 0.1);
        assert_abs_diff_eq!(result.state.time, 0.1, epsilon = 1e-15);
    }

    #[test]
    fn test_adaptive_halves_stiff_step() {
        let props = BallProperties::regulation();
        let env = Environment::standard();
        let conditions = FlightConditions::new(&props, &env);

        let stepper = AdaptiveRk4::new(1e-8, 1e-6, 1.0);
        let stiff = Spring(400.0);
        let initial = launch(Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO);
        let result = stepper.step(&initial, &conditions, &stiff, 0.1);

        assert!(result.converged);
        assert!(result.dt_used < 0.1);
        assert!(result.error_estimate <= stepper.allowance(result.dt_used));
    }

    #[test]
    fn test_allowance_scales_with_step() {
        let stepper = AdaptiveRk4::new(1e-4, 1e-5, 10.0);
        assert_abs_diff_eq!(stepper.allowance(0.01), 1e-7, epsilon = 1e-20);
        assert_abs_diff_eq!(stepper.allowance(10.0), 1e-4, epsilon = 1e-20);
    }

    #[test]
    fn test_adaptive_ends_step_at_band_crossing() {
        let props = BallProperties::regulation();
        let env = Environment::standard();
        let conditions = FlightConditions::new(&props, &env);

        let stepper = AdaptiveRk4::new(1e-6, 1e-6, 1.0);
        let initial = launch(Vec3::new(0.9, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
        let result = stepper.step(&initial, &conditions, &Ledge, 0.5);

        // 0.9 + t + t²/2 = 1 at t = √1.2 - 1
        assert!(result.converged);
        let crossing = 1.2_f64.sqrt() - 1.0;
        assert_abs_diff_eq!(result.dt_used, crossing, epsilon = 2.0 * EVENT_TIME_TOLERANCE);
        assert!(result.state.position.x > 1.0);
    }

    #[test]
    fn test_adaptive_flags_precision_floor() {
        let props = BallProperties::regulation();
        let env = Environment::standard();
        let conditions = FlightConditions::new(&props, &env);

        // Tolerance nothing can meet: halving must stop at the floor
        let stepper = AdaptiveRk4::new(0.0, 0.01, 1.0);
        let initial = launch(Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO);
        let result = stepper.step(&initial, &conditions, &Spring(400.0), 0.1);

        assert!(!result.converged);
        assert!(result.dt_used >= 0.01);
        assert!(result.dt_used < 0.04);
    }
}
