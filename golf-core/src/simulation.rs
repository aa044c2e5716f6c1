//! Trajectory simulation: the step loop, termination and summary metrics.
//!
//! A run starts from the caller's initial state and repeats:
//!
//! 1. integrate position, velocity and spin by one (fixed or adaptive) RK4
//!    step, split internally at coefficient band crossings
//! 2. locate ground contact if the step fell through the launch height
//! 3. record a sample and check termination
//!
//! Metrics are derived from the recorded samples so they always agree
//! with the trajectory that is returned.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{IntegrationMode, IntegratorConfig};
use crate::environment::Environment;
use crate::error::SimulationError;
use crate::forces::{AerodynamicModel, FlightConditions, ForceModel};
use crate::integrator::{locate_event, Rk4};
use crate::spin::SpinModel;
use crate::types::{BallProperties, BallState, Sample, Vec3};

/// Remaining time below which the time budget counts as spent (s)
const TIME_EPSILON: f64 = 1e-9;

/// Why a trajectory stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// Fell back through the launch height
    GroundContact,
    /// Horizontal distance reached the requested target
    TargetDistance,
    /// `max_steps` used up
    StepBudget,
    /// `max_time` reached
    TimeBudget,
}

/// An adaptive step that was accepted at the minimum step size without
/// meeting the tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrecisionWarning {
    pub time: f64,
    pub dt: f64,
    pub error: f64,
}

/// Summary of a trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrajectoryMetrics {
    /// Horizontal distance from launch to the last sample (m)
    pub total_distance: f64,
    /// Highest point above the launch height (m)
    pub apex_height: f64,
    /// Time of the last sample (s)
    pub flight_time: f64,
    /// Signed offset from the initial heading, positive to the right (m)
    pub lateral_deviation: f64,
    /// Descent angle at the last sample, degrees below horizontal
    pub landing_angle_deg: f64,
    /// Speed at the last sample (m/s)
    pub landing_speed: f64,
}

impl TrajectoryMetrics {
    /// Derives metrics from a sample sequence.
    pub fn from_samples(samples: &[Sample]) -> Self {
        let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
            return Self::default();
        };

        let displacement = (last.position - first.position).horizontal();
        let apex = samples
            .iter()
            .map(|s| s.position.y)
            .fold(f64::NEG_INFINITY, f64::max);

        // Heading from the launch velocity; straight down +X if launched vertically
        let heading = first
            .velocity
            .horizontal()
            .try_normalized()
            .unwrap_or(Vec3::new(1.0, 0.0, 0.0));
        let lateral_deviation = heading.x * displacement.z - heading.z * displacement.x;

        let horizontal_speed = last.velocity.horizontal().magnitude();
        let landing_angle_deg = (-last.velocity.y).atan2(horizontal_speed).to_degrees();

        Self {
            total_distance: displacement.magnitude(),
            apex_height: apex - first.position.y,
            flight_time: last.time - first.time,
            lateral_deviation,
            landing_angle_deg,
            landing_speed: last.velocity.magnitude(),
        }
    }
}

/// Output of one simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryResult {
    pub samples: Vec<Sample>,
    pub metrics: TrajectoryMetrics,
    pub termination: Termination,
    pub final_state: BallState,
    pub steps: usize,
    pub warnings: Vec<PrecisionWarning>,
}

impl TrajectoryResult {
    pub fn is_precise(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Runs trajectories with a fixed force model, spin model and integrator
/// configuration.
#[derive(Debug, Clone)]
pub struct Simulator<F: ForceModel = AerodynamicModel> {
    pub forces: F,
    pub spin: SpinModel,
    pub config: IntegratorConfig,
}

impl Default for Simulator<AerodynamicModel> {
    fn default() -> Self {
        Self::new(AerodynamicModel::default(), SpinModel::default(), IntegratorConfig::default())
    }
}

impl<F: ForceModel> Simulator<F> {
    pub fn new(forces: F, spin: SpinModel, config: IntegratorConfig) -> Self {
        Self {
            forces,
            spin,
            config,
        }
    }

    /// Simulates one trajectory.
    ///
    /// # Arguments
    /// * `initial` - Launch state; its height is the ground for this run
    /// * `props` - Ball physical properties
    /// * `env` - Air and wind
    /// * `target_distance` - Horizontal distance that ends the run, when
    ///   `config.stop_at_target_distance` is set
    ///
    /// # Returns
    /// Samples from launch to termination with metrics derived from them.
    /// Fails on invalid input, or on a step that cannot meet the tolerance
    /// when `config.fail_on_precision_loss` is set.
    pub fn run(
        &self,
        initial: &BallState,
        props: &BallProperties,
        env: &Environment,
        target_distance: Option<f64>,
    ) -> Result<TrajectoryResult, SimulationError> {
        self.config.validate()?;
        props.validate()?;
        env.validate()?;
        initial.validate()?;

        let conditions = FlightConditions::new(props, env).with_spin_model(self.spin);
        let stepper = self.config.stepper();
        let target = target_distance.filter(|_| self.config.stop_at_target_distance);
        let end_time = initial.time + self.config.max_time;
        let launch = initial.position;

        // Same arithmetic as an accepted step, for any length up to it
        let advance = |from: &BallState, h: f64| match self.config.mode {
            IntegrationMode::Fixed => Rk4::step_across(from, &conditions, &self.forces, h),
            IntegrationMode::Adaptive => stepper.refine(from, &conditions, &self.forces, h),
        };
        let below_launch = |s: &BallState| s.position.y < launch.y && s.velocity.y < 0.0;

        let mut state = *initial;
        let mut samples = vec![state.sample()];
        let mut warnings = Vec::new();
        let mut steps = 0;

        let termination = loop {
            if steps >= self.config.max_steps {
                break Termination::StepBudget;
            }
            let remaining = end_time - state.time;
            if remaining <= TIME_EPSILON {
                break Termination::TimeBudget;
            }
            let dt = self.config.dt.min(remaining);

            // Step 1: Integrate one step
            let next = match self.config.mode {
                IntegrationMode::Fixed => advance(&state, dt),
                IntegrationMode::Adaptive => {
                    let result = stepper.step(&state, &conditions, &self.forces, dt);
                    if !result.converged {
                        if self.config.fail_on_precision_loss {
                            return Err(SimulationError::NonConvergence {
                                time: state.time,
                                dt: result.dt_used,
                                error: result.error_estimate,
                                tolerance: self.config.tolerance,
                            });
                        }
                        log::warn!(
                            "step at t={:.4}s accepted at dt={:e} with error {:e} (tolerance {:e})",
                            state.time,
                            result.dt_used,
                            result.error_estimate,
                            self.config.tolerance
                        );
                        warnings.push(PrecisionWarning {
                            time: state.time,
                            dt: result.dt_used,
                            error: result.error_estimate,
                        });
                    }
                    result.state
                }
            };
            steps += 1;

            // Step 2: Pin down the moment the ball came back through the launch height
            if below_launch(&next) {
                let from = state;
                let bracket = locate_event(&from, next, |h| advance(&from, h), below_launch);
                let landed = interpolate_landing(&bracket.before, &bracket.after, launch.y);
                samples.push(landed.sample());
                state = landed;
                break Termination::GroundContact;
            }

            // Step 3: Record and check the target
            samples.push(next.sample());
            state = next;

            if let Some(target) = target {
                if (state.position - launch).horizontal().magnitude() >= target {
                    break Termination::TargetDistance;
                }
            }
        };

        let metrics = TrajectoryMetrics::from_samples(&samples);
        log::debug!(
            "trajectory ended by {:?} after {} steps: distance {:.2} m, apex {:.2} m, {:.2} s",
            termination,
            steps,
            metrics.total_distance,
            metrics.apex_height,
            metrics.flight_time
        );

        Ok(TrajectoryResult {
            samples,
            metrics,
            termination,
            final_state: state,
            steps,
            warnings,
        })
    }

    /// Simulates many launches of the same ball in the same air.
    ///
    /// Runs are independent and execute in parallel; results come back in
    /// input order.
    pub fn run_batch(
        &self,
        initial_states: &[BallState],
        props: &BallProperties,
        env: &Environment,
        target_distance: Option<f64>,
    ) -> Vec<Result<TrajectoryResult, SimulationError>> {
        initial_states
            .par_iter()
            .map(|initial| self.run(initial, props, env, target_distance))
            .collect()
    }
}

/// Linear interpolation to the point where the ball crosses `ground_y`,
/// across a bracket no longer than the event tolerance.
fn interpolate_landing(before: &BallState, after: &BallState, ground_y: f64) -> BallState {
    let drop = before.position.y - after.position.y;
    let fraction = if drop > 0.0 {
        ((before.position.y - ground_y) / drop).clamp(0.0, 1.0)
    } else {
        1.0
    };

    BallState {
        position: before.position.lerp(&after.position, fraction),
        velocity: before.velocity.lerp(&after.velocity, fraction),
        time: before.time + (after.time - before.time) * fraction,
        ..*after
    }
}

// =============================================================================
// Tests
// =============================================================================
