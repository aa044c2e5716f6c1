//! The trajectory engine: a simulator behind a result cache.
//!
//! ```no_run
//! use golf_core::{BallProperties, BallState, EngineConfig, Environment, TrajectoryEngine,
//!                 TrajectoryRequest, Vec3};
//!
//! let engine = TrajectoryEngine::new(EngineConfig::default())?;
//! let props = BallProperties::regulation();
//! let launch = BallState::from_launch(Vec3::ZERO, 70.0, 11.0, 0.0, 2700.0, 0.0, props.mass)?;
//! let request = TrajectoryRequest::new(240.0, Environment::standard(), props, launch);
//!
//! let result = engine.simulate(&request)?;
//! println!("carry {:.1} m", result.metrics.total_distance);
//! # Ok::<(), golf_core::SimulationError>(())
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use crate::cache::ResultCache;
use crate::config::EngineConfig;
use crate::effects::{self, EnvironmentalEffects};
use crate::environment::Environment;
use crate::error::SimulationError;
use crate::request::TrajectoryRequest;
use crate::simulation::{Simulator, TrajectoryResult};

/// Owns one simulator and its cache. Construct one and share it by
/// reference; there is no process-wide instance.
pub struct TrajectoryEngine {
    simulator: Simulator,
    cache: ResultCache<TrajectoryResult>,
    runs: AtomicU64,
}

impl TrajectoryEngine {
    pub fn new(config: EngineConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        log::debug!(
            "engine created: {:?} integration, dt={}s, cache ttl={}s",
            config.integrator.mode,
            config.integrator.dt,
            config.cache_ttl_secs
        );

        Ok(Self {
            simulator: Simulator::new(config.aerodynamics, config.spin, config.integrator),
            cache: ResultCache::new(config.cache_ttl()),
            runs: AtomicU64::new(0),
        })
    }

    pub fn simulator(&self) -> &Simulator {
        &self.simulator
    }

    pub fn cache(&self) -> &ResultCache<TrajectoryResult> {
        &self.cache
    }

    /// Number of trajectories actually integrated (cache misses).
    pub fn simulations_run(&self) -> u64 {
        self.runs.load(Ordering::Relaxed)
    }

    /// Simulates a request, answering from the cache when an identical
    /// request was simulated within the TTL.
    pub fn simulate(
        &self,
        request: &TrajectoryRequest,
    ) -> Result<Arc<TrajectoryResult>, SimulationError> {
        request.validate()?;

        let key = request.cache_key();
        if let Some(hit) = key.as_deref().and_then(|k| self.cache.get(k)) {
            log::debug!("cache hit for target {} m", request.target_distance);
            return Ok(hit);
        }
        log::debug!("cache miss for target {} m", request.target_distance);

        let result = Arc::new(self.simulator.run(
            &request.initial_state,
            &request.properties,
            &request.environment,
            Some(request.target_distance),
        )?);
        self.runs.fetch_add(1, Ordering::Relaxed);

        if let Some(key) = key {
            self.cache.set(key, Arc::clone(&result));
        }
        Ok(result)
    }

    /// Simulates independent requests in parallel, in input order.
    pub fn simulate_batch(
        &self,
        requests: &[TrajectoryRequest],
    ) -> Vec<Result<Arc<TrajectoryResult>, SimulationError>> {
        requests.par_iter().map(|r| self.simulate(r)).collect()
    }

    pub fn environmental_effects(
        &self,
        env: &Environment,
        target_distance: f64,
    ) -> Result<EnvironmentalEffects, SimulationError> {
        effects::environmental_effects(env, target_distance)
    }
}
