//! # Golf Core
//!
//! Golf ball flight simulation.
//!
//! ## Architecture
//!
//! - `types`: Core data structures (Vec3, ball/spin state, ball properties)
//! - `environment`: Atmospheric conditions and air density
//! - `table`: Ordered threshold tables for the empirical coefficients
//! - `forces`: Aerodynamic forces (gravity, drag, lift/Magnus)
//! - `spin`: Spin decay and axis precession
//! - `integrator`: Numerical integration (RK4, adaptive RK4)
//! - `simulation`: Trajectory loop, termination and metrics
//! - `cache`: TTL result cache
//! - `effects`: Closed-form environmental distance adjustment
//! - `request`: Validated simulation requests
//! - `engine`: Simulator and cache behind one object
//! - `config`: Engine and integrator settings
//! - `presets`: YAML-based ball/environment/engine presets
//! - `error`: Error types

pub mod cache;
pub mod config;
pub mod effects;
pub mod engine;
pub mod environment;
pub mod error;
pub mod forces;
pub mod integrator;
pub mod presets;
pub mod request;
pub mod simulation;
pub mod spin;
pub mod table;
pub mod types;

pub use config::{EngineConfig, IntegrationMode, IntegratorConfig};
pub use effects::{environmental_effects, EnvironmentalEffects};
pub use engine::TrajectoryEngine;
pub use environment::Environment;
pub use error::{PresetError, SimulationError};
pub use forces::{AerodynamicModel, FlightConditions, ForceModel, Regime};
pub use presets::PresetLoader;
pub use request::TrajectoryRequest;
pub use simulation::{
    PrecisionWarning, Simulator, Termination, TrajectoryMetrics, TrajectoryResult,
};
pub use spin::SpinModel;
pub use types::{
    BallProperties, BallState, Forces, Sample, SpinState, SurfaceEffects, SurfaceTexture, Vec3,
};
