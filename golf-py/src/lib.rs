//! Python bindings for the golf-core flight engine.
//!
//! Provides a simple Python API:
//!
//! ```python
//! from golf_physics import Engine, Vec3
//!
//! engine = Engine()
//! shot = engine.simulate(70.0, 11.0, 2700.0, 240.0, wind=Vec3(-3.0, 0.0, 1.5))
//! print(f"carry {shot['metrics']['total_distance']:.1f} m")
//!
//! for p in shot["points"]:
//!     print(p["t"], p["x"], p["y"], p["z"])
//! ```

use std::path::PathBuf;

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};

use golf_core::{
    BallProperties, BallState, EngineConfig, Environment, IntegrationMode, IntegratorConfig,
    PresetLoader, TrajectoryEngine, TrajectoryRequest, Vec3 as CoreVec3,
};

fn value_error(err: impl std::fmt::Display) -> PyErr {
    PyValueError::new_err(err.to_string())
}

/// 3D vector for positions, velocities and wind.
#[pyclass]
#[derive(Clone, Copy)]
pub struct Vec3 {
    #[pyo3(get, set)]
    pub x: f64,
    #[pyo3(get, set)]
    pub y: f64,
    #[pyo3(get, set)]
    pub z: f64,
}

#[pymethods]
impl Vec3 {
    #[new]
    fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    fn __repr__(&self) -> String {
        format!("Vec3({:.4}, {:.4}, {:.4})", self.x, self.y, self.z)
    }

    fn magnitude(&self) -> f64 {
        CoreVec3::from(*self).magnitude()
    }

    fn to_tuple(&self) -> (f64, f64, f64) {
        (self.x, self.y, self.z)
    }
}

impl From<CoreVec3> for Vec3 {
    fn from(v: CoreVec3) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

impl From<Vec3> for CoreVec3 {
    fn from(v: Vec3) -> Self {
        CoreVec3::new(v.x, v.y, v.z)
    }
}

/// Trajectory engine with its own result cache.
#[pyclass]
pub struct Engine {
    engine: TrajectoryEngine,
    ball: BallProperties,
}

#[pymethods]
impl Engine {
    /// Create an engine. `integration` is "adaptive" or "fixed".
    #[new]
    #[pyo3(signature = (integration="adaptive", dt=0.01, tolerance=1e-4, cache_ttl_secs=900))]
    fn new(integration: &str, dt: f64, tolerance: f64, cache_ttl_secs: u64) -> PyResult<Self> {
        let mode = match integration {
            "adaptive" => IntegrationMode::Adaptive,
            "fixed" => IntegrationMode::Fixed,
            other => {
                return Err(PyValueError::new_err(format!(
                    "integration must be 'adaptive' or 'fixed', got '{other}'"
                )))
            }
        };
        let config = EngineConfig {
            integrator: IntegratorConfig {
                mode,
                dt,
                tolerance,
                ..IntegratorConfig::default()
            },
            cache_ttl_secs,
            ..EngineConfig::default()
        };
        Ok(Self {
            engine: TrajectoryEngine::new(config).map_err(value_error)?,
            ball: BallProperties::regulation(),
        })
    }

    /// Create an engine from `<presets_dir>/engine/<config>.yaml`, flying
    /// the ball from `<presets_dir>/balls/<ball>.yaml`.
    #[staticmethod]
    #[pyo3(signature = (presets_dir, config="default", ball=None))]
    fn from_presets(presets_dir: PathBuf, config: &str, ball: Option<&str>) -> PyResult<Self> {
        let loader = PresetLoader::new(presets_dir);
        let config = loader.load_engine_config(config).map_err(value_error)?;
        let ball = match ball {
            Some(name) => loader.load_ball(name).map_err(value_error)?,
            None => BallProperties::regulation(),
        };
        Ok(Self {
            engine: TrajectoryEngine::new(config).map_err(value_error)?,
            ball,
        })
    }

    /// Name of the ball being simulated.
    #[getter]
    fn ball_name(&self) -> String {
        self.ball.name.clone()
    }

    /// Trajectories integrated so far (cache hits are not counted).
    #[getter]
    fn simulations_run(&self) -> u64 {
        self.engine.simulations_run()
    }

    /// Simulate one shot from launch-monitor numbers.
    ///
    /// Returns a dict with "points", "metrics", "termination" and
    /// "warnings".
    #[pyo3(signature = (
        ball_speed,
        launch_angle_deg,
        spin_rpm,
        target_distance,
        azimuth_deg=0.0,
        spin_axis_tilt_deg=0.0,
        temperature_c=20.0,
        pressure_pa=101_325.0,
        humidity=0.5,
        altitude_m=0.0,
        wind=None,
    ))]
    #[allow(clippy::too_many_arguments)]
    fn simulate(
        &self,
        py: Python<'_>,
        ball_speed: f64,
        launch_angle_deg: f64,
        spin_rpm: f64,
        target_distance: f64,
        azimuth_deg: f64,
        spin_axis_tilt_deg: f64,
        temperature_c: f64,
        pressure_pa: f64,
        humidity: f64,
        altitude_m: f64,
        wind: Option<Vec3>,
    ) -> PyResult<PyObject> {
        let environment = Environment {
            temperature_c,
            pressure_pa,
            humidity,
            altitude_m,
            wind: wind.map_or(CoreVec3::ZERO, CoreVec3::from),
        };
        let launch = BallState::from_launch(
            CoreVec3::ZERO,
            ball_speed,
            launch_angle_deg,
            azimuth_deg,
            spin_rpm,
            spin_axis_tilt_deg,
            self.ball.mass,
        )
        .map_err(value_error)?;
        let request =
            TrajectoryRequest::new(target_distance, environment, self.ball.clone(), launch);

        // Integration holds no Python objects
        let result = py
            .allow_threads(|| self.engine.simulate(&request))
            .map_err(value_error)?;

        let points = PyList::empty(py);
        for sample in &result.samples {
            let point = PyDict::new(py);
            point.set_item("t", sample.time)?;
            point.set_item("x", sample.position.x)?;
            point.set_item("y", sample.position.y)?;
            point.set_item("z", sample.position.z)?;
            point.set_item("vx", sample.velocity.x)?;
            point.set_item("vy", sample.velocity.y)?;
            point.set_item("vz", sample.velocity.z)?;
            points.append(point)?;
        }

        let m = &result.metrics;
        let metrics = PyDict::new(py);
        metrics.set_item("total_distance", m.total_distance)?;
        metrics.set_item("apex_height", m.apex_height)?;
        metrics.set_item("flight_time", m.flight_time)?;
        metrics.set_item("lateral_deviation", m.lateral_deviation)?;
        metrics.set_item("landing_angle_deg", m.landing_angle_deg)?;
        metrics.set_item("landing_speed", m.landing_speed)?;

        let dict = PyDict::new(py);
        dict.set_item("points", points)?;
        dict.set_item("metrics", metrics)?;
        dict.set_item("termination", format!("{:?}", result.termination))?;
        dict.set_item("warnings", result.warnings.len())?;
        dict.set_item("final_spin_rpm", result.final_state.spin.rate_rpm)?;
        Ok(dict.into_any().unbind())
    }

    /// Closed-form distance adjustment without a trajectory.
    #[pyo3(signature = (
        target_distance,
        temperature_c=20.0,
        pressure_pa=101_325.0,
        humidity=0.5,
        altitude_m=0.0,
    ))]
    fn environmental_effects(
        &self,
        py: Python<'_>,
        target_distance: f64,
        temperature_c: f64,
        pressure_pa: f64,
        humidity: f64,
        altitude_m: f64,
    ) -> PyResult<PyObject> {
        let environment = Environment {
            temperature_c,
            pressure_pa,
            humidity,
            altitude_m,
            wind: CoreVec3::ZERO,
        };
        let effects = self
            .engine
            .environmental_effects(&environment, target_distance)
            .map_err(value_error)?;

        let dict = PyDict::new(py);
        dict.set_item("density_effect", effects.density_effect)?;
        dict.set_item("altitude_effect", effects.altitude_effect)?;
        dict.set_item("temperature_effect", effects.temperature_effect)?;
        dict.set_item("humidity_effect", effects.humidity_effect)?;
        dict.set_item("total_effect", effects.total_effect)?;
        dict.set_item("adjusted_yardage", effects.adjusted_yardage)?;
        Ok(dict.into_any().unbind())
    }

    /// Drop every cached result.
    fn clear_cache(&self) {
        self.engine.cache().clear();
    }
}

/// Python module definition.
#[pymodule]
fn golf_physics(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<Vec3>()?;
    m.add_class::<Engine>()?;
    Ok(())
}
