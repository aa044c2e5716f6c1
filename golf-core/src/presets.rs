//! YAML presets for balls, environments and engine settings.
//!
//! Presets let a caller switch balls or playing conditions without
//! recompiling. Every preset is validated on load.
//!
//! ## Directory Structure
//!
//! ```text
//! presets/
//! ├── balls/
//! │   ├── tour_urethane.yaml
//! │   └── range_ball.yaml
//! ├── environments/
//! │   ├── sea_level.yaml
//! │   └── denver.yaml
//! └── engine/
//!     └── default.yaml
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::config::EngineConfig;
use crate::environment::Environment;
use crate::error::{PresetError, SimulationError};
use crate::types::BallProperties;

const BALLS: &str = "balls";
const ENVIRONMENTS: &str = "environments";
const ENGINE: &str = "engine";

/// Preset loader rooted at a base directory.
pub struct PresetLoader {
    base_path: PathBuf,
}

impl PresetLoader {
    /// The base path should contain `balls/`, `environments/` and `engine/`.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Load a ball by name (without the .yaml extension).
    ///
    /// ```ignore
    /// let loader = PresetLoader::new("presets");
    /// let ball = loader.load_ball("tour_urethane")?;
    /// ```
    pub fn load_ball(&self, name: &str) -> Result<BallProperties, PresetError> {
        self.load(BALLS, name, BallProperties::validate)
    }

    pub fn load_environment(&self, name: &str) -> Result<Environment, PresetError> {
        self.load(ENVIRONMENTS, name, Environment::validate)
    }

    /// Load engine settings. Keys left out of the file keep their defaults.
    pub fn load_engine_config(&self, name: &str) -> Result<EngineConfig, PresetError> {
        self.load(ENGINE, name, EngineConfig::validate)
    }

    pub fn list_balls(&self) -> Result<Vec<String>, PresetError> {
        self.list(BALLS)
    }

    pub fn list_environments(&self) -> Result<Vec<String>, PresetError> {
        self.list(ENVIRONMENTS)
    }

    fn load<T: DeserializeOwned>(
        &self,
        subdir: &str,
        name: &str,
        validate: impl Fn(&T) -> Result<(), SimulationError>,
    ) -> Result<T, PresetError> {
        let path = self.base_path.join(subdir).join(format!("{name}.yaml"));
        if !path.exists() {
            return Err(PresetError::NotFound(name.to_string()));
        }
        let contents = fs::read_to_string(&path)?;
        let preset: T = serde_yaml::from_str(&contents)?;
        validate(&preset).map_err(|source| PresetError::Invalid {
            name: name.to_string(),
            source,
        })?;

        log::info!("loaded {subdir} preset '{name}' from {}", path.display());
        Ok(preset)
    }

    fn list(&self, subdir: &str) -> Result<Vec<String>, PresetError> {
        let path = self.base_path.join(subdir);
        if !path.exists() {
            return Ok(vec![]);
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&path)? {
            let file_name = entry?.file_name();
            if let Some(name) = file_name.to_string_lossy().strip_suffix(".yaml") {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

// =============================================================================
// Tests
// =============================================================================
