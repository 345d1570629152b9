//! Whole-simulation configuration, loadable from TOML or JSON.
//!
//! ```toml
//! seed = 42
//!
//! [simulator]
//! T = 20.0
//!
//! [integrator]
//! dt = 0.01
//!
//! [environment]
//! kind = "shepherding"
//! goal_radius = 5.0
//!
//! [[populations]]
//! name = "herders"
//! N = 5
//! state_dim = 2
//! model = { kind = "simple_integrators", v_max = 20.0 }
//! initial_conditions = { mode = "circle", min_radius = 40.0, max_radius = 50.0 }
//! ```

pub(crate) mod files;

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::controllers::ControllerConfig;
use crate::environment::EnvironmentConfig;
use crate::error::ConfigError;
use crate::integrators::IntegratorConfig;
use crate::interactions::InteractionConfig;
use crate::population::PopulationConfig;

fn default_duration() -> f64 {
    10.0
}

/// Batch-run settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimulatorConfig {
    /// Total simulated time.
    #[serde(rename = "T", alias = "duration", default = "default_duration")]
    pub duration: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            duration: default_duration(),
        }
    }
}

fn default_threshold() -> f64 {
    1.0
}

fn default_every() -> u64 {
    1
}

/// Built-in loggers, keyed by `kind`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoggerConfig {
    /// Stops once `threshold` of `targets` are inside the goal.
    Shepherding {
        targets: String,
        #[serde(default = "default_threshold")]
        threshold: f64,
    },
    /// Keeps every `every`-th frame.
    Trajectory {
        #[serde(default = "default_every")]
        every: u64,
    },
}

/// Everything needed to build a [`Simulator`](crate::Simulator).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Master seed; every component without its own seed derives one from it.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub simulator: SimulatorConfig,
    #[serde(default)]
    pub integrator: IntegratorConfig,
    #[serde(default)]
    pub environment: EnvironmentConfig,
    #[serde(default)]
    pub populations: Vec<PopulationConfig>,
    #[serde(default)]
    pub interactions: Vec<InteractionConfig>,
    #[serde(default)]
    pub controllers: Vec<ControllerConfig>,
    #[serde(default)]
    pub logger: Option<LoggerConfig>,
}

fn inline() -> PathBuf {
    PathBuf::from("<inline>")
}

impl SimulationConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Self::parse_toml(&inline(), text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Self::parse_json(&inline(), text)
    }

    /// Loads a `.toml` or `.json` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        match extension.as_str() {
            "toml" => Self::parse_toml(path, &text),
            "json" => Self::parse_json(path, &text),
            _ => Err(ConfigError::UnsupportedFile {
                path: path.to_path_buf(),
                extension,
            }),
        }
    }

    fn parse_toml(path: &Path, text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    fn parse_json(path: &Path, text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::ModelConfig;

    #[test]
    fn empty_document_uses_defaults() {
        let config = SimulationConfig::from_toml_str("").unwrap();
        assert_eq!(config.simulator.duration, 10.0);
        assert_eq!(config.integrator.dt, 0.01);
        assert_eq!(config.environment, EnvironmentConfig::default());
        assert!(config.populations.is_empty());
        assert_eq!(config.seed, None);
    }

    #[test]
    fn full_toml_document() {
        let config = SimulationConfig::from_toml_str(
            r#"
            seed = 3

            [simulator]
            T = 2.5

            [integrator]
            dt = 0.05

            [environment]
            kind = "shepherding"
            final_goal_pos = [10.0, 0.0]

            [[populations]]
            name = "herders"
            N = 2
            state_dim = 2
            model = { kind = "simple_integrators", v_max = 5.0 }
            initial_conditions = { mode = "circle", max_radius = 10.0 }

            [[populations]]
            name = "targets"
            N = 4
            state_dim = 2
            model = { kind = "fixed" }
            initial_conditions = { mode = "box", lower_bounds = [-1, -1], upper_bounds = [1, 1] }

            [[interactions]]
            law = "harmonic_repulsion"
            target = "targets"
            source = "herders"
            parameters = { mode = "generate", generate = { strength = 1.0, cutoff = 3.0 } }

            [[controllers]]
            kind = "shepherding"
            population = "herders"
            targets = "targets"
            dt = 0.1
            gains = { xi = 20.0 }

            [logger]
            kind = "shepherding"
            targets = "targets"
            threshold = 0.9
            "#,
        )
        .unwrap();
        assert_eq!(config.seed, Some(3));
        assert_eq!(config.simulator.duration, 2.5);
        assert_eq!(config.populations.len(), 2);
        assert_eq!(
            config.populations[0].model,
            ModelConfig::SimpleIntegrators {
                v_max: 5.0,
                noisy: false
            }
        );
        assert_eq!(config.interactions[0].source, "herders");
        match &config.controllers[0] {
            ControllerConfig::Shepherding { dt, gains, .. } => {
                assert_eq!(*dt, Some(0.1));
                assert_eq!(gains.xi, 20.0);
                assert_eq!(gains.alpha, 3.0);
            }
            other => panic!("unexpected controller {:?}", other),
        }
        assert_eq!(
            config.logger,
            Some(LoggerConfig::Shepherding {
                targets: "targets".to_string(),
                threshold: 0.9
            })
        );
    }

    #[test]
    fn json_document() {
        let config = SimulationConfig::from_json_str(
            r#"{"simulator": {"T": 1.0}, "populations": [{"name": "a", "n": 1, "state_dim": 2,
                "model": {"kind": "fixed"},
                "initial_conditions": {"mode": "explicit", "states": [[0, 0]]}}]}"#,
        )
        .unwrap();
        assert_eq!(config.populations[0].n, 1);
    }

    #[test]
    fn walker_with_gaussian_repulsion() {
        let config = SimulationConfig::from_toml_str(
            r#"
            [[populations]]
            name = "walkers"
            N = 3
            state_dim = 5
            input_dim = 2
            model = { kind = "persistent_turning_walker", dt = 0.05 }
            initial_conditions = { mode = "circle", max_radius = 10.0 }

            [[controllers]]
            kind = "gaussian_repulsion"
            population = "walkers"
            field = { amplitude = 2.0, sigma_y = 4.0 }
            "#,
        )
        .unwrap();
        assert_eq!(
            config.populations[0].model,
            ModelConfig::PersistentTurningWalker { dt: 0.05 }
        );
        match &config.controllers[0] {
            ControllerConfig::GaussianRepulsion { dt, field, .. } => {
                assert_eq!(*dt, None);
                assert_eq!(field.amplitude, 2.0);
                assert_eq!(field.sigma_x, 20.0);
                assert_eq!(field.sigma_y, 4.0);
            }
            other => panic!("unexpected controller {:?}", other),
        }
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        let err = SimulationConfig::from_toml_str("[simulator]\nT = \"long\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn unknown_model_kind_is_rejected() {
        let err = SimulationConfig::from_json_str(
            r#"{"populations": [{"N": 1, "state_dim": 2, "model": {"kind": "unicycle"},
                "initial_conditions": {"mode": "explicit", "states": [[0, 0]]}}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            SimulationConfig::from_file("/no/such/config.toml"),
            Err(ConfigError::FileNotFound(_))
        ));
    }
}
