//! The space agents live in.

pub mod empty;
pub mod shepherding;

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

pub use empty::EmptyEnvironment;
pub use shepherding::{
    fraction_in_goal, shepherding_done, ShepherdingEnvironment, ShepherdingEnvironmentConfig,
};

/// A disc the targets should be driven into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalRegion {
    pub center: [f64; 2],
    pub radius: f64,
}

impl GoalRegion {
    /// Whether `(x, y)` lies strictly inside the region.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let dx = x - self.center[0];
        let dy = y - self.center[1];
        (dx * dx + dy * dy).sqrt() < self.radius
    }
}

/// Bounds and (optionally) a goal, advanced once per simulation step.
pub trait Environment: fmt::Debug + Send {
    /// Returns a human-readable name for this environment.
    fn name(&self) -> &str;

    /// Width and height of the arena.
    fn dimensions(&self) -> (f64, f64);

    /// Current goal, if the environment has one.
    fn goal(&self) -> Option<GoalRegion> {
        None
    }

    /// Restores the state at the start of an episode.
    fn reset(&mut self) {}

    /// Advances one simulation step.
    fn update(&mut self);

    /// Values worth logging.
    fn info(&self) -> BTreeMap<String, f64>;
}

pub(crate) fn default_dimensions() -> (f64, f64) {
    (100.0, 100.0)
}

/// Environment selection, keyed by `kind`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnvironmentConfig {
    Empty {
        #[serde(default = "default_dimensions")]
        dimensions: (f64, f64),
    },
    Shepherding(ShepherdingEnvironmentConfig),
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        EnvironmentConfig::Empty {
            dimensions: default_dimensions(),
        }
    }
}

impl EnvironmentConfig {
    pub fn build(&self) -> Box<dyn Environment> {
        match self {
            EnvironmentConfig::Empty { dimensions } => Box::new(EmptyEnvironment::new(*dimensions)),
            EnvironmentConfig::Shepherding(config) => {
                Box::new(ShepherdingEnvironment::new(config.clone()))
            }
        }
    }
}
