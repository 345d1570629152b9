//! Numerical schemes advancing populations by one timestep.

pub mod euler_maruyama;

use serde::Deserialize;

use crate::error::SimError;
use crate::population::Population;

pub use euler_maruyama::EulerMaruyama;

fn default_dt() -> f64 {
    0.01
}

/// Integrator settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IntegratorConfig {
    #[serde(default = "default_dt")]
    pub dt: f64,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self { dt: default_dt() }
    }
}

/// A fixed-step scheme for the population SDEs.
pub trait Integrator: Send {
    /// Returns a human-readable name for this integrator.
    fn name(&self) -> &str;

    /// Timestep.
    fn dt(&self) -> f64;

    /// Advances every population once. All drifts and diffusions are
    /// evaluated against the pre-step states.
    fn step(&mut self, populations: &mut [Population]) -> Result<(), SimError>;
}
