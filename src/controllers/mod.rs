//! Closed-loop control laws producing a population's input `u`.

pub mod clock;
pub mod gaussian_repulsion;
pub mod shepherding;

use std::fmt;

use ndarray::Array2;
use serde::Deserialize;

use crate::environment::Environment;
use crate::error::{ConfigError, SimError};
use crate::population::Population;
use crate::PopulationId;

pub use clock::SampleClock;
pub use gaussian_repulsion::{gaussian_repulsion, GaussianField, GaussianRepulsion};
pub use shepherding::{assign_targets, shepherding_action, ShepherdingController, ShepherdingGains};

/// A control law for one population.
///
/// Controllers read the current populations and environment and return a
/// new `u` for [`Controller::population`]. They are recomputed from scratch
/// each time they fire.
pub trait Controller: fmt::Debug + Send {
    /// Returns a human-readable name for this controller.
    fn name(&self) -> &str;

    /// The controlled population.
    fn population(&self) -> PopulationId;

    /// Sampling period; `None` fires every simulation step.
    fn dt(&self) -> Option<f64>;

    /// Computes the new input, shape `N × input_dim` of the controlled
    /// population.
    fn action(
        &mut self,
        populations: &[Population],
        environment: &dyn Environment,
    ) -> Result<Array2<f64>, SimError>;
}

/// Controller selection, keyed by `kind`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ControllerConfig {
    Shepherding {
        #[serde(default)]
        name: Option<String>,
        /// Herder population.
        population: String,
        /// Target population.
        targets: String,
        #[serde(default)]
        dt: Option<f64>,
        #[serde(default)]
        gains: ShepherdingGains,
    },
    GaussianRepulsion {
        #[serde(default)]
        name: Option<String>,
        population: String,
        #[serde(default)]
        dt: Option<f64>,
        #[serde(default)]
        field: GaussianField,
    },
}

impl ControllerConfig {
    /// Instantiates the controller, resolving population names with `lookup`.
    pub fn build<F>(&self, lookup: F) -> Result<Box<dyn Controller>, ConfigError>
    where
        F: Fn(&str) -> Result<PopulationId, ConfigError>,
    {
        match self {
            ControllerConfig::Shepherding {
                name,
                population,
                targets,
                dt,
                gains,
            } => {
                let mut controller =
                    ShepherdingController::new(lookup(population)?, lookup(targets)?, gains.clone())
                        .with_dt(*dt)?;
                if let Some(name) = name {
                    controller = controller.with_name(name.clone());
                }
                Ok(Box::new(controller))
            }
            ControllerConfig::GaussianRepulsion {
                name,
                population,
                dt,
                field,
            } => {
                let mut controller =
                    GaussianRepulsion::new(lookup(population)?, field.clone())?.with_dt(*dt)?;
                if let Some(name) = name {
                    controller = controller.with_name(name.clone());
                }
                Ok(Box::new(controller))
            }
        }
    }
}
