//! Radial push away from the origin, scaled by a Gaussian bump.

use ndarray::{s, Array2, ArrayView2};
use serde::Deserialize;
use tracing::trace;

use super::Controller;
use crate::environment::Environment;
use crate::error::{ConfigError, SimError};
use crate::population::Population;
use crate::spatial::{norm, MIN_DISTANCE};
use crate::{Id, PopulationId};

/// Anisotropic Gaussian `A exp(-(x-cx)²/2σx² - (y-cy)²/2σy²)`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GaussianField {
    pub amplitude: f64,
    pub center: [f64; 2],
    pub sigma_x: f64,
    pub sigma_y: f64,
}

impl Default for GaussianField {
    fn default() -> Self {
        Self {
            amplitude: 5.0,
            center: [0.0, 0.0],
            sigma_x: 20.0,
            sigma_y: 10.0,
        }
    }
}

impl GaussianField {
    pub fn value(&self, x: f64, y: f64) -> f64 {
        let dx = x - self.center[0];
        let dy = y - self.center[1];
        self.amplitude
            * (-dx * dx / (2.0 * self.sigma_x * self.sigma_x) - dy * dy / (2.0 * self.sigma_y * self.sigma_y))
                .exp()
    }

    fn validate(&self, owner: &str) -> Result<(), ConfigError> {
        for (field, sigma) in [("sigma_x", self.sigma_x), ("sigma_y", self.sigma_y)] {
            if !(sigma > 0.0 && sigma.is_finite()) {
                return Err(ConfigError::InvalidValue {
                    name: format!("{}.{}", owner, field),
                    reason: format!("width must be positive, got {}", sigma),
                });
            }
        }
        Ok(())
    }
}

/// Field strength at each position times the unit vector away from the
/// origin, shape `N × 2`.
pub fn gaussian_repulsion(positions: ArrayView2<'_, f64>, field: &GaussianField) -> Array2<f64> {
    let mut action = Array2::<f64>::zeros((positions.nrows(), 2));
    for (p, mut out) in positions.rows().into_iter().zip(action.rows_mut()) {
        let p = p.slice(s![..2]);
        let strength = field.value(p[0], p[1]);
        let r = norm(p).max(MIN_DISTANCE);
        out[0] = strength * p[0] / r;
        out[1] = strength * p[1] / r;
    }
    action
}

/// Pushes a population outwards with [`gaussian_repulsion`].
#[derive(Debug, Clone)]
pub struct GaussianRepulsion {
    name: Id,
    population: PopulationId,
    field: GaussianField,
    dt: Option<f64>,
}

impl GaussianRepulsion {
    pub fn new(population: PopulationId, field: GaussianField) -> Result<Self, ConfigError> {
        let name = "GaussianRepulsion".to_string();
        field.validate(&name)?;
        Ok(Self {
            name,
            population,
            field,
            dt: None,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the sampling period; `None` fires every step.
    pub fn with_dt(mut self, dt: Option<f64>) -> Result<Self, ConfigError> {
        if let Some(dt) = dt {
            if !(dt > 0.0 && dt.is_finite()) {
                return Err(ConfigError::InvalidValue {
                    name: format!("{}.dt", self.name),
                    reason: format!("sampling period must be positive, got {}", dt),
                });
            }
        }
        self.dt = dt;
        Ok(self)
    }

    pub fn field(&self) -> &GaussianField {
        &self.field
    }
}

impl Controller for GaussianRepulsion {
    fn name(&self) -> &str {
        &self.name
    }

    fn population(&self) -> PopulationId {
        self.population
    }

    fn dt(&self) -> Option<f64> {
        self.dt
    }

    fn action(
        &mut self,
        populations: &[Population],
        _environment: &dyn Environment,
    ) -> Result<Array2<f64>, SimError> {
        let population = populations
            .get(self.population)
            .ok_or(SimError::UnknownPopulation(self.population))?;
        let width = population.state_dim().min(population.input_dim());
        if width < 2 {
            return Err(SimError::ShapeMismatch {
                population: population.name().to_string(),
                what: "planar position",
                expected: (population.n(), 2),
                found: (population.n(), width),
            });
        }

        let push = gaussian_repulsion(population.state().view(), &self.field);
        let mut u = Array2::<f64>::zeros((population.n(), population.input_dim()));
        u.slice_mut(s![.., ..2]).assign(&push);
        trace!(controller = %self.name, agents = population.n(), "gaussian repulsion");
        Ok(u)
    }
}
