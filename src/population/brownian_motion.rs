//! Constant drift plus Brownian noise.

use ndarray::Array2;

use super::dynamics::{require_matching_dims, stack_matrices, Diffusion, Dynamics, StateView};
use crate::error::{ConfigError, SimError};
use crate::params::ParamShape;

const NAME: &str = "BrownianMotion";

/// `dx = (mu + u + f) dt + D dW`.
///
/// `D` is a per-agent vector (independent noise per dimension) or, when
/// `correlated`, a per-agent `state_dim × state_dim` matrix.
#[derive(Debug, Clone, Default)]
pub struct BrownianMotion {
    correlated: bool,
}

impl BrownianMotion {
    pub fn new(correlated: bool) -> Self {
        Self { correlated }
    }
}

impl Dynamics for BrownianMotion {
    fn name(&self) -> &str {
        NAME
    }

    fn check_dims(&self, state_dim: usize, input_dim: usize) -> Result<(), ConfigError> {
        require_matching_dims(NAME, state_dim, input_dim)
    }

    fn parameter_shapes(&self, state_dim: usize, _input_dim: usize) -> Vec<(&'static str, ParamShape)> {
        let d = if self.correlated {
            ParamShape::Matrix(state_dim)
        } else {
            ParamShape::Vector(state_dim)
        };
        vec![("mu", ParamShape::Vector(state_dim)), ("D", d)]
    }

    fn drift(&self, state: &StateView<'_>) -> Result<Array2<f64>, SimError> {
        let mu = state.params.require(NAME, "mu")?;
        Ok(&mu.values() + &state.u + &state.f)
    }

    fn diffusion(&self, state: &StateView<'_>) -> Result<Diffusion, SimError> {
        let d = state.params.require(NAME, "D")?;
        Ok(if self.correlated {
            Diffusion::Correlated(stack_matrices(d.values(), state.x.ncols()))
        } else {
            Diffusion::Diagonal(d.values().to_owned())
        })
    }
}
